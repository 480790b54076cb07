// 🏦 Bank Operations - money movement over the store
//
// Each operation is one unit of work: balance writes and their log entries
// commit together or not at all. The in-memory account in the session is
// only replaced after the commit succeeds.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{self, TransactionType};
use crate::entities::{account, Account, Session};
use crate::error::{BankError, BankResult};

/// Outcome of a completed transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub recipient: String,
    pub amount: f64,
    pub sender_balance: f64,
    pub recipient_balance: f64,
}

/// Look up an existing account and start a session on it
pub fn login(conn: &Connection, name: &str) -> BankResult<Session> {
    let stored = db::find_account(conn, name)?
        .ok_or_else(|| BankError::AccountNotFound(name.to_string()))?;

    Ok(Session::new(Account::from(stored)))
}

/// Create a new account with an opening balance and start a session on it
pub fn open_account(conn: &Connection, name: &str, initial_balance: f64) -> BankResult<Session> {
    if name.trim().is_empty() {
        return Err(BankError::InvalidInput("account name must not be empty".to_string()));
    }
    if !initial_balance.is_finite() || initial_balance < 0.0 {
        return Err(BankError::InvalidInput(format!(
            "initial balance must be zero or more, got {}",
            initial_balance
        )));
    }

    let stored = db::create_account(conn, name, initial_balance)?;
    Ok(Session::new(Account::from(stored)))
}

pub fn deposit(conn: &Connection, session: &mut Session, amount: f64) -> BankResult<f64> {
    let mut next = session.account().clone();
    let new_balance = next.deposit(amount)?;

    let tx = conn.unchecked_transaction()?;
    write_balance(&tx, &next.name, new_balance)?;
    db::append_transaction(&tx, &next.name, TransactionType::Deposit, amount, None)?;
    tx.commit()?;

    session.commit_account(next);
    Ok(new_balance)
}

pub fn withdraw(conn: &Connection, session: &mut Session, amount: f64) -> BankResult<f64> {
    let mut next = session.account().clone();
    let new_balance = next.withdraw(amount)?;

    let tx = conn.unchecked_transaction()?;
    write_balance(&tx, &next.name, new_balance)?;
    db::append_transaction(&tx, &next.name, TransactionType::Withdraw, amount, None)?;
    tx.commit()?;

    session.commit_account(next);
    Ok(new_balance)
}

/// Move `amount` from the session account to `recipient`.
///
/// Recipient existence is checked before any funds check. The recipient's
/// balance is read inside the same SQLite transaction that credits it, so the
/// credit is always computed from the stored value at write time.
pub fn transfer(
    conn: &Connection,
    session: &mut Session,
    recipient: &str,
    amount: f64,
) -> BankResult<TransferReceipt> {
    if recipient == session.account_name() {
        return Err(BankError::InvalidInput(
            "cannot transfer to your own account".to_string(),
        ));
    }

    let tx = conn.unchecked_transaction()?;

    let recipient_account = db::find_account(&tx, recipient)?
        .ok_or_else(|| BankError::UnknownRecipient(recipient.to_string()))?;

    let mut sender = session.account().clone();
    let sender_balance = sender.withdraw(amount)?;

    write_balance(&tx, &sender.name, sender_balance)?;
    db::append_transaction(
        &tx,
        &sender.name,
        TransactionType::TransferOut,
        amount,
        Some(recipient),
    )?;

    let recipient_balance = account::credited(recipient_account.balance, amount)?;
    write_balance(&tx, recipient, recipient_balance)?;
    db::append_transaction(
        &tx,
        recipient,
        TransactionType::TransferIn,
        amount,
        Some(&sender.name),
    )?;

    tx.commit()?;

    session.commit_account(sender);
    Ok(TransferReceipt {
        recipient: recipient.to_string(),
        amount,
        sender_balance,
        recipient_balance,
    })
}

// Accounts are never deleted, so a missing row means the store changed under us
fn write_balance(conn: &Connection, name: &str, balance: f64) -> BankResult<()> {
    match db::set_balance(conn, name, balance)? {
        0 => Err(BankError::AccountNotFound(name.to_string())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_transactions, find_account, setup_database, transactions_for_account};

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn stored_balance(conn: &Connection, name: &str) -> f64 {
        find_account(conn, name).unwrap().unwrap().balance
    }

    #[test]
    fn test_deposit_updates_store_and_logs() {
        let conn = test_db();
        let mut session = open_account(&conn, "Alice", 100.0).unwrap();

        let balance = deposit(&conn, &mut session, 50.0).unwrap();

        assert_eq!(balance, 150.0);
        assert_eq!(session.balance(), 150.0);
        assert_eq!(stored_balance(&conn, "Alice"), 150.0);

        let log = transactions_for_account(&conn, "Alice").unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].transaction_type, TransactionType::Deposit);
        assert_eq!(log[0].amount, 50.0);
        assert_eq!(log[0].recipient, None);
    }

    #[test]
    fn test_withdraw_more_than_balance_is_rejected() {
        let conn = test_db();
        let mut session = open_account(&conn, "Alice", 150.0).unwrap();

        let err = withdraw(&conn, &mut session, 200.0).unwrap_err();

        assert!(matches!(err, BankError::InsufficientFunds { .. }));
        assert_eq!(session.balance(), 150.0);
        assert_eq!(stored_balance(&conn, "Alice"), 150.0);
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }

    #[test]
    fn test_withdraw_logs_movement() {
        let conn = test_db();
        let mut session = open_account(&conn, "Alice", 150.0).unwrap();

        assert_eq!(withdraw(&conn, &mut session, 40.0).unwrap(), 110.0);
        assert_eq!(stored_balance(&conn, "Alice"), 110.0);

        let log = transactions_for_account(&conn, "Alice").unwrap();
        assert_eq!(log[0].transaction_type, TransactionType::Withdraw);
        assert_eq!(log[0].amount, 40.0);
    }

    #[test]
    fn test_transfer_to_unknown_recipient() {
        let conn = test_db();
        let mut session = open_account(&conn, "Alice", 150.0).unwrap();

        let err = transfer(&conn, &mut session, "Bob", 50.0).unwrap_err();

        assert!(matches!(err, BankError::UnknownRecipient(ref n) if n == "Bob"));
        assert_eq!(session.balance(), 150.0);
        assert_eq!(stored_balance(&conn, "Alice"), 150.0);
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }

    #[test]
    fn test_transfer_moves_funds_and_logs_both_sides() {
        let conn = test_db();
        db::create_account(&conn, "Carol", 0.0).unwrap();
        let mut session = open_account(&conn, "Alice", 150.0).unwrap();

        let receipt = transfer(&conn, &mut session, "Carol", 50.0).unwrap();

        assert_eq!(receipt.sender_balance, 100.0);
        assert_eq!(receipt.recipient_balance, 50.0);
        assert_eq!(session.balance(), 100.0);
        assert_eq!(stored_balance(&conn, "Alice"), 100.0);
        assert_eq!(stored_balance(&conn, "Carol"), 50.0);
        assert_eq!(count_transactions(&conn).unwrap(), 2);

        let out = transactions_for_account(&conn, "Alice").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].transaction_type, TransactionType::TransferOut);
        assert_eq!(out[0].recipient.as_deref(), Some("Carol"));

        let incoming = transactions_for_account(&conn, "Carol").unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].transaction_type, TransactionType::TransferIn);
        assert_eq!(incoming[0].recipient.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_transfer_insufficient_funds_writes_nothing() {
        let conn = test_db();
        db::create_account(&conn, "Carol", 0.0).unwrap();
        let mut session = open_account(&conn, "Alice", 30.0).unwrap();

        let err = transfer(&conn, &mut session, "Carol", 50.0).unwrap_err();

        assert!(matches!(err, BankError::InsufficientFunds { .. }));
        assert_eq!(stored_balance(&conn, "Alice"), 30.0);
        assert_eq!(stored_balance(&conn, "Carol"), 0.0);
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }

    #[test]
    fn test_transfer_credits_from_current_stored_balance() {
        let conn = test_db();
        db::create_account(&conn, "Carol", 0.0).unwrap();
        let mut session = open_account(&conn, "Alice", 150.0).unwrap();

        // Carol's balance moves after Alice logged in
        db::set_balance(&conn, "Carol", 25.0).unwrap();

        let receipt = transfer(&conn, &mut session, "Carol", 50.0).unwrap();
        assert_eq!(receipt.recipient_balance, 75.0);
        assert_eq!(stored_balance(&conn, "Carol"), 75.0);
    }

    #[test]
    fn test_transfer_rolls_back_when_credit_fails() {
        let conn = test_db();
        db::create_account(&conn, "Carol", 0.0).unwrap();
        let mut session = open_account(&conn, "Alice", 150.0).unwrap();

        conn.execute_batch(
            "CREATE TRIGGER block_credit BEFORE UPDATE ON accounts
             WHEN NEW.name = 'Carol'
             BEGIN SELECT RAISE(ABORT, 'credit blocked'); END;",
        )
        .unwrap();

        let err = transfer(&conn, &mut session, "Carol", 50.0).unwrap_err();

        assert!(matches!(err, BankError::Storage(_)));
        assert_eq!(session.balance(), 150.0);
        assert_eq!(stored_balance(&conn, "Alice"), 150.0);
        assert_eq!(stored_balance(&conn, "Carol"), 0.0);
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }

    #[test]
    fn test_transfer_to_self_rejected() {
        let conn = test_db();
        let mut session = open_account(&conn, "Alice", 150.0).unwrap();

        let err = transfer(&conn, &mut session, "Alice", 10.0).unwrap_err();
        assert!(matches!(err, BankError::InvalidInput(_)));
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }

    #[test]
    fn test_deposit_overflow_writes_nothing() {
        let conn = test_db();
        let mut session = open_account(&conn, "Alice", 1e308).unwrap();

        let err = deposit(&conn, &mut session, 1e308).unwrap_err();

        assert!(matches!(err, BankError::InvalidInput(_)));
        assert_eq!(session.balance(), 1e308);
        assert_eq!(stored_balance(&conn, "Alice"), 1e308);
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }

    #[test]
    fn test_transfer_overflowing_recipient_rolls_back() {
        let conn = test_db();
        db::create_account(&conn, "Carol", 1e308).unwrap();
        let mut session = open_account(&conn, "Alice", 1e308).unwrap();

        let err = transfer(&conn, &mut session, "Carol", 1e308).unwrap_err();

        assert!(matches!(err, BankError::InvalidInput(_)));
        assert_eq!(session.balance(), 1e308);
        assert_eq!(stored_balance(&conn, "Alice"), 1e308);
        assert_eq!(stored_balance(&conn, "Carol"), 1e308);
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }

    #[test]
    fn test_open_account_requires_name() {
        let conn = test_db();
        assert!(matches!(open_account(&conn, "", 1.0), Err(BankError::InvalidInput(_))));
        assert!(matches!(open_account(&conn, "   ", 1.0), Err(BankError::InvalidInput(_))));
        assert_eq!(db::count_accounts(&conn).unwrap(), 0);
    }

    #[test]
    fn test_login_unknown_and_known() {
        let conn = test_db();
        assert!(matches!(login(&conn, "Alice"), Err(BankError::AccountNotFound(_))));

        db::create_account(&conn, "Alice", 80.0).unwrap();
        let session = login(&conn, "Alice").unwrap();
        assert_eq!(session.balance(), 80.0);
    }

    #[test]
    fn test_open_account_rejects_negative_balance() {
        let conn = test_db();
        assert!(matches!(
            open_account(&conn, "Alice", -1.0),
            Err(BankError::InvalidInput(_))
        ));
        assert!(find_account(&conn, "Alice").unwrap().is_none());

        // Zero is a valid opening balance
        assert_eq!(open_account(&conn, "Alice", 0.0).unwrap().balance(), 0.0);
    }
}
