// 🎛️ Interaction Controller
// Turns raw form input into bank operations and tracks the login state.
//
// LoggedOut --login/create_account--> LoggedIn --logout--> LoggedOut
//
// Money operations require LoggedIn. Rejections never touch the store.

use rusqlite::Connection;

use crate::bank::{self, TransferReceipt};
use crate::db::{self, TransactionRecord};
use crate::entities::Session;
use crate::error::{BankError, BankResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

pub struct Controller {
    conn: Connection,
    session: Option<Session>,
}

impl Controller {
    /// Wrap an opened connection. The schema must already exist.
    pub fn new(conn: Connection) -> Self {
        Controller {
            conn,
            session: None,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn state(&self) -> SessionState {
        match self.session {
            Some(_) => SessionState::LoggedIn,
            None => SessionState::LoggedOut,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn login(&mut self, name: &str) -> BankResult<&Session> {
        let result = parse_name(name).and_then(|name| bank::login(&self.conn, name));
        let session = report("login", result)?;

        log::info!(
            "session {} started for '{}' (balance {})",
            session.id,
            session.account_name(),
            session.balance()
        );
        Ok(self.session.insert(session))
    }

    /// Create an account from the two form fields and log straight into it
    pub fn create_account(&mut self, name: &str, initial_balance: &str) -> BankResult<&Session> {
        let result = parse_name(name).and_then(|name| {
            let balance = parse_number(initial_balance, "Initial balance")?;
            bank::open_account(&self.conn, name, balance)
        });
        let session = report("create_account", result)?;

        log::info!(
            "account '{}' created with balance {} (session {})",
            session.account_name(),
            session.balance(),
            session.id
        );
        Ok(self.session.insert(session))
    }

    /// End the current session. Logging out twice is harmless.
    pub fn logout(&mut self) -> Option<Session> {
        let ended = self.session.take();
        if let Some(session) = &ended {
            log::info!(
                "session {} for '{}' ended after {}s",
                session.id,
                session.account_name(),
                session.duration().num_seconds()
            );
        }
        ended
    }

    pub fn deposit(&mut self, amount: &str) -> BankResult<f64> {
        let result = self.session.as_mut().ok_or(BankError::NotLoggedIn).and_then(|session| {
            let amount = parse_amount(amount)?;
            let balance = bank::deposit(&self.conn, session, amount)?;
            log::info!("'{}' deposited {} -> {}", session.account_name(), amount, balance);
            Ok(balance)
        });
        report("deposit", result)
    }

    pub fn withdraw(&mut self, amount: &str) -> BankResult<f64> {
        let result = self.session.as_mut().ok_or(BankError::NotLoggedIn).and_then(|session| {
            let amount = parse_amount(amount)?;
            let balance = bank::withdraw(&self.conn, session, amount)?;
            log::info!("'{}' withdrew {} -> {}", session.account_name(), amount, balance);
            Ok(balance)
        });
        report("withdraw", result)
    }

    pub fn transfer(&mut self, recipient: &str, amount: &str) -> BankResult<TransferReceipt> {
        let result = self.session.as_mut().ok_or(BankError::NotLoggedIn).and_then(|session| {
            let recipient = parse_name(recipient)?;
            let amount = parse_amount(amount)?;
            let receipt = bank::transfer(&self.conn, session, recipient, amount)?;
            log::info!(
                "'{}' transferred {} to '{}' -> {} / {}",
                session.account_name(),
                amount,
                recipient,
                receipt.sender_balance,
                receipt.recipient_balance
            );
            Ok(receipt)
        });
        report("transfer", result)
    }

    pub fn check_balance(&self) -> BankResult<f64> {
        let session = report("check_balance", self.session.as_ref().ok_or(BankError::NotLoggedIn))?;
        Ok(session.balance())
    }

    /// Transaction log of the logged-in account, newest first
    pub fn history(&self) -> BankResult<Vec<TransactionRecord>> {
        let result = self
            .session
            .as_ref()
            .ok_or(BankError::NotLoggedIn)
            .and_then(|session| db::transactions_for_account(&self.conn, session.account_name()));
        report("history", result)
    }
}

fn report<T>(operation: &str, result: BankResult<T>) -> BankResult<T> {
    if let Err(err) = &result {
        if err.is_user_error() {
            log::warn!("{} rejected: {}", operation, err);
        } else {
            log::error!("{} failed: {}", operation, err);
        }
    }
    result
}

// ============================================================================
// INPUT PARSING
// ============================================================================

/// Trimmed, non-empty account name
pub fn parse_name(input: &str) -> BankResult<&str> {
    let name = input.trim();
    if name.is_empty() {
        return Err(BankError::InvalidInput("Please enter a valid name.".to_string()));
    }
    Ok(name)
}

/// Finite, strictly positive amount
pub fn parse_amount(input: &str) -> BankResult<f64> {
    let amount = parse_number(input, "Amount")?;
    if amount <= 0.0 {
        return Err(BankError::InvalidInput(
            "Please enter a valid positive amount.".to_string(),
        ));
    }
    Ok(amount)
}

fn parse_number(input: &str, field: &str) -> BankResult<f64> {
    let value: f64 = input
        .trim()
        .trim_start_matches('$')
        .parse()
        .map_err(|_| BankError::InvalidInput(format!("{} must be a number.", field)))?;

    if !value.is_finite() {
        return Err(BankError::InvalidInput(format!("{} must be a number.", field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_accounts, count_transactions, find_account, setup_database, TransactionType};

    fn test_controller() -> Controller {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        Controller::new(conn)
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50").unwrap(), 50.0);
        assert_eq!(parse_amount(" $12.5 ").unwrap(), 12.5);
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("inf").is_err());
        assert!(parse_amount("NaN").is_err());
    }

    #[test]
    fn test_parse_name() {
        assert_eq!(parse_name("  Alice ").unwrap(), "Alice");
        assert!(parse_name("   ").is_err());
    }

    #[test]
    fn test_money_operations_require_login() {
        let mut controller = test_controller();
        assert_eq!(controller.state(), SessionState::LoggedOut);

        assert!(matches!(controller.deposit("10"), Err(BankError::NotLoggedIn)));
        assert!(matches!(controller.withdraw("10"), Err(BankError::NotLoggedIn)));
        assert!(matches!(controller.transfer("Bob", "10"), Err(BankError::NotLoggedIn)));
        assert!(matches!(controller.check_balance(), Err(BankError::NotLoggedIn)));
        assert!(matches!(controller.history(), Err(BankError::NotLoggedIn)));

        assert_eq!(count_transactions(controller.connection()).unwrap(), 0);
    }

    #[test]
    fn test_not_logged_in_wins_over_bad_input() {
        let mut controller = test_controller();
        assert!(matches!(controller.deposit("abc"), Err(BankError::NotLoggedIn)));
    }

    #[test]
    fn test_create_account_logs_in() {
        let mut controller = test_controller();

        let session = controller.create_account("Alice", "100").unwrap();
        assert_eq!(session.account_name(), "Alice");
        assert_eq!(controller.state(), SessionState::LoggedIn);
        assert_eq!(controller.check_balance().unwrap(), 100.0);
    }

    #[test]
    fn test_create_account_validation() {
        let mut controller = test_controller();

        assert!(matches!(controller.create_account("", "100"), Err(BankError::InvalidInput(_))));
        assert!(matches!(controller.create_account("Alice", "lots"), Err(BankError::InvalidInput(_))));
        assert!(matches!(controller.create_account("Alice", "-5"), Err(BankError::InvalidInput(_))));

        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert_eq!(count_accounts(controller.connection()).unwrap(), 0);
    }

    #[test]
    fn test_duplicate_account_keeps_existing_row() {
        let mut controller = test_controller();
        controller.create_account("Alice", "100").unwrap();
        controller.logout();

        let err = controller.create_account("Alice", "5").unwrap_err();
        assert!(matches!(err, BankError::DuplicateAccount(_)));
        assert_eq!(controller.state(), SessionState::LoggedOut);

        let conn = controller.connection();
        assert_eq!(count_accounts(conn).unwrap(), 1);
        assert_eq!(find_account(conn, "Alice").unwrap().unwrap().balance, 100.0);
    }

    #[test]
    fn test_login_logout_cycle() {
        let mut controller = test_controller();
        controller.create_account("Alice", "100").unwrap();

        let ended = controller.logout().unwrap();
        assert_eq!(ended.account_name(), "Alice");
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert!(controller.logout().is_none());

        assert!(matches!(controller.login("Bob"), Err(BankError::AccountNotFound(_))));
        assert_eq!(controller.state(), SessionState::LoggedOut);

        controller.login(" Alice ").unwrap();
        assert_eq!(controller.state(), SessionState::LoggedIn);
        assert_eq!(controller.check_balance().unwrap(), 100.0);
    }

    #[test]
    fn test_full_scenario() {
        let mut controller = test_controller();

        // Carol exists with nothing
        controller.create_account("Carol", "0").unwrap();
        controller.logout();

        // Alice opens with 100 and deposits 50
        controller.create_account("Alice", "100").unwrap();
        assert_eq!(controller.deposit("50").unwrap(), 150.0);
        let history = controller.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transaction_type, TransactionType::Deposit);
        assert_eq!(history[0].amount, 50.0);

        // Overdraw is refused
        assert!(matches!(controller.withdraw("200"), Err(BankError::InsufficientFunds { .. })));
        assert_eq!(controller.check_balance().unwrap(), 150.0);

        // Bob does not exist
        assert!(matches!(controller.transfer("Bob", "50"), Err(BankError::UnknownRecipient(_))));
        assert_eq!(controller.check_balance().unwrap(), 150.0);
        assert_eq!(count_transactions(controller.connection()).unwrap(), 1);

        // Carol receives 50
        let receipt = controller.transfer("Carol", "50").unwrap();
        assert_eq!(receipt.sender_balance, 100.0);
        assert_eq!(receipt.recipient_balance, 50.0);
        assert_eq!(count_transactions(controller.connection()).unwrap(), 3);

        controller.logout();
        controller.login("Carol").unwrap();
        assert_eq!(controller.check_balance().unwrap(), 50.0);
        assert_eq!(controller.history().unwrap()[0].transaction_type, TransactionType::TransferIn);
    }
}
