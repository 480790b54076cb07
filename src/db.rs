use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{BankError, BankResult};

/// Timestamp layout written to `transactions.date`
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of balance movement recorded in the transaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    TransferOut,
    TransferIn,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::TransferOut => "transfer_out",
            TransactionType::TransferIn => "transfer_in",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(TransactionType::Deposit),
            "withdraw" => Some(TransactionType::Withdraw),
            "transfer_out" => Some(TransactionType::TransferOut),
            "transfer_in" => Some(TransactionType::TransferIn),
            _ => None,
        }
    }

    /// Transfers carry a counterparty, plain deposits and withdrawals don't
    pub fn is_transfer(&self) -> bool {
        matches!(self, TransactionType::TransferOut | TransactionType::TransferIn)
    }

    /// Sign of the movement from the account holder's point of view
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::TransferIn)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Row of the `accounts` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAccount {
    pub id: i64,
    pub name: String,
    pub balance: f64,
}

/// Row of the `transactions` table. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub account_name: String,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub date: String,
    pub recipient: Option<String>,
}

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> BankResult<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    log::debug!("database ready at {}", path.display());
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> BankResult<()> {
    // WAL keeps the file consistent if the process dies mid-write
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            balance REAL NOT NULL
        )",
        [],
    )?;

    // Append-only: nothing in this crate issues UPDATE or DELETE against it
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_name TEXT NOT NULL,
            transaction_type TEXT NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            recipient TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_name)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ACCOUNT STORE
// ============================================================================

/// Insert a new account. Fails with `DuplicateAccount` if the name is taken.
pub fn create_account(conn: &Connection, name: &str, balance: f64) -> BankResult<StoredAccount> {
    let result = conn.execute(
        "INSERT INTO accounts (name, balance) VALUES (?1, ?2)",
        params![name, balance],
    );

    match result {
        Ok(_) => Ok(StoredAccount {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            balance,
        }),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(BankError::DuplicateAccount(name.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn find_account(conn: &Connection, name: &str) -> BankResult<Option<StoredAccount>> {
    let account = conn
        .query_row(
            "SELECT id, name, balance FROM accounts WHERE name = ?1",
            params![name],
            |row| {
                Ok(StoredAccount {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    balance: row.get(2)?,
                })
            },
        )
        .optional()?;

    Ok(account)
}

/// Overwrite the stored balance. Returns the number of rows touched (0 or 1).
pub fn set_balance(conn: &Connection, name: &str, balance: f64) -> BankResult<usize> {
    let updated = conn.execute(
        "UPDATE accounts SET balance = ?1 WHERE name = ?2",
        params![balance, name],
    )?;
    Ok(updated)
}

pub fn list_accounts(conn: &Connection) -> BankResult<Vec<StoredAccount>> {
    let mut stmt = conn.prepare("SELECT id, name, balance FROM accounts ORDER BY name")?;

    let accounts = stmt
        .query_map([], |row| {
            Ok(StoredAccount {
                id: row.get(0)?,
                name: row.get(1)?,
                balance: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(accounts)
}

pub fn count_accounts(conn: &Connection) -> BankResult<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// TRANSACTION LOG
// ============================================================================

/// Append a record to the transaction log, stamped with the local time
pub fn append_transaction(
    conn: &Connection,
    account_name: &str,
    transaction_type: TransactionType,
    amount: f64,
    recipient: Option<&str>,
) -> BankResult<i64> {
    if transaction_type.is_transfer() != recipient.is_some() {
        return Err(BankError::InvalidInput(format!(
            "{} records {} a counterparty",
            transaction_type,
            if transaction_type.is_transfer() { "need" } else { "cannot have" }
        )));
    }

    let date = Local::now().format(DATE_FORMAT).to_string();

    conn.execute(
        "INSERT INTO transactions (account_name, transaction_type, amount, date, recipient)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![account_name, transaction_type.as_str(), amount, date, recipient],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Transaction log of one account, newest first
pub fn transactions_for_account(
    conn: &Connection,
    account_name: &str,
) -> BankResult<Vec<TransactionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_name, transaction_type, amount, date, recipient
         FROM transactions
         WHERE account_name = ?1
         ORDER BY id DESC",
    )?;

    let records = stmt
        .query_map(params![account_name], |row| {
            let type_str: String = row.get(2)?;
            let transaction_type = TransactionType::parse(&type_str).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(
                    2,
                    "transaction_type".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;

            Ok(TransactionRecord {
                id: row.get(0)?,
                account_name: row.get(1)?,
                transaction_type,
                amount: row.get(3)?,
                date: row.get(4)?,
                recipient: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn count_transactions(conn: &Connection) -> BankResult<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
    Ok(count)
}
