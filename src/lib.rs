// Bank Desk - Core Library
// Exposes the store, the bank operations and the controller for the
// terminal front-end, the inspection commands and tests.

pub mod error;
pub mod db;
pub mod entities;
pub mod bank;
pub mod controller;

// Re-export commonly used types
pub use error::{BankError, BankResult};
pub use db::{
    StoredAccount, TransactionRecord, TransactionType, DATE_FORMAT,
    open_database, setup_database,
    create_account, find_account, set_balance, list_accounts, count_accounts,
    append_transaction, transactions_for_account, count_transactions,
};
pub use entities::{Account, Session};
pub use bank::{deposit, login, open_account, transfer, withdraw, TransferReceipt};
pub use controller::{parse_amount, parse_name, Controller, SessionState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
