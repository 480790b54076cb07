// Error taxonomy for the banking desk
// Every variant is recoverable: the controller reports it and carries on.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Account with name {0} already exists!")]
    DuplicateAccount(String),

    #[error("Account '{0}' not found. Please create a new account.")]
    AccountNotFound(String),

    #[error("Insufficient funds: balance ${balance}, requested ${requested}")]
    InsufficientFunds { balance: f64, requested: f64 },

    #[error("Recipient account '{0}' does not exist.")]
    UnknownRecipient(String),

    #[error("Please log in first.")]
    NotLoggedIn,

    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl BankError {
    /// True for errors caused by what the user typed or asked for,
    /// as opposed to the store being unreachable.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, BankError::Storage(_))
    }
}

pub type BankResult<T> = Result<T, BankError>;
