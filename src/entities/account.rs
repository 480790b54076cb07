// 💳 Account Entity - the logged-in account held in memory
//
// Balance changes happen here first and are written through to the store
// by the bank operations. The balance never goes negative.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::StoredAccount;
use crate::error::{BankError, BankResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account name (the only identity the desk knows)
    pub name: String,

    balance: f64,
}

impl Account {
    pub fn new(name: impl Into<String>, balance: f64) -> Self {
        Account {
            name: name.into(),
            balance,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Add a positive amount. Returns the new balance.
    pub fn deposit(&mut self, amount: f64) -> BankResult<f64> {
        check_amount(amount)?;
        self.balance = credited(self.balance, amount)?;
        Ok(self.balance)
    }

    /// Remove a positive amount no larger than the balance. Returns the new balance.
    pub fn withdraw(&mut self, amount: f64) -> BankResult<f64> {
        check_amount(amount)?;
        if amount > self.balance {
            return Err(BankError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }
}

impl From<StoredAccount> for Account {
    fn from(stored: StoredAccount) -> Self {
        Account::new(stored.name, stored.balance)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account holder: {}, Balance: ${}", self.name, self.balance)
    }
}

/// Balance after adding `amount`, refused if it no longer fits in an f64
pub(crate) fn credited(balance: f64, amount: f64) -> BankResult<f64> {
    let next = balance + amount;
    if next.is_finite() {
        Ok(next)
    } else {
        Err(BankError::InvalidInput(format!(
            "amount {} would overflow the balance",
            amount
        )))
    }
}

fn check_amount(amount: f64) -> BankResult<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(BankError::InvalidInput(format!(
            "amount must be a positive number, got {}",
            amount
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_adds_to_balance() {
        let mut account = Account::new("Alice", 100.0);
        assert_eq!(account.deposit(50.0).unwrap(), 150.0);
        assert_eq!(account.balance(), 150.0);
    }

    #[test]
    fn test_deposit_rejects_non_positive() {
        let mut account = Account::new("Alice", 100.0);
        assert!(matches!(account.deposit(0.0), Err(BankError::InvalidInput(_))));
        assert!(matches!(account.deposit(-5.0), Err(BankError::InvalidInput(_))));
        assert!(matches!(account.deposit(f64::NAN), Err(BankError::InvalidInput(_))));
        assert_eq!(account.balance(), 100.0);
    }

    #[test]
    fn test_deposit_overflow_rejected() {
        let mut account = Account::new("Alice", 1e308);
        assert!(matches!(account.deposit(1e308), Err(BankError::InvalidInput(_))));
        assert_eq!(account.balance(), 1e308);
    }

    #[test]
    fn test_withdraw_within_balance() {
        let mut account = Account::new("Alice", 150.0);
        assert_eq!(account.withdraw(150.0).unwrap(), 0.0);
    }

    #[test]
    fn test_withdraw_insufficient_funds_leaves_balance() {
        let mut account = Account::new("Alice", 150.0);

        let err = account.withdraw(200.0).unwrap_err();
        assert!(matches!(
            err,
            BankError::InsufficientFunds { balance, requested } if balance == 150.0 && requested == 200.0
        ));
        assert_eq!(account.balance(), 150.0);
    }

    #[test]
    fn test_from_stored_and_display() {
        let stored = StoredAccount {
            id: 7,
            name: "Carol".to_string(),
            balance: 12.5,
        };
        let account = Account::from(stored);
        assert_eq!(account.to_string(), "Account holder: Carol, Balance: $12.5");
    }
}
