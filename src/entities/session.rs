// Session - the authenticated account context of the desk

use chrono::{DateTime, Local};
use uuid::Uuid;

use super::account::Account;

#[derive(Debug, Clone)]
pub struct Session {
    /// Tags log lines belonging to this login
    pub id: Uuid,
    pub started_at: DateTime<Local>,
    account: Account,
}

impl Session {
    pub fn new(account: Account) -> Self {
        Session {
            id: Uuid::new_v4(),
            started_at: Local::now(),
            account,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn account_name(&self) -> &str {
        &self.account.name
    }

    pub fn balance(&self) -> f64 {
        self.account.balance()
    }

    /// Time elapsed since login
    pub fn duration(&self) -> chrono::Duration {
        Local::now().signed_duration_since(self.started_at)
    }

    /// Replace the in-memory account once its new state has been committed
    pub(crate) fn commit_account(&mut self, account: Account) {
        debug_assert_eq!(account.name, self.account.name);
        self.account = account;
    }
}
