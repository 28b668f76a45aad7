//! Account definitions for ledger.

use bankcore_common::{AccountId, Currency};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer account.
///
/// `balance` counts the smallest unit of `currency` and never goes below
/// zero. Only the transfer engine changes it, inside a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: AccountId,
    /// Owning user identity.
    pub owner: String,
    /// Balance in minor units.
    pub balance: i64,
    /// Account currency.
    pub currency: Currency,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Check whether `username` owns this account.
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.owner == username
    }

    /// Check whether the balance covers a debit.
    pub fn can_debit(&self, amount: i64) -> bool {
        self.balance >= amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_checks() {
        let account = Account {
            id: AccountId::new(1),
            owner: "alice".to_string(),
            balance: 1000,
            currency: Currency::usd(),
            created_at: Utc::now(),
        };

        assert!(account.is_owned_by("alice"));
        assert!(!account.is_owned_by("bob"));
        assert!(account.can_debit(1000));
        assert!(!account.can_debit(1001));
    }
}
