//! Transfer and entry records.
//!
//! Both are write-once: nothing in the crate updates or deletes them.

use bankcore_common::{AccountId, EntryId, TransferId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A completed money movement between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Amount credited to the destination, in destination units.
    pub amount: i64,
    /// Amount debited from the source, in source units.
    pub source_amount: i64,
    /// Rate applied for cross-currency transfers.
    pub exchange_rate: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    /// Signed amount from the point of view of `account_id`.
    ///
    /// Negative source amount for the sender, positive credited amount for
    /// the receiver, `None` for an unrelated account.
    pub fn signed_amount_for(&self, account_id: AccountId) -> Option<i64> {
        if account_id == self.from_account_id {
            Some(-self.source_amount)
        } else if account_id == self.to_account_id {
            Some(self.amount)
        } else {
            None
        }
    }

    pub fn is_cross_currency(&self) -> bool {
        self.exchange_rate.is_some()
    }
}

/// A signed balance delta on one account, produced by one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub transfer_id: TransferId,
    /// Negative for debits, positive for credits.
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn transfer() -> Transfer {
        Transfer {
            id: TransferId::new(1),
            from_account_id: AccountId::new(10),
            to_account_id: AccountId::new(20),
            amount: 1300,
            source_amount: 10,
            exchange_rate: Some(dec!(130)),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_signed_amount_perspective() {
        let t = transfer();
        assert_eq!(t.signed_amount_for(AccountId::new(10)), Some(-10));
        assert_eq!(t.signed_amount_for(AccountId::new(20)), Some(1300));
        assert_eq!(t.signed_amount_for(AccountId::new(30)), None);
        assert!(t.is_cross_currency());
    }
}
