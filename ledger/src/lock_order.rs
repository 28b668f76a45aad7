//! Deterministic row-lock ordering.

use bankcore_common::AccountId;

/// Order two account ids for lock acquisition: lower id first.
///
/// Every unit of work that locks two accounts goes through this function, so
/// two transfers over the same pair in opposite directions request the locks
/// in the same order and cannot wait on each other in a cycle.
pub fn ordered_pair(a: AccountId, b: AccountId) -> (AccountId, AccountId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lower_id_first() {
        let low = AccountId::new(1);
        let high = AccountId::new(2);
        assert_eq!(ordered_pair(low, high), (low, high));
        assert_eq!(ordered_pair(high, low), (low, high));
    }

    proptest! {
        #[test]
        fn prop_order_ignores_direction(a in any::<i64>(), b in any::<i64>()) {
            let (a, b) = (AccountId::new(a), AccountId::new(b));
            prop_assert_eq!(ordered_pair(a, b), ordered_pair(b, a));
        }

        #[test]
        fn prop_first_is_never_greater(a in any::<i64>(), b in any::<i64>()) {
            let (first, second) = ordered_pair(AccountId::new(a), AccountId::new(b));
            prop_assert!(first <= second);
            prop_assert_eq!(first.get().min(second.get()), a.min(b));
        }
    }
}
