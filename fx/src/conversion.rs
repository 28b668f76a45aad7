//! Currency conversion arithmetic.
//!
//! Conversion is the only place a fractional value exists, and it never
//! outlives this module: the product is floored to whole destination units
//! before it is returned.

use bankcore_common::{BankError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rate::ExchangeRate;

/// Outcome of converting a source amount with a captured rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    /// Amount debited, in source units.
    pub source_amount: i64,
    /// Amount credited, in destination units: `floor(source_amount * rate)`.
    pub converted_amount: i64,
    /// The rate used.
    pub rate: Decimal,
}

/// Convert `amount` source units with `rate`.
///
/// Fails with `AmountTooSmall` when the floored product is below one unit,
/// reporting the smallest source amount that would convert.
pub fn convert(amount: i64, rate: &ExchangeRate) -> Result<Conversion> {
    let converted_amount = floor_product(amount, rate.rate)?;

    if converted_amount < 1 {
        return Err(BankError::AmountTooSmall {
            min_amount: min_source_amount(rate.rate)?,
            source_currency: rate.base_currency.clone(),
            target_currency: rate.target_currency.clone(),
        });
    }

    Ok(Conversion {
        source_amount: amount,
        converted_amount,
        rate: rate.rate,
    })
}

/// Smallest integral source amount whose conversion is at least one unit.
///
/// Starts from `ceil(1 / rate)` and corrects upward for the precision lost
/// in the division.
pub fn min_source_amount(rate: Decimal) -> Result<i64> {
    if rate >= Decimal::ONE {
        return Ok(1);
    }

    let inverse = Decimal::ONE
        .checked_div(rate)
        .ok_or_else(|| BankError::validation("exchange rate is too small", "exchange_rate"))?;
    let mut candidate = inverse
        .ceil()
        .to_i64()
        .ok_or_else(|| BankError::validation("exchange rate is too small", "exchange_rate"))?;

    while floor_product(candidate, rate)? < 1 {
        candidate += 1;
    }

    Ok(candidate)
}

fn floor_product(amount: i64, rate: Decimal) -> Result<i64> {
    Decimal::from(amount)
        .checked_mul(rate)
        .and_then(|product| product.floor().to_i64())
        .ok_or_else(|| BankError::validation("converted amount is out of range", "amount"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankcore_common::{Currency, ErrorKind, ExchangeRateId};
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn rate(base: Currency, target: Currency, value: Decimal) -> ExchangeRate {
        ExchangeRate {
            id: ExchangeRateId::new(1),
            base_currency: base,
            target_currency: target,
            rate: value,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_usd_to_kes() {
        let usd_kes = rate(Currency::usd(), Currency::kes(), dec!(130.0));
        let conversion = convert(10, &usd_kes).unwrap();
        assert_eq!(conversion.source_amount, 10);
        assert_eq!(conversion.converted_amount, 1300);
    }

    #[test]
    fn test_conversion_truncates_toward_zero() {
        let eur_gbp = rate(Currency::eur(), Currency::gbp(), dec!(0.86));
        // 99 * 0.86 = 85.14
        assert_eq!(convert(99, &eur_gbp).unwrap().converted_amount, 85);
    }

    #[test]
    fn test_amount_too_small_reports_minimum() {
        let kes_usd = rate(Currency::kes(), Currency::usd(), dec!(0.0077));
        let err = convert(100, &kes_usd).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        match err {
            BankError::AmountTooSmall {
                min_amount,
                source_currency,
                target_currency,
            } => {
                // 1 / 0.0077 = 129.87...
                assert_eq!(min_amount, 130);
                assert_eq!(source_currency, Currency::kes());
                assert_eq!(target_currency, Currency::usd());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_min_source_amount_for_large_rates() {
        assert_eq!(min_source_amount(dec!(130)).unwrap(), 1);
        assert_eq!(min_source_amount(dec!(1)).unwrap(), 1);
        assert_eq!(min_source_amount(dec!(0.5)).unwrap(), 2);
    }

    #[test]
    fn test_overflow_is_validation_error() {
        let huge = rate(Currency::usd(), Currency::kes(), dec!(1000));
        let err = convert(i64::MAX, &huge).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    proptest! {
        #[test]
        fn prop_min_source_amount_is_tight(millis in 1u32..1_000_000u32) {
            let rate = Decimal::new(i64::from(millis), 6);
            let min = min_source_amount(rate).unwrap();
            prop_assert!(floor_product(min, rate).unwrap() >= 1);
            prop_assert!(min == 1 || floor_product(min - 1, rate).unwrap() < 1);
        }

        #[test]
        fn prop_converted_amount_is_floor(amount in 1i64..10_000_000, cents in 1i64..100_000) {
            let value = Decimal::new(cents, 2);
            let r = rate(Currency::usd(), Currency::kes(), value);
            match convert(amount, &r) {
                Ok(c) => {
                    let exact = Decimal::from(amount) * value;
                    prop_assert!(Decimal::from(c.converted_amount) <= exact);
                    prop_assert!(exact - Decimal::from(c.converted_amount) < Decimal::ONE);
                }
                Err(BankError::AmountTooSmall { .. }) => {
                    prop_assert!(Decimal::from(amount) * value < Decimal::ONE);
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }
}
