//! Exchange rate rows.

use bankcore_common::{BankError, Currency, CurrencyPair, ExchangeRateId, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A directional conversion rate: one unit of `base_currency` buys `rate`
/// units of `target_currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: ExchangeRateId,
    pub base_currency: Currency,
    pub target_currency: Currency,
    pub rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRate {
    /// Get the pair this rate converts.
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair {
            base: self.base_currency.clone(),
            target: self.target_currency.clone(),
        }
    }
}

/// Reject zero and negative rates.
pub fn validate_rate(rate: Decimal) -> Result<Decimal> {
    if rate <= Decimal::ZERO {
        return Err(BankError::validation(
            "exchange rate must be greater than zero",
            "exchange_rate",
        ));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate(dec!(130.5)).is_ok());
        assert!(validate_rate(Decimal::ZERO).is_err());
        assert!(validate_rate(dec!(-1)).is_err());
    }
}
