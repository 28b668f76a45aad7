//! Currency codes and integral amount helpers.
//!
//! Amounts are always `i64` counts of the currency's smallest unit. Nothing
//! in this crate stores a fractional amount.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BankError, Result};

/// Currency codes accepted by the bank.
pub const SUPPORTED_CURRENCIES: [&str; 4] = ["USD", "EUR", "KES", "GBP"];

/// ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse a supported currency code. Lowercase input is accepted.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim().to_uppercase();
        if !Self::is_supported(&code) {
            return Err(BankError::validation(
                format!("currency {code} is not supported"),
                "currency",
            ));
        }
        Ok(Self(code))
    }

    /// Check whether a code is in the supported table.
    pub fn is_supported(code: &str) -> bool {
        SUPPORTED_CURRENCIES.contains(&code)
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn kes() -> Self {
        Self("KES".to_string())
    }

    pub fn gbp() -> Self {
        Self("GBP".to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = BankError;

    fn try_from(code: String) -> Result<Self> {
        Self::parse(&code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// A directional currency pair (base -> target).
///
/// The inverse pair is a different pair; rates are never derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPair")]
pub struct CurrencyPair {
    pub base: Currency,
    pub target: Currency,
}

impl CurrencyPair {
    /// Create a new pair, rejecting identical currencies.
    pub fn new(base: Currency, target: Currency) -> Result<Self> {
        if base == target {
            return Err(BankError::validation(
                "base currency cannot be the same as target currency",
                "target_currency",
            ));
        }
        Ok(Self { base, target })
    }
}

#[derive(Deserialize)]
struct RawPair {
    base: Currency,
    target: Currency,
}

impl TryFrom<RawPair> for CurrencyPair {
    type Error = BankError;

    fn try_from(raw: RawPair) -> Result<Self> {
        Self::new(raw.base, raw.target)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.target)
    }
}

/// Reject zero and negative transfer amounts.
pub fn ensure_positive(amount: i64) -> Result<i64> {
    if amount <= 0 {
        return Err(BankError::validation(
            format!("amount must be greater than zero, got {amount}"),
            "amount",
        ));
    }
    Ok(amount)
}

/// Add a delta to a balance, refusing to overflow.
pub fn apply_delta(balance: i64, delta: i64) -> Result<i64> {
    balance
        .checked_add(delta)
        .ok_or_else(|| BankError::validation("balance would overflow", "amount"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("usd").unwrap(), Currency::usd());
        assert_eq!(Currency::parse(" KES ").unwrap().code(), "KES");
        assert!(Currency::parse("JPY").is_err());
    }

    #[test]
    fn test_currency_deserialize_validates() {
        let usd: Currency = serde_json::from_str(r#""usd""#).unwrap();
        assert_eq!(usd, Currency::usd());
        assert_eq!(serde_json::to_string(&usd).unwrap(), r#""USD""#);

        assert!(serde_json::from_str::<Currency>(r#""JPY""#).is_err());
        assert!(serde_json::from_str::<CurrencyPair>(r#"{"base":"USD","target":"USD"}"#).is_err());
        assert!(serde_json::from_str::<CurrencyPair>(r#"{"base":"USD","target":"KES"}"#).is_ok());
    }

    #[test]
    fn test_pair_rejects_same_currency() {
        assert!(CurrencyPair::new(Currency::usd(), Currency::usd()).is_err());
        let pair = CurrencyPair::new(Currency::usd(), Currency::kes()).unwrap();
        assert_eq!(pair.to_string(), "USD/KES");
    }

    #[test]
    fn test_ensure_positive() {
        assert_eq!(ensure_positive(1).unwrap(), 1);
        assert!(ensure_positive(0).is_err());
        assert!(ensure_positive(-5).is_err());
    }

    #[test]
    fn test_apply_delta_overflow() {
        assert_eq!(apply_delta(100, -30).unwrap(), 70);
        assert!(apply_delta(i64::MAX, 1).is_err());
    }
}
