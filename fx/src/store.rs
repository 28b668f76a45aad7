//! Exchange rate persistence.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use bankcore_common::{BankError, CurrencyPair, ExchangeRateId, Result};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use crate::rate::{validate_rate, ExchangeRate};

/// Persistence collaborator for the exchange rate table.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Insert a rate for a pair that has none yet.
    async fn create_exchange_rate(&self, pair: &CurrencyPair, rate: Decimal)
        -> Result<ExchangeRate>;

    /// Replace the rate of an existing row.
    async fn update_exchange_rate(&self, id: ExchangeRateId, rate: Decimal)
        -> Result<ExchangeRate>;

    /// Look up the rate for a directional pair.
    async fn get_exchange_rate(&self, pair: &CurrencyPair) -> Result<Option<ExchangeRate>>;

    /// All rates, ordered by id.
    async fn list_exchange_rates(&self) -> Result<Vec<ExchangeRate>>;
}

/// In-process rate table.
pub struct MemoryRateStore {
    rates: DashMap<CurrencyPair, ExchangeRate>,
    next_id: AtomicI64,
}

impl MemoryRateStore {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            rates: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Read the current rate for a pair without going through the trait.
    pub fn current(&self, pair: &CurrencyPair) -> Option<ExchangeRate> {
        self.rates.get(pair).map(|r| r.clone())
    }
}

impl Default for MemoryRateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn create_exchange_rate(
        &self,
        pair: &CurrencyPair,
        rate: Decimal,
    ) -> Result<ExchangeRate> {
        let rate = validate_rate(rate)?;
        match self.rates.entry(pair.clone()) {
            Entry::Occupied(_) => Err(BankError::Duplicate(format!("exchange rate {pair}"))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let row = ExchangeRate {
                    id: ExchangeRateId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
                    base_currency: pair.base.clone(),
                    target_currency: pair.target.clone(),
                    rate,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(row.clone());
                debug!(pair = %pair, rate = %rate, "Exchange rate inserted");
                Ok(row)
            }
        }
    }

    async fn update_exchange_rate(
        &self,
        id: ExchangeRateId,
        rate: Decimal,
    ) -> Result<ExchangeRate> {
        let rate = validate_rate(rate)?;
        let mut row = self
            .rates
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(BankError::ExchangeRateIdNotFound(id))?;
        row.rate = rate;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn get_exchange_rate(&self, pair: &CurrencyPair) -> Result<Option<ExchangeRate>> {
        Ok(self.current(pair))
    }

    async fn list_exchange_rates(&self) -> Result<Vec<ExchangeRate>> {
        let mut rates: Vec<ExchangeRate> = self.rates.iter().map(|r| r.clone()).collect();
        rates.sort_by_key(|r| r.id);
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankcore_common::{Currency, ErrorKind};
    use rust_decimal_macros::dec;

    fn usd_kes() -> CurrencyPair {
        CurrencyPair::new(Currency::usd(), Currency::kes()).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryRateStore::new();
        let created = store.create_exchange_rate(&usd_kes(), dec!(130)).await.unwrap();

        let fetched = store.get_exchange_rate(&usd_kes()).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.rate, dec!(130));
    }

    #[tokio::test]
    async fn test_inverse_pair_is_not_derived() {
        let store = MemoryRateStore::new();
        store.create_exchange_rate(&usd_kes(), dec!(130)).await.unwrap();

        let kes_usd = CurrencyPair::new(Currency::kes(), Currency::usd()).unwrap();
        assert!(store.get_exchange_rate(&kes_usd).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_pair_conflicts() {
        let store = MemoryRateStore::new();
        store.create_exchange_rate(&usd_kes(), dec!(130)).await.unwrap();
        let err = store
            .create_exchange_rate(&usd_kes(), dec!(131))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_update_and_list() {
        let store = MemoryRateStore::new();
        let created = store.create_exchange_rate(&usd_kes(), dec!(130)).await.unwrap();
        let gbp_usd = CurrencyPair::new(Currency::gbp(), Currency::usd()).unwrap();
        store.create_exchange_rate(&gbp_usd, dec!(1.27)).await.unwrap();

        let updated = store
            .update_exchange_rate(created.id, dec!(128.5))
            .await
            .unwrap();
        assert_eq!(updated.rate, dec!(128.5));

        let all = store.list_exchange_rates().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, created.id);
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let store = MemoryRateStore::new();
        let err = store
            .update_exchange_rate(ExchangeRateId::new(99), dec!(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_non_positive_rate_rejected() {
        let store = MemoryRateStore::new();
        let err = store
            .create_exchange_rate(&usd_kes(), dec!(-130))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.current(&usd_kes()).is_none());

        let created = store.create_exchange_rate(&usd_kes(), dec!(130)).await.unwrap();
        assert!(store
            .update_exchange_rate(created.id, Decimal::ZERO)
            .await
            .is_err());
        assert_eq!(store.current(&usd_kes()).unwrap().rate, dec!(130));
    }
}
