//! Administrator-gated exchange rate management.

use std::sync::Arc;

use bankcore_common::{
    AuthFailure, BankError, Currency, CurrencyPair, ExchangeRateId, Result,
};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::rate::{validate_rate, ExchangeRate};
use crate::store::RateStore;

/// Reads are public; writes are reserved for the administrator identity.
pub struct ExchangeRateService {
    store: Arc<dyn RateStore>,
    admin_username: String,
}

impl ExchangeRateService {
    pub fn new(store: Arc<dyn RateStore>, admin_username: impl Into<String>) -> Self {
        Self {
            store,
            admin_username: admin_username.into(),
        }
    }

    /// Create a rate for a new directional pair.
    #[instrument(skip(self))]
    pub async fn create_exchange_rate(
        &self,
        caller: &str,
        base_currency: &str,
        target_currency: &str,
        rate: Decimal,
    ) -> Result<ExchangeRate> {
        self.require_admin(caller)?;
        let pair = CurrencyPair::new(
            Currency::parse(base_currency)?,
            Currency::parse(target_currency)?,
        )?;
        let rate = validate_rate(rate)?;

        let created = self.store.create_exchange_rate(&pair, rate).await?;
        info!(id = %created.id, pair = %pair, rate = %rate, "Exchange rate created");
        Ok(created)
    }

    /// Replace the rate of an existing row.
    #[instrument(skip(self))]
    pub async fn update_exchange_rate(
        &self,
        caller: &str,
        id: ExchangeRateId,
        rate: Decimal,
    ) -> Result<ExchangeRate> {
        self.require_admin(caller)?;
        let rate = validate_rate(rate)?;

        let updated = self.store.update_exchange_rate(id, rate).await?;
        info!(id = %id, rate = %rate, "Exchange rate updated");
        Ok(updated)
    }

    /// Look up the rate for a directional pair.
    pub async fn get_exchange_rate(
        &self,
        base_currency: &str,
        target_currency: &str,
    ) -> Result<ExchangeRate> {
        let pair = CurrencyPair::new(
            Currency::parse(base_currency)?,
            Currency::parse(target_currency)?,
        )?;
        self.store
            .get_exchange_rate(&pair)
            .await?
            .ok_or(BankError::ExchangeRateNotFound(pair))
    }

    pub async fn list_exchange_rates(&self) -> Result<Vec<ExchangeRate>> {
        self.store.list_exchange_rates().await
    }

    fn require_admin(&self, caller: &str) -> Result<()> {
        if caller != self.admin_username {
            warn!(caller, "Rejected exchange rate write from non-administrator");
            return Err(AuthFailure::NotAdministrator.into());
        }
        Ok(())
    }
}
