//! Postgres-backed exchange rate table.

use async_trait::async_trait;
use bankcore_common::db::classify;
use bankcore_common::{BankError, Currency, CurrencyPair, ExchangeRateId, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use tracing::instrument;

use crate::rate::ExchangeRate;
use crate::store::RateStore;

/// Row type mapping the `exchange_rates` table.
#[derive(Debug, sqlx::FromRow)]
struct ExchangeRateRow {
    id: i64,
    base_currency: String,
    target_currency: String,
    rate: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ExchangeRateRow> for ExchangeRate {
    type Error = BankError;

    fn try_from(row: ExchangeRateRow) -> Result<Self> {
        let base_currency = Currency::parse(&row.base_currency)
            .map_err(|e| BankError::Internal(format!("exchange rate {}: {e}", row.id)))?;
        let target_currency = Currency::parse(&row.target_currency)
            .map_err(|e| BankError::Internal(format!("exchange rate {}: {e}", row.id)))?;

        Ok(ExchangeRate {
            id: ExchangeRateId::new(row.id),
            base_currency,
            target_currency,
            rate: row.rate,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fetch the rate for a pair through any executor.
///
/// The transfer engine calls this with its open transaction so the rate is
/// read inside the same unit of work as the balance mutation.
pub async fn fetch_exchange_rate<'e, E>(executor: E, pair: &CurrencyPair) -> Result<Option<ExchangeRate>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, ExchangeRateRow>(
        r#"
        SELECT id, base_currency, target_currency, rate, created_at, updated_at
        FROM exchange_rates
        WHERE base_currency = $1 AND target_currency = $2
        "#,
    )
    .bind(pair.base.code())
    .bind(pair.target.code())
    .fetch_optional(executor)
    .await
    .map_err(|e| classify(e, "failed to load exchange rate"))?;

    row.map(ExchangeRate::try_from).transpose()
}

/// Exchange rate table in Postgres.
#[derive(Clone)]
pub struct PgRateStore {
    pool: PgPool,
}

impl PgRateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    #[instrument(skip(self), fields(pair = %pair))]
    async fn create_exchange_rate(
        &self,
        pair: &CurrencyPair,
        rate: Decimal,
    ) -> Result<ExchangeRate> {
        let row = sqlx::query_as::<_, ExchangeRateRow>(
            r#"
            INSERT INTO exchange_rates (base_currency, target_currency, rate)
            VALUES ($1, $2, $3)
            RETURNING id, base_currency, target_currency, rate, created_at, updated_at
            "#,
        )
        .bind(pair.base.code())
        .bind(pair.target.code())
        .bind(rate)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to create exchange rate"))?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn update_exchange_rate(
        &self,
        id: ExchangeRateId,
        rate: Decimal,
    ) -> Result<ExchangeRate> {
        let row = sqlx::query_as::<_, ExchangeRateRow>(
            r#"
            UPDATE exchange_rates
            SET rate = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, base_currency, target_currency, rate, created_at, updated_at
            "#,
        )
        .bind(id.get())
        .bind(rate)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to update exchange rate"))?
        .ok_or(BankError::ExchangeRateIdNotFound(id))?;

        row.try_into()
    }

    #[instrument(skip(self), fields(pair = %pair))]
    async fn get_exchange_rate(&self, pair: &CurrencyPair) -> Result<Option<ExchangeRate>> {
        fetch_exchange_rate(&self.pool, pair).await
    }

    #[instrument(skip(self))]
    async fn list_exchange_rates(&self) -> Result<Vec<ExchangeRate>> {
        let rows = sqlx::query_as::<_, ExchangeRateRow>(
            r#"
            SELECT id, base_currency, target_currency, rate, created_at, updated_at
            FROM exchange_rates
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to list exchange rates"))?;

        rows.into_iter().map(ExchangeRate::try_from).collect()
    }
}
