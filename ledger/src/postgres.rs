//! Postgres-backed ledger store.

use std::time::Duration;

use async_trait::async_trait;
use bankcore_common::db::{classify, classify_commit};
use bankcore_common::{
    AccountId, BankError, Currency, CurrencyPair, EntryId, Result, TransferId,
};
use bankcore_fx::postgres::fetch_exchange_rate;
use bankcore_fx::ExchangeRate;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use crate::account::Account;
use crate::journal::{Entry, Transfer};
use crate::store::{LedgerStore, LedgerTx, NewEntry, NewTransfer, TransferFilter};

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    owner: String,
    balance: i64,
    currency: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = BankError;

    fn try_from(row: AccountRow) -> Result<Self> {
        let currency = Currency::parse(&row.currency)
            .map_err(|e| BankError::Internal(format!("account {}: {e}", row.id)))?;

        Ok(Account {
            id: AccountId::new(row.id),
            owner: row.owner,
            balance: row.balance,
            currency,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransferRow {
    id: i64,
    from_account_id: i64,
    to_account_id: i64,
    amount: i64,
    source_amount: i64,
    exchange_rate: Option<Decimal>,
    created_at: DateTime<Utc>,
}

impl From<TransferRow> for Transfer {
    fn from(row: TransferRow) -> Self {
        Transfer {
            id: TransferId::new(row.id),
            from_account_id: AccountId::new(row.from_account_id),
            to_account_id: AccountId::new(row.to_account_id),
            amount: row.amount,
            source_amount: row.source_amount,
            exchange_rate: row.exchange_rate,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: i64,
    account_id: i64,
    transfer_id: i64,
    amount: i64,
    created_at: DateTime<Utc>,
}

impl From<EntryRow> for Entry {
    fn from(row: EntryRow) -> Self {
        Entry {
            id: EntryId::new(row.id),
            account_id: AccountId::new(row.account_id),
            transfer_id: TransferId::new(row.transfer_id),
            amount: row.amount,
            created_at: row.created_at,
        }
    }
}

/// Ledger tables in Postgres.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify(e, "failed to begin transaction"))?;

        // SET does not accept bind parameters; the value is an integer we own.
        let statement = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify(e, "failed to set lock timeout"))?;

        Ok(Box::new(PgLedgerTx { tx }))
    }

    #[instrument(skip(self), fields(currency = %currency))]
    async fn create_account(&self, owner: &str, currency: &Currency) -> Result<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (owner, balance, currency)
            VALUES ($1, 0, $2)
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(owner)
        .bind(currency.code())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to create account"))?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to load account"))?;

        row.map(Account::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_accounts(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            WHERE owner = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to list accounts"))?;

        rows.into_iter().map(Account::try_from).collect()
    }

    #[instrument(skip(self), fields(account_id = %filter.account_id))]
    async fn list_transfers(&self, filter: &TransferFilter) -> Result<Vec<Transfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT id, from_account_id, to_account_id, amount, source_amount,
                   exchange_rate, created_at
            FROM transfers
            WHERE (from_account_id = $1 OR to_account_id = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY id
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.account_id.get())
        .bind(filter.created_from)
        .bind(filter.created_until)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to list transfers"))?;

        Ok(rows.into_iter().map(Transfer::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_entries(&self, transfer_id: TransferId) -> Result<Vec<Entry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, account_id, transfer_id, amount, created_at
            FROM entries
            WHERE transfer_id = $1
            ORDER BY id
            "#,
        )
        .bind(transfer_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to list entries"))?;

        Ok(rows.into_iter().map(Entry::from).collect())
    }
}

/// Open Postgres transaction. Dropping it issues a rollback.
struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    #[instrument(skip(self))]
    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            WHERE id = $1
            FOR NO KEY UPDATE
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| classify(e, "failed to lock account"))?;

        row.map(Account::try_from).transpose()
    }

    #[instrument(skip(self), fields(pair = %pair))]
    async fn get_exchange_rate(&mut self, pair: &CurrencyPair) -> Result<Option<ExchangeRate>> {
        fetch_exchange_rate(&mut *self.tx, pair).await
    }

    async fn create_transfer(&mut self, transfer: NewTransfer) -> Result<Transfer> {
        let row = sqlx::query_as::<_, TransferRow>(
            r#"
            INSERT INTO transfers (from_account_id, to_account_id, amount, source_amount, exchange_rate)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, from_account_id, to_account_id, amount, source_amount,
                      exchange_rate, created_at
            "#,
        )
        .bind(transfer.from_account_id.get())
        .bind(transfer.to_account_id.get())
        .bind(transfer.amount)
        .bind(transfer.source_amount)
        .bind(transfer.exchange_rate)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| classify(e, "failed to create transfer"))?;

        Ok(row.into())
    }

    async fn create_entry(&mut self, entry: NewEntry) -> Result<Entry> {
        let row = sqlx::query_as::<_, EntryRow>(
            r#"
            INSERT INTO entries (account_id, transfer_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, transfer_id, amount, created_at
            "#,
        )
        .bind(entry.account_id.get())
        .bind(entry.transfer_id.get())
        .bind(entry.amount)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| classify(e, "failed to create entry"))?;

        Ok(row.into())
    }

    async fn update_account_balance(&mut self, id: AccountId, balance: i64) -> Result<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts
            SET balance = $2
            WHERE id = $1
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(id.get())
        .bind(balance)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| classify(e, "failed to update account balance"))?
        .ok_or(BankError::AccountNotFound(id))?;

        row.try_into()
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| classify_commit(e, "failed to commit transfer"))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| classify(e, "failed to roll back transfer"))
    }
}
