//! Persistence collaborator for accounts, transfers and entries.

use async_trait::async_trait;
use bankcore_common::{AccountId, Currency, CurrencyPair, Result, TransferId};
use bankcore_fx::ExchangeRate;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::account::Account;
use crate::journal::{Entry, Transfer};

/// Transfer row to insert.
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
    pub source_amount: i64,
    pub exchange_rate: Option<Decimal>,
}

/// Entry row to insert.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub account_id: AccountId,
    pub transfer_id: TransferId,
    pub amount: i64,
}

/// Selection of transfers touching one account.
#[derive(Debug, Clone)]
pub struct TransferFilter {
    pub account_id: AccountId,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_until: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// Store operations outside a unit of work, plus the entry point to one.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a unit of work. Dropping it without `commit` rolls it back.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>>;

    /// Open an empty account. One account per owner and currency.
    async fn create_account(&self, owner: &str, currency: &Currency) -> Result<Account>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    /// Accounts of one owner, ordered by id.
    async fn list_accounts(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Account>>;

    /// Transfers where the account is source or destination, ordered by id.
    async fn list_transfers(&self, filter: &TransferFilter) -> Result<Vec<Transfer>>;

    /// Entries recorded for one transfer.
    async fn list_entries(&self, transfer_id: TransferId) -> Result<Vec<Entry>>;
}

/// One atomic unit of work.
///
/// Accounts must be read through `get_account_for_update` before their
/// balance is written; that read takes the row lock and holds it until the
/// unit of work ends.
#[async_trait]
pub trait LedgerTx: Send {
    /// Lock an account row and read its current state.
    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Option<Account>>;

    /// Read the rate for a pair inside this unit of work.
    async fn get_exchange_rate(&mut self, pair: &CurrencyPair) -> Result<Option<ExchangeRate>>;

    async fn create_transfer(&mut self, transfer: NewTransfer) -> Result<Transfer>;

    async fn create_entry(&mut self, entry: NewEntry) -> Result<Entry>;

    /// Set the balance of a locked account.
    async fn update_account_balance(&mut self, id: AccountId, balance: i64) -> Result<Account>;

    /// Make every write visible at once.
    ///
    /// `Contention` means nothing was committed; `Indeterminate` means the
    /// outcome is unknown.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every write.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
