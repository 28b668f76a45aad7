//! In-process ledger store.
//!
//! Row locks are per-account async mutexes, acquired under a timeout the
//! same way Postgres applies `lock_timeout`. Writes made inside a unit of
//! work are buffered and applied in one step at commit; dropping the unit of
//! work discards them and releases its locks.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bankcore_common::time::default_lock_timeout;
use bankcore_common::{
    AccountId, BankError, Currency, CurrencyPair, EntryId, Result, TransferId,
};
use bankcore_fx::{ExchangeRate, MemoryRateStore};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use tracing::{debug, instrument};

use crate::account::Account;
use crate::journal::{Entry, Transfer};
use crate::store::{LedgerStore, LedgerTx, NewEntry, NewTransfer, TransferFilter};

/// Failure to inject into the next commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitFault {
    /// Commit is refused and nothing is applied.
    Contention,
    /// Writes are applied but the caller is told the outcome is unknown.
    LostAcknowledgement,
}

struct LedgerState {
    accounts: RwLock<BTreeMap<AccountId, Account>>,
    row_locks: DashMap<AccountId, Arc<RowLock<()>>>,
    transfers: RwLock<Vec<Transfer>>,
    entries: RwLock<Vec<Entry>>,
    next_account_id: AtomicI64,
    next_transfer_id: AtomicI64,
    next_entry_id: AtomicI64,
    commit_faults: Mutex<VecDeque<CommitFault>>,
}

impl LedgerState {
    fn new() -> Self {
        Self {
            accounts: RwLock::new(BTreeMap::new()),
            row_locks: DashMap::new(),
            transfers: RwLock::new(Vec::new()),
            entries: RwLock::new(Vec::new()),
            next_account_id: AtomicI64::new(1),
            next_transfer_id: AtomicI64::new(1),
            next_entry_id: AtomicI64::new(1),
            commit_faults: Mutex::new(VecDeque::new()),
        }
    }

    fn account(&self, id: AccountId) -> Option<Account> {
        self.accounts.read().get(&id).cloned()
    }

    fn row_lock(&self, id: AccountId) -> Arc<RowLock<()>> {
        self.row_locks.entry(id).or_default().clone()
    }

    fn open_account(&self, owner: &str, currency: &Currency, balance: i64) -> Result<Account> {
        let mut accounts = self.accounts.write();
        if accounts
            .values()
            .any(|a| a.owner == owner && &a.currency == currency)
        {
            return Err(BankError::Duplicate(format!(
                "account for {owner} in {currency}"
            )));
        }

        let account = Account {
            id: AccountId::new(self.next_account_id.fetch_add(1, Ordering::SeqCst)),
            owner: owner.to_string(),
            balance,
            currency: currency.clone(),
            created_at: Utc::now(),
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn apply(&self, accounts: HashMap<AccountId, Account>, transfers: Vec<Transfer>, entries: Vec<Entry>) {
        let mut rows = self.accounts.write();
        let mut transfer_rows = self.transfers.write();
        let mut entry_rows = self.entries.write();

        for (id, account) in accounts {
            rows.insert(id, account);
        }
        transfer_rows.extend(transfers);
        entry_rows.extend(entries);
    }
}

/// Ledger store held entirely in memory.
#[derive(Clone)]
pub struct MemoryLedgerStore {
    state: Arc<LedgerState>,
    rates: Arc<MemoryRateStore>,
    lock_timeout: Duration,
}

impl MemoryLedgerStore {
    /// Create an empty ledger that reads rates from `rates`.
    pub fn new(rates: Arc<MemoryRateStore>) -> Self {
        Self {
            state: Arc::new(LedgerState::new()),
            rates,
            lock_timeout: default_lock_timeout(),
        }
    }

    /// Override how long a unit of work waits for a row lock.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Open an account with an opening balance.
    pub fn insert_account(&self, owner: &str, currency: Currency, balance: i64) -> Result<Account> {
        if balance < 0 {
            return Err(BankError::validation(
                "opening balance cannot be negative",
                "balance",
            ));
        }
        self.state.open_account(owner, &currency, balance)
    }

    /// Make the next commit fail in the given way.
    pub fn inject_commit_fault(&self, fault: CommitFault) {
        self.state.commit_faults.lock().push_back(fault);
    }

    /// Snapshot of all accounts, ordered by id.
    pub fn accounts(&self) -> Vec<Account> {
        self.state.accounts.read().values().cloned().collect()
    }

    /// Snapshot of all committed transfers.
    pub fn transfers(&self) -> Vec<Transfer> {
        self.state.transfers.read().clone()
    }

    /// Snapshot of all committed entries.
    pub fn entries(&self) -> Vec<Entry> {
        self.state.entries.read().clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        Ok(Box::new(MemoryLedgerTx {
            state: self.state.clone(),
            rates: self.rates.clone(),
            lock_timeout: self.lock_timeout,
            guards: Vec::new(),
            locked: HashMap::new(),
            transfers: Vec::new(),
            entries: Vec::new(),
        }))
    }

    async fn create_account(&self, owner: &str, currency: &Currency) -> Result<Account> {
        self.state.open_account(owner, currency, 0)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.state.account(id))
    }

    async fn list_accounts(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Account>> {
        let accounts = self.state.accounts.read();
        Ok(accounts
            .values()
            .filter(|a| a.owner == owner)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_transfers(&self, filter: &TransferFilter) -> Result<Vec<Transfer>> {
        let transfers = self.state.transfers.read();
        let mut matching: Vec<Transfer> = transfers
            .iter()
            .filter(|t| {
                t.from_account_id == filter.account_id || t.to_account_id == filter.account_id
            })
            .filter(|t| filter.created_from.map_or(true, |from| t.created_at >= from))
            .filter(|t| filter.created_until.map_or(true, |until| t.created_at < until))
            .cloned()
            .collect();
        matching.sort_by_key(|t| t.id);

        Ok(matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn list_entries(&self, transfer_id: TransferId) -> Result<Vec<Entry>> {
        let entries = self.state.entries.read();
        Ok(entries
            .iter()
            .filter(|e| e.transfer_id == transfer_id)
            .cloned()
            .collect())
    }
}

struct MemoryLedgerTx {
    state: Arc<LedgerState>,
    rates: Arc<MemoryRateStore>,
    lock_timeout: Duration,
    guards: Vec<OwnedMutexGuard<()>>,
    locked: HashMap<AccountId, Account>,
    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    #[instrument(skip(self))]
    async fn get_account_for_update(&mut self, id: AccountId) -> Result<Option<Account>> {
        if let Some(account) = self.locked.get(&id) {
            return Ok(Some(account.clone()));
        }
        if self.state.account(id).is_none() {
            return Ok(None);
        }

        let row_lock = self.state.row_lock(id);
        let guard = tokio::time::timeout(self.lock_timeout, row_lock.lock_owned())
            .await
            .map_err(|_| BankError::Contention(format!("lock timeout on account {id}")))?;

        // Re-read under the lock; this is the balance the unit of work acts on.
        let account = match self.state.account(id) {
            Some(account) => account,
            None => return Ok(None),
        };
        debug!(account_id = %id, balance = account.balance, "Row locked");

        self.guards.push(guard);
        self.locked.insert(id, account.clone());
        Ok(Some(account))
    }

    async fn get_exchange_rate(&mut self, pair: &CurrencyPair) -> Result<Option<ExchangeRate>> {
        Ok(self.rates.current(pair))
    }

    async fn create_transfer(&mut self, transfer: NewTransfer) -> Result<Transfer> {
        let row = Transfer {
            id: TransferId::new(self.state.next_transfer_id.fetch_add(1, Ordering::SeqCst)),
            from_account_id: transfer.from_account_id,
            to_account_id: transfer.to_account_id,
            amount: transfer.amount,
            source_amount: transfer.source_amount,
            exchange_rate: transfer.exchange_rate,
            created_at: Utc::now(),
        };
        self.transfers.push(row.clone());
        Ok(row)
    }

    async fn create_entry(&mut self, entry: NewEntry) -> Result<Entry> {
        let row = Entry {
            id: EntryId::new(self.state.next_entry_id.fetch_add(1, Ordering::SeqCst)),
            account_id: entry.account_id,
            transfer_id: entry.transfer_id,
            amount: entry.amount,
            created_at: Utc::now(),
        };
        self.entries.push(row.clone());
        Ok(row)
    }

    async fn update_account_balance(&mut self, id: AccountId, balance: i64) -> Result<Account> {
        let account = self.locked.get_mut(&id).ok_or_else(|| {
            BankError::Internal(format!("account {id} updated without holding its row lock"))
        })?;
        if balance < 0 {
            return Err(BankError::Internal(format!(
                "balance check violated for account {id}"
            )));
        }
        account.balance = balance;
        Ok(account.clone())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryLedgerTx {
            state,
            guards,
            locked,
            transfers,
            entries,
            ..
        } = *self;

        let fault = state.commit_faults.lock().pop_front();
        if fault == Some(CommitFault::Contention) {
            return Err(BankError::Contention(
                "could not serialize access due to concurrent update".to_string(),
            ));
        }

        state.apply(locked, transfers, entries);
        drop(guards);

        if fault == Some(CommitFault::LostAcknowledgement) {
            return Err(BankError::Indeterminate(
                "connection lost while awaiting commit acknowledgement".to_string(),
            ));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
