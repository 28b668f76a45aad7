//! Bankcore Ledger
//!
//! Accounts, the append-only transfer/entry ledger, and the engine that
//! moves money between two accounts as one atomic unit of work.

pub mod account;
pub mod config;
pub mod engine;
pub mod journal;
pub mod lock_order;
pub mod memory;
pub mod postgres;
pub mod service;
pub mod statement;
pub mod store;

pub use account::Account;
pub use config::TransferConfig;
pub use engine::{TransferEngine, TransferRequest, TransferResult};
pub use journal::{Entry, Transfer};
pub use lock_order::ordered_pair;
pub use memory::{CommitFault, MemoryLedgerStore};
pub use postgres::PgLedgerStore;
pub use service::AccountService;
pub use statement::{Page, StatementLine, StatementRequest};
pub use store::{LedgerStore, LedgerTx, NewEntry, NewTransfer, TransferFilter};
