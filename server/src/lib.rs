//! Bankcore Server
//!
//! Wires the ledger, exchange-rate table and session authority into one
//! facade that an API layer calls with an authenticated caller.

pub mod bank;
pub mod config;
pub mod response;
pub mod state;

pub use bank::{Bank, LoginSession};
pub use config::{BankConfig, TokenConfig};
pub use response::ErrorResponse;
pub use state::BankState;
