//! Bankcore FX
//!
//! Directional exchange rates between supported currencies, the conversion
//! arithmetic used by cross-currency transfers, and administrator-gated rate
//! management.
//!
//! # Example
//!
//! ```rust,ignore
//! use bankcore_fx::{convert, ExchangeRateService, MemoryRateStore};
//!
//! let store = Arc::new(MemoryRateStore::new());
//! let service = ExchangeRateService::new(store, "admin");
//! let rate = service.create_exchange_rate("admin", "USD", "KES", dec!(130)).await?;
//! let conversion = convert(10, &rate)?;
//! assert_eq!(conversion.converted_amount, 1300);
//! ```

pub mod conversion;
pub mod postgres;
pub mod rate;
pub mod service;
pub mod store;

pub use conversion::{convert, min_source_amount, Conversion};
pub use postgres::PgRateStore;
pub use rate::ExchangeRate;
pub use service::ExchangeRateService;
pub use store::{MemoryRateStore, RateStore};
