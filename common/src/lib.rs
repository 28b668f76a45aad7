//! Bankcore Common Types
//!
//! Shared types used across the bankcore crates: identifiers, currency
//! codes, the error taxonomy surfaced to the API layer, and the
//! classification of Postgres failures into that taxonomy.

pub mod db;
pub mod error;
pub mod identifiers;
pub mod monetary;
pub mod time;

pub use error::*;
pub use identifiers::*;
pub use monetary::*;
