//! Bankcore Tokens
//!
//! Signed, time-bound access tokens and the refresh sessions that back
//! them. Two token formats are available behind [`TokenMaker`]: an HS256
//! JWT and an AES-256-GCM sealed token. The signing key is supplied at
//! construction and never stored globally.

pub mod authority;
pub mod error;
pub mod jwt;
pub mod maker;
pub mod memory;
pub mod payload;
pub mod postgres;
pub mod sealed;
pub mod session;
pub mod store;

pub use authority::{IssuedRefresh, SessionAuthority};
pub use error::TokenError;
pub use jwt::JwtMaker;
pub use maker::{new_token_maker, TokenMaker, TokenMakerKind, MIN_SYMMETRIC_KEY_LEN};
pub use memory::MemorySessionStore;
pub use payload::TokenPayload;
pub use postgres::PgSessionStore;
pub use sealed::SealedMaker;
pub use session::{ClientMeta, NewSession, Session, SessionState};
pub use store::SessionStore;
