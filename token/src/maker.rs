//! Token maker capability.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TokenError};
use crate::jwt::JwtMaker;
use crate::payload::TokenPayload;
use crate::sealed::SealedMaker;

/// Shortest accepted symmetric key, in bytes.
pub const MIN_SYMMETRIC_KEY_LEN: usize = 32;

/// Creates and verifies signed tokens.
pub trait TokenMaker: Send + Sync {
    /// Issue a token for `username` valid for `duration`.
    fn create_token(&self, username: &str, duration: Duration) -> Result<(String, TokenPayload)>;

    /// Check a token and return its claims.
    fn verify_token(&self, token: &str) -> Result<TokenPayload>;
}

/// Token format selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenMakerKind {
    Jwt,
    Sealed,
}

impl FromStr for TokenMakerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jwt" => Ok(TokenMakerKind::Jwt),
            "sealed" | "paseto" => Ok(TokenMakerKind::Sealed),
            other => Err(format!("unknown token maker: {other}")),
        }
    }
}

impl fmt::Display for TokenMakerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenMakerKind::Jwt => write!(f, "jwt"),
            TokenMakerKind::Sealed => write!(f, "sealed"),
        }
    }
}

/// Build the configured maker.
pub fn new_token_maker(kind: TokenMakerKind, symmetric_key: &str) -> Result<Arc<dyn TokenMaker>> {
    Ok(match kind {
        TokenMakerKind::Jwt => Arc::new(JwtMaker::new(symmetric_key)?),
        TokenMakerKind::Sealed => Arc::new(SealedMaker::new(symmetric_key)?),
    })
}

pub(crate) fn check_key_len(symmetric_key: &str) -> Result<()> {
    if symmetric_key.len() < MIN_SYMMETRIC_KEY_LEN {
        return Err(TokenError::InvalidKey(format!(
            "invalid key size: must be at least {MIN_SYMMETRIC_KEY_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_kind_parse() {
        assert_eq!("JWT".parse::<TokenMakerKind>().unwrap(), TokenMakerKind::Jwt);
        assert_eq!("sealed".parse::<TokenMakerKind>().unwrap(), TokenMakerKind::Sealed);
        assert!("rsa".parse::<TokenMakerKind>().is_err());
    }

    #[test]
    fn test_short_key_rejected() {
        for kind in [TokenMakerKind::Jwt, TokenMakerKind::Sealed] {
            assert!(matches!(
                new_token_maker(kind, "short"),
                Err(TokenError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn test_makers_do_not_accept_each_other() {
        let jwt = new_token_maker(TokenMakerKind::Jwt, KEY).unwrap();
        let sealed = new_token_maker(TokenMakerKind::Sealed, KEY).unwrap();

        let (jwt_token, _) = jwt.create_token("alice", Duration::minutes(1)).unwrap();
        let (sealed_token, _) = sealed.create_token("alice", Duration::minutes(1)).unwrap();

        assert_eq!(sealed.verify_token(&jwt_token), Err(TokenError::InvalidSignature));
        assert_eq!(jwt.verify_token(&sealed_token), Err(TokenError::InvalidSignature));
    }

    proptest! {
        #[test]
        fn prop_round_trip(username in "[a-z][a-z0-9_]{0,15}", minutes in 1i64..10_000) {
            for kind in [TokenMakerKind::Jwt, TokenMakerKind::Sealed] {
                let maker = new_token_maker(kind, KEY).unwrap();
                let (token, payload) = maker.create_token(&username, Duration::minutes(minutes)).unwrap();
                let verified = maker.verify_token(&token).unwrap();
                prop_assert_eq!(verified, payload);
            }
        }
    }
}
