//! Token claims.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TokenError};

/// Claims carried by every token. Rebuilt from the token on each
/// verification; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Random token id. For refresh tokens this is also the session id.
    pub id: Uuid,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenPayload {
    pub fn new(username: &str, duration: Duration) -> Result<Self> {
        if username.is_empty() {
            return Err(TokenError::InvalidClaims("username is empty".to_string()));
        }

        let issued_at = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(duration)
            .ok_or_else(|| TokenError::InvalidClaims("duration out of range".to_string()))?;

        Ok(Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            issued_at,
            expires_at,
        })
    }

    /// Check the claims against the clock.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.username.is_empty() {
            return Err(TokenError::InvalidClaims("username is empty".to_string()));
        }
        if now > self.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_payload() {
        let payload = TokenPayload::new("alice", Duration::minutes(1)).unwrap();
        assert_eq!(payload.username, "alice");
        assert_eq!(payload.expires_at - payload.issued_at, Duration::minutes(1));
        assert!(payload.validate(Utc::now()).is_ok());
    }

    #[test]
    fn test_expired_payload() {
        let payload = TokenPayload::new("alice", -Duration::minutes(1)).unwrap();
        assert_eq!(payload.validate(Utc::now()), Err(TokenError::Expired));
    }

    #[test]
    fn test_empty_username() {
        assert!(TokenPayload::new("", Duration::minutes(1)).is_err());
    }
}
