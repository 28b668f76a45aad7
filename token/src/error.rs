//! Token errors.

use bankcore_common::{AuthFailure, BankError};
use thiserror::Error;

/// Errors from creating or verifying a token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Bad MAC, unexpected algorithm or a token that is not one of ours.
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),

    #[error("token has expired")]
    Expired,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

impl From<TokenError> for BankError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature => BankError::Unauthorized(AuthFailure::InvalidSignature),
            TokenError::InvalidClaims(_) => BankError::Unauthorized(AuthFailure::InvalidClaims),
            TokenError::Expired => BankError::Unauthorized(AuthFailure::TokenExpired),
            TokenError::InvalidKey(msg) | TokenError::Encoding(msg) => BankError::Internal(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, TokenError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bankcore_common::ErrorKind;

    #[test]
    fn test_verification_failures_are_unauthorized() {
        for err in [
            TokenError::InvalidSignature,
            TokenError::InvalidClaims("username".into()),
            TokenError::Expired,
        ] {
            let bank: BankError = err.into();
            assert_eq!(bank.kind(), ErrorKind::Unauthorized);
            assert_eq!(bank.public_message(), "unauthorized");
        }
    }

    #[test]
    fn test_expired_keeps_root_cause() {
        let bank: BankError = TokenError::Expired.into();
        assert_eq!(bank.auth_failure(), Some(AuthFailure::TokenExpired));
    }
}
