//! Error types for bankcore operations.

use serde::Serialize;
use thiserror::Error;

use crate::{AccountId, Currency, CurrencyPair, ExchangeRateId};

/// Externally visible error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input. Caller's fault, never retried.
    Validation,
    /// Account, rate or session absent.
    NotFound,
    /// Request is well formed but conflicts with current state.
    Conflict,
    /// Any token, session or ownership failure.
    Unauthorized,
    /// Lock or serialization conflict before commit. Safe to retry.
    Contention,
    /// A commit was attempted and its outcome is unknown.
    Indeterminate,
    /// Storage or infrastructure failure.
    Internal,
}

/// Root cause of an authentication failure.
///
/// Kept for logging and tests; callers only ever see `"unauthorized"`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("authorization credential missing or malformed")]
    MissingCredential,

    #[error("invalid token signature or algorithm")]
    InvalidSignature,

    #[error("invalid token claims")]
    InvalidClaims,

    #[error("token has expired")]
    TokenExpired,

    #[error("session not found")]
    SessionNotFound,

    #[error("session is blocked")]
    SessionBlocked,

    #[error("refresh token belongs to another user")]
    SessionUserMismatch,

    #[error("refresh token does not match its session")]
    TokenMismatch,

    #[error("session has expired")]
    SessionExpired,

    #[error("account does not belong to the authenticated user")]
    NotOwner,

    #[error("operation is reserved for the administrator")]
    NotAdministrator,
}

/// Main error type for bankcore operations.
#[derive(Error, Debug)]
pub enum BankError {
    /// Invalid input.
    #[error("Invalid input: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Account does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// No rate for the directional pair.
    #[error("Exchange rate not found for {0}")]
    ExchangeRateNotFound(CurrencyPair),

    /// No rate row with this id.
    #[error("Exchange rate not found: {0}")]
    ExchangeRateIdNotFound(ExchangeRateId),

    /// Source and destination are the same account.
    #[error("From account {0} cannot be equal to to account")]
    SameAccount(AccountId),

    /// Source balance cannot cover the debit.
    #[error("Insufficient funds in account {account}: required {required}, available {available}")]
    InsufficientFunds {
        account: AccountId,
        required: i64,
        available: i64,
    },

    /// Caller-stated currency differs from the account's currency.
    #[error("Account {account} currency mismatch, expecting {expected} instead of {actual}")]
    CurrencyMismatch {
        account: AccountId,
        expected: Currency,
        actual: Currency,
    },

    /// Conversion truncates the credited amount to zero.
    #[error(
        "Amount to transfer is less than 1 {target_currency}, please increase amount to {min_amount} {source_currency} or more"
    )]
    AmountTooSmall {
        min_amount: i64,
        source_currency: Currency,
        target_currency: Currency,
    },

    /// Unique constraint hit (duplicate account, duplicate rate pair).
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// Authentication or authorization failure.
    #[error("Unauthorized: {0}")]
    Unauthorized(AuthFailure),

    /// Row lock timeout or serialization failure.
    #[error("Contention: {0}")]
    Contention(String),

    /// Commit outcome unknown; requires reconciliation.
    #[error("Indeterminate outcome: {0}")]
    Indeterminate(String),

    /// Storage or infrastructure failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BankError {
    /// Shorthand for a validation error on a named field.
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        BankError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Get the external error class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BankError::Validation { .. } => ErrorKind::Validation,
            BankError::AccountNotFound(_)
            | BankError::ExchangeRateNotFound(_)
            | BankError::ExchangeRateIdNotFound(_) => ErrorKind::NotFound,
            BankError::SameAccount(_)
            | BankError::InsufficientFunds { .. }
            | BankError::CurrencyMismatch { .. }
            | BankError::AmountTooSmall { .. }
            | BankError::Duplicate(_) => ErrorKind::Conflict,
            BankError::Unauthorized(_) => ErrorKind::Unauthorized,
            BankError::Contention(_) => ErrorKind::Contention,
            BankError::Indeterminate(_) => ErrorKind::Indeterminate,
            BankError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error is retryable. Only pre-commit contention is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BankError::Contention(_))
    }

    /// Get the authentication root cause, if any.
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            BankError::Unauthorized(failure) => Some(*failure),
            _ => None,
        }
    }

    /// Get error code for logs and API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            BankError::Validation { .. } => "VALIDATION_ERROR",
            BankError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            BankError::ExchangeRateNotFound(_) | BankError::ExchangeRateIdNotFound(_) => {
                "EXCHANGE_RATE_NOT_FOUND"
            }
            BankError::SameAccount(_) => "SAME_ACCOUNT",
            BankError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            BankError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            BankError::AmountTooSmall { .. } => "AMOUNT_TOO_SMALL",
            BankError::Duplicate(_) => "DUPLICATE",
            BankError::Unauthorized(_) => "UNAUTHORIZED",
            BankError::Contention(_) => "CONTENTION",
            BankError::Indeterminate(_) => "INDETERMINATE",
            BankError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Single-field message safe to show to the caller.
    ///
    /// Authentication failures collapse to one message so the response does
    /// not reveal which check failed.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Unauthorized => "unauthorized".to_string(),
            ErrorKind::Internal | ErrorKind::Indeterminate => {
                "internal error, please contact support".to_string()
            }
            ErrorKind::Contention => "the service is busy, please retry".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<AuthFailure> for BankError {
    fn from(failure: AuthFailure) -> Self {
        BankError::Unauthorized(failure)
    }
}

/// Result type alias for bankcore operations.
pub type Result<T> = std::result::Result<T, BankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            BankError::validation("bad", "amount").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            BankError::AccountNotFound(AccountId::new(1)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            BankError::SameAccount(AccountId::new(1)).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            BankError::from(AuthFailure::SessionBlocked).kind(),
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_only_contention_is_retryable() {
        assert!(BankError::Contention("lock timeout".into()).is_retryable());
        assert!(!BankError::Indeterminate("commit".into()).is_retryable());
        assert!(!BankError::Internal("db".into()).is_retryable());
    }

    #[test]
    fn test_unauthorized_messages_are_uniform() {
        let blocked = BankError::from(AuthFailure::SessionBlocked);
        let forged = BankError::from(AuthFailure::TokenMismatch);
        assert_eq!(blocked.public_message(), forged.public_message());
        assert_eq!(blocked.auth_failure(), Some(AuthFailure::SessionBlocked));
    }

    #[test]
    fn test_amount_too_small_message_names_minimum() {
        let err = BankError::AmountTooSmall {
            min_amount: 131,
            source_currency: Currency::kes(),
            target_currency: Currency::usd(),
        };
        assert!(err.public_message().contains("131 KES"));
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = BankError::Internal("connection reset by peer".into());
        assert!(!err.public_message().contains("peer"));
    }
}
