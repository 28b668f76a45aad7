//! Classification of Postgres failures into the bankcore taxonomy.

use crate::error::BankError;

/// serialization_failure
pub const SERIALIZATION_FAILURE: &str = "40001";
/// deadlock_detected
pub const DEADLOCK_DETECTED: &str = "40P01";
/// lock_not_available (raised when `lock_timeout` elapses)
pub const LOCK_NOT_AVAILABLE: &str = "55P03";
/// unique_violation
pub const UNIQUE_VIOLATION: &str = "23505";
/// check_violation
pub const CHECK_VIOLATION: &str = "23514";

/// Classify an error raised by a statement inside a unit of work.
///
/// Nothing has been committed when a statement fails, so contention codes
/// map to the retryable class.
pub fn classify(err: sqlx::Error, context: &str) -> BankError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) | Some(LOCK_NOT_AVAILABLE) => {
                BankError::Contention(format!("{context}: {}", db_err.message()))
            }
            Some(UNIQUE_VIOLATION) => BankError::Duplicate(format!(
                "{context}: {}",
                db_err.constraint().unwrap_or("unique constraint")
            )),
            _ => BankError::Internal(format!("{context}: {err}")),
        },
        sqlx::Error::PoolTimedOut => BankError::Contention(format!("{context}: pool timed out")),
        _ => BankError::Internal(format!("{context}: {err}")),
    }
}

/// Classify an error returned by `COMMIT`.
///
/// Postgres reports serialization failures at commit after rolling back, so
/// those stay retryable. A transport failure leaves the outcome unknown.
pub fn classify_commit(err: sqlx::Error, context: &str) -> BankError {
    match &err {
        sqlx::Error::Database(_) => classify(err, context),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            BankError::Indeterminate(format!("{context}: commit outcome unknown: {err}"))
        }
        _ => BankError::Internal(format!("{context}: {err}")),
    }
}
