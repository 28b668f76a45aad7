//! Error shaping for the API layer.

use bankcore_common::{BankError, ErrorKind};
use serde::Serialize;
use tracing::error;

/// The single-field body returned for any failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&BankError> for ErrorResponse {
    fn from(err: &BankError) -> Self {
        if matches!(err.kind(), ErrorKind::Internal | ErrorKind::Indeterminate) {
            error!(code = err.error_code(), error = %err, "Request failed");
        }
        Self {
            error: err.public_message(),
        }
    }
}
