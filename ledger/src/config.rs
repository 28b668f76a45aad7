//! Transfer engine configuration.

use std::time::Duration;

use bankcore_common::time::{default_lock_timeout, default_retry_backoff, DEFAULT_MAX_RETRIES};

/// Retry and lock-wait policy for transfers.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Retries after a contention failure. Zero disables retrying.
    pub max_retries: u32,
    /// Base delay before the first retry; doubles on each further retry.
    pub retry_backoff: Duration,
    /// How long a unit of work waits for a row lock.
    pub lock_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: default_retry_backoff(),
            lock_timeout: default_lock_timeout(),
        }
    }
}

impl TransferConfig {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(10);
        self.retry_backoff.saturating_mul(factor)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_timeout.is_zero() {
            return Err("Lock timeout cannot be 0".to_string());
        }
        Ok(())
    }
}
