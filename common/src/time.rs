//! Time defaults shared by the token and transfer components.

use chrono::Duration;

/// Default access token lifetime (15 minutes).
pub fn default_access_token_duration() -> Duration {
    Duration::minutes(15)
}

/// Default refresh session lifetime (24 hours).
pub fn default_refresh_token_duration() -> Duration {
    Duration::hours(24)
}

/// Default row-lock wait before a transfer gives up (5 seconds).
pub fn default_lock_timeout() -> std::time::Duration {
    std::time::Duration::from_secs(5)
}

/// Default base delay between contention retries (25 milliseconds).
pub fn default_retry_backoff() -> std::time::Duration {
    std::time::Duration::from_millis(25)
}

/// Default number of retries after contention.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
