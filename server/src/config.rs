//! Service configuration.

use std::time::Duration as StdDuration;

use bankcore_common::time::{default_access_token_duration, default_refresh_token_duration};
use bankcore_ledger::TransferConfig;
use bankcore_token::{TokenMakerKind, MIN_SYMMETRIC_KEY_LEN};
use chrono::Duration;

/// Token signing and lifetimes.
#[derive(Clone)]
pub struct TokenConfig {
    /// Symmetric key handed to the token maker. Never logged.
    pub symmetric_key: String,
    pub maker: TokenMakerKind,
    pub access_token_duration: Duration,
    pub refresh_token_duration: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            symmetric_key: String::new(),
            maker: TokenMakerKind::Jwt,
            access_token_duration: default_access_token_duration(),
            refresh_token_duration: default_refresh_token_duration(),
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("symmetric_key", &"<redacted>")
            .field("maker", &self.maker)
            .field("access_token_duration", &self.access_token_duration)
            .field("refresh_token_duration", &self.refresh_token_duration)
            .finish()
    }
}

/// Main service configuration.
#[derive(Debug, Clone)]
pub struct BankConfig {
    /// Database URL.
    pub database_url: String,
    /// Connection pool size.
    pub max_connections: u32,
    /// Identity allowed to write exchange rates.
    pub admin_username: String,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    pub token: TokenConfig,
    pub transfer: TransferConfig,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/bankcore".to_string(),
            max_connections: 10,
            admin_username: "admin".to_string(),
            log_level: "info".to_string(),
            token: TokenConfig::default(),
            transfer: TransferConfig::default(),
        }
    }
}

impl BankConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(max) = env_parse("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = max;
        }

        if let Ok(admin) = std::env::var("ADMIN_USERNAME") {
            config.admin_username = admin;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Ok(key) = std::env::var("TOKEN_SYMMETRIC_KEY") {
            config.token.symmetric_key = key;
        }

        if let Some(maker) = env_parse("TOKEN_MAKER") {
            config.token.maker = maker;
        }

        if let Some(secs) = env_parse("ACCESS_TOKEN_DURATION_SECS") {
            config.token.access_token_duration = Duration::seconds(secs);
        }

        if let Some(secs) = env_parse("REFRESH_TOKEN_DURATION_SECS") {
            config.token.refresh_token_duration = Duration::seconds(secs);
        }

        if let Some(retries) = env_parse("TRANSFER_MAX_RETRIES") {
            config.transfer.max_retries = retries;
        }

        if let Some(ms) = env_parse("TRANSFER_RETRY_BACKOFF_MS") {
            config.transfer.retry_backoff = StdDuration::from_millis(ms);
        }

        if let Some(ms) = env_parse("LOCK_TIMEOUT_MS") {
            config.transfer.lock_timeout = StdDuration::from_millis(ms);
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }

        if self.max_connections == 0 {
            return Err("Max connections cannot be 0".to_string());
        }

        if self.admin_username.is_empty() {
            return Err("Admin username cannot be empty".to_string());
        }

        if self.token.symmetric_key.len() < MIN_SYMMETRIC_KEY_LEN {
            return Err(format!(
                "Token symmetric key must be at least {MIN_SYMMETRIC_KEY_LEN} characters"
            ));
        }

        if self.token.access_token_duration <= Duration::zero() {
            return Err("Access token duration must be positive".to_string());
        }

        if self.token.refresh_token_duration < self.token.access_token_duration {
            return Err("Refresh token duration cannot be shorter than access token duration".to_string());
        }

        self.transfer.validate()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BankConfig {
        let mut config = BankConfig::default();
        config.token.symmetric_key = "0123456789abcdef0123456789abcdef".to_string();
        config
    }

    #[test]
    fn test_default_config_needs_key() {
        assert!(BankConfig::default().validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_invalid_durations() {
        let mut config = valid();
        config.token.refresh_token_duration = Duration::minutes(1);
        assert!(config.validate().is_err());

        let mut config = valid();
        config.token.access_token_duration = Duration::zero();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_lock_timeout_invalid() {
        let mut config = valid();
        config.transfer.lock_timeout = StdDuration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_key_is_redacted() {
        let debug = format!("{:?}", valid());
        assert!(!debug.contains("0123456789abcdef"));
    }
}
