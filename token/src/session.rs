//! Refresh sessions.

use bankcore_common::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client details recorded with a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMeta {
    pub user_agent: String,
    pub client_ip: String,
}

/// Persisted record backing one refresh token.
///
/// Only `is_blocked` ever changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Id of the refresh token this session backs.
    pub id: SessionId,
    pub username: String,
    /// The refresh token exactly as issued.
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub user_agent: String,
    pub client_ip: String,
    pub is_blocked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a session.
///
/// `Expired` and `Blocked` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Expired,
    Blocked,
}

impl Session {
    /// State of the session at `now`.
    ///
    /// Expired sessions are never blocked, so a blocked flag always
    /// records a revocation that happened while the session was active.
    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if self.is_blocked {
            SessionState::Blocked
        } else if now > self.expires_at {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }
}

/// Session row to insert.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: SessionId,
    pub username: String,
    pub refresh_token: String,
    pub client: ClientMeta,
    pub expires_at: DateTime<Utc>,
}
