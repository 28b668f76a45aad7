//! Persistence collaborator for sessions.

use async_trait::async_trait;
use bankcore_common::{Result, SessionId};

use crate::session::{NewSession, Session};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: NewSession) -> Result<Session>;

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>>;

    /// Set `is_blocked`. Returns `None` when no such session exists.
    async fn set_session_blocked(&self, id: SessionId) -> Result<Option<Session>>;
}
