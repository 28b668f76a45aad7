//! In-process session store.

use async_trait::async_trait;
use bankcore_common::{BankError, Result, SessionId};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::session::{NewSession, Session};
use crate::store::SessionStore;

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: NewSession) -> Result<Session> {
        match self.sessions.entry(session.id) {
            Entry::Occupied(_) => Err(BankError::Duplicate(format!("session {}", session.id))),
            Entry::Vacant(slot) => {
                let row = Session {
                    id: session.id,
                    username: session.username,
                    refresh_token: session.refresh_token,
                    user_agent: session.client.user_agent,
                    client_ip: session.client.client_ip,
                    is_blocked: false,
                    expires_at: session.expires_at,
                    created_at: Utc::now(),
                };
                slot.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn set_session_blocked(&self, id: SessionId) -> Result<Option<Session>> {
        Ok(self.sessions.get_mut(&id).map(|mut s| {
            s.is_blocked = true;
            s.clone()
        }))
    }
}
