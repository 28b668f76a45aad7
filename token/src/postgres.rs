//! Postgres-backed session table.

use async_trait::async_trait;
use bankcore_common::db::classify;
use bankcore_common::{Result, SessionId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::session::{NewSession, Session};
use crate::store::SessionStore;

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    username: String,
    refresh_token: String,
    user_agent: String,
    client_ip: String,
    is_blocked: bool,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: SessionId::from_uuid(row.id),
            username: row.username,
            refresh_token: row.refresh_token,
            user_agent: row.user_agent,
            client_ip: row.client_ip,
            is_blocked: row.is_blocked,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn create_session(&self, session: NewSession) -> Result<Session> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (id, username, refresh_token, user_agent, client_ip, is_blocked, expires_at)
            VALUES ($1, $2, $3, $4, $5, false, $6)
            RETURNING id, username, refresh_token, user_agent, client_ip, is_blocked,
                      expires_at, created_at
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(&session.username)
        .bind(&session.refresh_token)
        .bind(&session.client.user_agent)
        .bind(&session.client.client_ip)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to create session"))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, username, refresh_token, user_agent, client_ip, is_blocked,
                   expires_at, created_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to load session"))?;

        Ok(row.map(Session::from))
    }

    #[instrument(skip(self))]
    async fn set_session_blocked(&self, id: SessionId) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE sessions
            SET is_blocked = true
            WHERE id = $1
            RETURNING id, username, refresh_token, user_agent, client_ip, is_blocked,
                      expires_at, created_at
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "failed to block session"))?;

        Ok(row.map(Session::from))
    }
}
