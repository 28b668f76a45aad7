//! Session/token authority.
//!
//! Issues access tokens and refresh sessions, verifies bearer credentials
//! and renews access tokens from a refresh token. Every authentication
//! failure surfaces as `BankError::Unauthorized` carrying the root cause;
//! callers show only the uniform public message.

use std::sync::Arc;

use bankcore_common::{AuthFailure, BankError, Result, SessionId};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::maker::TokenMaker;
use crate::payload::TokenPayload;
use crate::session::{ClientMeta, NewSession, Session, SessionState};
use crate::store::SessionStore;

const BEARER: &str = "bearer";

/// A freshly issued refresh token and the session backing it.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedRefresh {
    pub refresh_token: String,
    pub session_id: SessionId,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionAuthority {
    maker: Arc<dyn TokenMaker>,
    sessions: Arc<dyn SessionStore>,
    access_token_duration: Duration,
}

impl SessionAuthority {
    /// `access_token_duration` is the lifetime of tokens minted by renewal.
    pub fn new(
        maker: Arc<dyn TokenMaker>,
        sessions: Arc<dyn SessionStore>,
        access_token_duration: Duration,
    ) -> Self {
        Self {
            maker,
            sessions,
            access_token_duration,
        }
    }

    #[instrument(skip(self))]
    pub fn issue_access_token(
        &self,
        username: &str,
        duration: Duration,
    ) -> Result<(String, TokenPayload)> {
        Ok(self.maker.create_token(username, duration)?)
    }

    /// Issue a refresh token and persist the session that backs it.
    #[instrument(skip(self, client))]
    pub async fn issue_refresh_session(
        &self,
        username: &str,
        duration: Duration,
        client: ClientMeta,
    ) -> Result<IssuedRefresh> {
        let (refresh_token, payload) = self.maker.create_token(username, duration)?;

        let session = self
            .sessions
            .create_session(NewSession {
                id: SessionId::from_uuid(payload.id),
                username: payload.username,
                refresh_token: refresh_token.clone(),
                client,
                expires_at: payload.expires_at,
            })
            .await?;

        info!(session_id = %session.id, expires_at = %session.expires_at, "Refresh session issued");
        Ok(IssuedRefresh {
            refresh_token,
            session_id: session.id,
            expires_at: session.expires_at,
        })
    }

    #[instrument(skip(self, token))]
    pub fn verify_access_token(&self, token: &str) -> Result<TokenPayload> {
        self.maker.verify_token(token).map_err(|err| {
            warn!(error = %err, "Access token rejected");
            BankError::from(err)
        })
    }

    /// Verify an `Authorization` header value of the form `Bearer <token>`.
    pub fn authorize(&self, header: Option<&str>) -> Result<TokenPayload> {
        let token = bearer_token(header).ok_or_else(|| {
            warn!("Authorization header missing or malformed");
            BankError::from(AuthFailure::MissingCredential)
        })?;
        self.verify_access_token(token)
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The refresh token and its session are left unchanged.
    #[instrument(skip(self, refresh_token))]
    pub async fn renew_access_token(&self, refresh_token: &str) -> Result<(String, TokenPayload)> {
        let payload = self.maker.verify_token(refresh_token).map_err(|err| {
            warn!(error = %err, "Refresh token rejected");
            BankError::from(err)
        })?;

        let session_id = SessionId::from_uuid(payload.id);
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| refused(session_id, AuthFailure::SessionNotFound))?;

        if session.is_blocked {
            return Err(refused(session_id, AuthFailure::SessionBlocked));
        }
        if session.username != payload.username {
            return Err(refused(session_id, AuthFailure::SessionUserMismatch));
        }
        if session.refresh_token != refresh_token {
            return Err(refused(session_id, AuthFailure::TokenMismatch));
        }
        if Utc::now() > session.expires_at {
            return Err(refused(session_id, AuthFailure::SessionExpired));
        }

        let renewed = self
            .maker
            .create_token(&session.username, self.access_token_duration)?;
        info!(session_id = %session_id, "Access token renewed");
        Ok(renewed)
    }

    /// Block a session held by `username`.
    ///
    /// Blocking twice is a no-op, and an expired session is returned
    /// without being rewritten.
    #[instrument(skip(self))]
    pub async fn revoke_session(&self, username: &str, session_id: SessionId) -> Result<Session> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| refused(session_id, AuthFailure::SessionNotFound))?;
        if session.username != username {
            return Err(refused(session_id, AuthFailure::SessionUserMismatch));
        }

        match session.state_at(Utc::now()) {
            SessionState::Blocked | SessionState::Expired => Ok(session),
            SessionState::Active => {
                let blocked = self
                    .sessions
                    .set_session_blocked(session_id)
                    .await?
                    .ok_or_else(|| refused(session_id, AuthFailure::SessionNotFound))?;
                info!(session_id = %session_id, "Session revoked");
                Ok(blocked)
            }
        }
    }
}

fn refused(session_id: SessionId, failure: AuthFailure) -> BankError {
    warn!(session_id = %session_id, reason = %failure, "Session refused");
    BankError::Unauthorized(failure)
}

fn bearer_token(header: Option<&str>) -> Option<&str> {
    let mut fields = header?.split_whitespace();
    let scheme = fields.next()?;
    let token = fields.next()?;
    if fields.next().is_some() || !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }
    Some(token)
}
