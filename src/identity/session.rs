use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::clock::Clock;
use super::principal::Owner;
use crate::error::{AppError, AppResult};
use crate::storage::SessionStore;

pub type SessionToken = String;

/// Sessions expire this long after issuance.
pub const DEFAULT_SESSION_TTL: Duration = Duration::hours(1);

/// A persisted session. Created on login, destroyed on logout or when found
/// expired; never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub owner: Owner,
    pub created_at: DateTime<Utc>,
}

fn gen_token() -> AppResult<SessionToken> {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf)
        .map_err(|e| AppError::allocation("token_generation", &e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Issues, resolves and revokes session tokens. The expiry decision belongs to
/// the caller (`is_expired`); `resolve` only answers whether a record exists.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub async fn issue(&self, owner: &Owner) -> AppResult<SessionToken> {
        let session = Session { token: gen_token()?, owner: owner.clone(), created_at: self.clock.now() };
        self.store
            .insert_session(&session)
            .await
            .map_err(|e| AppError::allocation("session_insert", &e.to_string()))?;
        info!(target: "todo::session", owner = %owner, ttl_secs = self.ttl.num_seconds(), "session issued");
        Ok(session.token)
    }

    /// Look up a token. Absent and revoked tokens are both `NotFound`.
    pub async fn resolve(&self, token: &str) -> AppResult<Session> {
        self.store
            .find_session(token)
            .await?
            .ok_or_else(|| AppError::not_found("session_not_found", "session not found"))
    }

    /// Delete the session. Revoking an unknown token is not an error.
    pub async fn revoke(&self, token: &str) -> AppResult<()> {
        let removed = self.store.delete_session(token).await?;
        debug!(target: "todo::session", removed, "session revoke");
        Ok(())
    }

    /// Expired once `ttl` has elapsed since creation, inclusive.
    pub fn is_expired_at(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.created_at >= self.ttl
    }

    pub fn is_expired(&self, session: &Session) -> bool {
        self.is_expired_at(session, self.clock.now())
    }
}
