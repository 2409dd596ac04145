use std::sync::Arc;

use tracing::info;

use super::principal::Owner;
use super::session::{SessionManager, SessionToken};
use crate::error::{AppError, AppResult};
use crate::security;
use crate::storage::{IdentityStore, StoreError};

/// Registration, login and logout. Talks to the identity store and the session
/// manager directly; never goes through the access gate.
pub struct AuthProvider {
    identities: Arc<dyn IdentityStore>,
    sessions: Arc<SessionManager>,
}

fn require_credentials(username: &str, password: &str) -> AppResult<()> {
    if username.is_empty() || password.is_empty() {
        return Err(AppError::invalid("invalid_credentials", "Invalid username or password"));
    }
    Ok(())
}

impl AuthProvider {
    pub fn new(identities: Arc<dyn IdentityStore>, sessions: Arc<SessionManager>) -> Self {
        Self { identities, sessions }
    }

    pub fn sessions(&self) -> &SessionManager { &self.sessions }

    pub async fn register(&self, username: &str, password: &str) -> AppResult<()> {
        require_credentials(username, password)?;
        let password = password.to_string();
        // Argon2 is CPU bound; keep it off the request executor threads
        let phc = tokio::task::spawn_blocking(move || security::hash_password(&password))
            .await
            .map_err(|e| AppError::internal("hash_task", e.to_string()))??;
        match self.identities.insert_identity(username, &phc).await {
            Ok(()) => {
                info!(target: "todo::auth", username, "user registered");
                Ok(())
            }
            Err(StoreError::Conflict(_)) => Err(AppError::conflict("user_exists", "user already exists")),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials and open a session. Unknown user and wrong password
    /// are the same `NotFound`.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<SessionToken> {
        require_credentials(username, password)?;
        let stored = self.identities.password_hash(username).await?;
        let Some(phc) = stored else {
            return Err(AppError::not_found("user_not_found", "User not found"));
        };
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || security::verify_password(&phc, &password))
            .await
            .map_err(|e| AppError::internal("hash_task", e.to_string()))?;
        if !verified {
            return Err(AppError::not_found("user_not_found", "User not found"));
        }
        self.sessions.issue(&Owner::from(username)).await
    }

    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.sessions.revoke(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{SystemClock, DEFAULT_SESSION_TTL};
    use crate::storage::MemoryStore;

    fn provider() -> (AuthProvider, MemoryStore) {
        let store = MemoryStore::new();
        let sessions = Arc::new(SessionManager::new(Arc::new(store.clone()), Arc::new(SystemClock), DEFAULT_SESSION_TTL));
        (AuthProvider::new(Arc::new(store.clone()), sessions), store)
    }

    #[tokio::test]
    async fn register_then_login_issues_a_session_for_the_user() {
        let (auth, store) = provider();
        auth.register("alice", "pw").await.unwrap();
        let stored = store.password_hash("alice").await.unwrap().unwrap();
        assert_ne!(stored, "pw");

        let token = auth.login("alice", "pw").await.unwrap();
        let session = auth.sessions().resolve(&token).await.unwrap();
        assert_eq!(session.owner, Owner::from("alice"));
    }

    #[tokio::test]
    async fn duplicate_registration_is_conflict() {
        let (auth, _store) = provider();
        auth.register("alice", "pw").await.unwrap();
        let err = auth.register("alice", "other").await.unwrap_err();
        assert_eq!(err.http_status(), 409);
    }

    #[tokio::test]
    async fn empty_fields_are_rejected_before_the_store() {
        let (auth, store) = provider();
        assert_eq!(auth.register("", "pw").await.unwrap_err().http_status(), 400);
        assert_eq!(auth.register("alice", "").await.unwrap_err().http_status(), 400);
        assert_eq!(auth.login("", "").await.unwrap_err().http_status(), 400);
        assert_eq!(store.password_hash("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let (auth, store) = provider();
        auth.register("alice", "pw").await.unwrap();
        let wrong = auth.login("alice", "nope").await.unwrap_err();
        let unknown = auth.login("mallory", "pw").await.unwrap_err();
        assert_eq!(wrong, unknown);
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let (auth, store) = provider();
        auth.register("alice", "pw").await.unwrap();
        let token = auth.login("alice", "pw").await.unwrap();
        auth.logout(&token).await.unwrap();
        auth.logout(&token).await.unwrap();
        auth.logout("never-issued").await.unwrap();
        assert_eq!(store.session_count(), 0);
    }
}
