//! Auth Manager
//!
//! Credential checks and token resolution on top of a user lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::repository::{RepositoryError, User, UserRecord};

use super::password::{PasswordError, PasswordHasher};
use super::token::{TokenError, TokenService};

/// Source of user records by username
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_username(&self, username: &str)
        -> Result<Option<UserRecord>, RepositoryError>;
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Bad credentials, bad or expired token, or unknown/disabled user
    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A blocking hash task panicked or was cancelled
    #[error("Password task failed: {0}")]
    Task(String),
}

/// Authenticates credentials and resolves tokens to active users
pub struct AuthManager<L> {
    lookup: L,
    hasher: PasswordHasher,
    tokens: TokenService,
    /// Verified against when the username is unknown, so that path costs
    /// the same as a wrong password.
    decoy_hash: String,
}

impl<L: UserLookup> AuthManager<L> {
    pub fn new(lookup: L, hasher: PasswordHasher, tokens: TokenService) -> Result<Self, AuthError> {
        let decoy_hash = hasher.hash("decoy-password-for-unknown-users")?;
        Ok(Self {
            lookup,
            hasher,
            tokens,
            decoy_hash,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Hash a new password on the blocking pool
    pub async fn hash_password(&self, plaintext: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_owned();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Task(e.to_string()))??;
        Ok(hash)
    }

    /// Argon2 verification is CPU bound; keep it off the async workers.
    async fn verify_password(&self, plaintext: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_owned();
        let stored_hash = stored_hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &stored_hash))
            .await
            .map_err(|e| AuthError::Task(e.to_string()))
    }

    /// Check a username/password pair.
    ///
    /// Unknown user, disabled user and wrong password all return `None`,
    /// and each path performs one hash verification.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let record = self.lookup.find_by_username(username).await?;

        let Some(record) = record else {
            self.verify_password(password, &self.decoy_hash).await?;
            return Ok(None);
        };

        let password_ok = self
            .verify_password(password, &record.hashed_password)
            .await?;
        if !password_ok || record.user.disabled {
            return Ok(None);
        }

        Ok(Some(record.user))
    }

    /// Authenticate and issue an access token
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let user = self
            .authenticate(username, password)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let token = self.tokens.issue(&user.username, now)?;
        tracing::info!(user_id = %user.id, "Issued access token");
        Ok(token)
    }

    /// Resolve a bearer token to a user that still exists and is active
    pub async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<User, AuthError> {
        let subject = self.tokens.verify(token, now).map_err(|e| {
            tracing::debug!(reason = %e, "Token rejected");
            AuthError::Unauthenticated
        })?;

        match self.lookup.find_by_username(&subject).await? {
            Some(record) if !record.user.disabled => Ok(record.user),
            _ => {
                tracing::debug!("Token subject is missing or disabled");
                Err(AuthError::Unauthenticated)
            }
        }
    }
}

impl<L> std::fmt::Debug for AuthManager<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct MemoryUsers {
        users: Mutex<HashMap<String, UserRecord>>,
    }

    impl MemoryUsers {
        fn insert(&self, username: &str, hash: String, disabled: bool) {
            let user = User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: format!("{}@example.com", username),
                disabled,
            };
            self.users
                .lock()
                .unwrap()
                .insert(username.to_string(), UserRecord::new(user, hash));
        }

        fn disable(&self, username: &str) {
            if let Some(record) = self.users.lock().unwrap().get_mut(username) {
                record.user.disabled = true;
            }
        }

        fn remove(&self, username: &str) {
            self.users.lock().unwrap().remove(username);
        }
    }

    #[async_trait]
    impl UserLookup for std::sync::Arc<MemoryUsers> {
        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserRecord>, RepositoryError> {
            Ok(self.users.lock().unwrap().get(username).cloned())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn setup() -> (std::sync::Arc<MemoryUsers>, AuthManager<std::sync::Arc<MemoryUsers>>) {
        let hasher = PasswordHasher::with_cost(8, 1, 1).unwrap();
        let users = std::sync::Arc::new(MemoryUsers::default());
        users.insert("alice", hasher.hash("wonderland").unwrap(), false);
        users.insert("mallory", hasher.hash("letmein").unwrap(), true);

        let manager =
            AuthManager::new(users.clone(), hasher, TokenService::new("unit-test-secret")).unwrap();
        (users, manager)
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let (_, manager) = setup();
        let user = manager.authenticate("alice", "wonderland").await.unwrap();
        assert_eq!(user.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinguishable() {
        let (_, manager) = setup();

        assert!(manager.authenticate("alice", "wrong").await.unwrap().is_none());
        assert!(manager.authenticate("nobody", "wonderland").await.unwrap().is_none());
        assert!(manager.authenticate("mallory", "letmein").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_and_resolve() {
        let (_, manager) = setup();
        let token = manager.login("alice", "wonderland", now()).await.unwrap();

        let user = manager.resolve(&token, now()).await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let (_, manager) = setup();
        let err = manager.login("alice", "nope", now()).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_resolve_expired_token() {
        let (_, manager) = setup();
        let token = manager.login("alice", "wonderland", now()).await.unwrap();

        let later = now() + chrono::Duration::minutes(31);
        assert!(matches!(
            manager.resolve(&token, later).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_resolve_garbage_token() {
        let (_, manager) = setup();
        assert!(matches!(
            manager.resolve("garbage", now()).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_stale_token_after_deactivation() {
        let (users, manager) = setup();
        let token = manager.login("alice", "wonderland", now()).await.unwrap();

        users.disable("alice");
        assert!(matches!(
            manager.resolve(&token, now()).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_hash_password_verifies() {
        let (_, manager) = setup();
        let hash = manager.hash_password("new-secret").await.unwrap();

        assert!(manager.verify_password("new-secret", &hash).await.unwrap());
        assert!(!manager.verify_password("old-secret", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_token_for_removed_user() {
        let (users, manager) = setup();
        let token = manager.login("alice", "wonderland", now()).await.unwrap();

        users.remove("alice");
        assert!(matches!(
            manager.resolve(&token, now()).await,
            Err(AuthError::Unauthenticated)
        ));
    }
}
