//! API module
//!
//! HTTP API endpoints and middleware.

pub mod extract;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{AuthError, AuthManager, PasswordHasher, TokenService};
use crate::repository::UserRepository;

pub use routes::create_router;

/// Shared request state: the connection pool and the auth manager
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth: Arc<AuthManager<UserRepository>>,
}

impl AppState {
    pub fn new(pool: PgPool, hasher: PasswordHasher, tokens: TokenService) -> Result<Self, AuthError> {
        let auth = AuthManager::new(UserRepository::new(pool.clone()), hasher, tokens)?;
        Ok(Self {
            pool,
            auth: Arc::new(auth),
        })
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }
}
