//! Common test utilities

#![allow(dead_code)]

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use finance_tracker::auth::{PasswordHasher, TokenService};
use finance_tracker::db;
use finance_tracker::repository::UserRepository;
use finance_tracker::AppState;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Connect to the test database. The schema from `migrations/` must be applied.
///
/// Tests share one database and run concurrently, so every test names its
/// users, categories and merchants with [`unique`] instead of truncating.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    let complete = db::check_schema(&pool)
        .await
        .expect("Failed to inspect schema");
    assert!(complete, "Database schema incomplete, apply migrations/ first");

    pool
}

/// `prefix` plus a random suffix
pub fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Cheap hashing parameters keep the suite fast
pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::with_cost(8, 1, 1).expect("valid argon2 params")
}

pub fn test_state(pool: PgPool) -> AppState {
    AppState::new(pool, test_hasher(), TokenService::new(TEST_SECRET))
        .expect("Failed to build app state")
}

/// Insert a user directly and return its id
pub async fn create_user(pool: &PgPool, username: &str, password: &str) -> Uuid {
    let hash = test_hasher().hash(password).expect("hash");
    UserRepository::new(pool.clone())
        .create(username, &format!("{}@example.com", username), &hash)
        .await
        .expect("Failed to create user")
}
