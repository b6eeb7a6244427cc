//! User repository
//!
//! Users are keyed by their immutable username and never hard-deleted;
//! deactivation flips `disabled`.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::UserLookup;

use super::RepositoryError;

const ENTITY: &str = "user";

/// Public view of a user. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub disabled: bool,
}

/// A user together with the stored password hash.
///
/// The hash is only readable inside this crate, where the auth manager
/// checks it.
#[derive(Clone)]
pub struct UserRecord {
    pub user: User,
    pub(crate) hashed_password: String,
}

impl UserRecord {
    pub fn new(user: User, hashed_password: impl Into<String>) -> Self {
        Self {
            user,
            hashed_password: hashed_password.into(),
        }
    }
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("user", &self.user)
            .field("hashed_password", &"[REDACTED]")
            .finish()
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    hashed_password: String,
    disabled: bool,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            user: User {
                id: row.id,
                username: row.username,
                email: row.email,
                disabled: row.disabled,
            },
            hashed_password: row.hashed_password,
        }
    }
}

/// Repository for user accounts
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a user by username, disabled or not
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, hashed_password, disabled
            FROM "user"
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRecord::from))
    }

    /// Register a new user; a taken username is `Conflict`
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<Uuid, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO "user" (username, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(ENTITY, e))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::from_write(ENTITY, e))?;

        tracing::info!(%id, "User signed up");
        Ok(id)
    }

    /// Replace a user's password hash
    pub async fn set_password(
        &self,
        username: &str,
        hashed_password: &str,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(r#"UPDATE "user" SET hashed_password = $1 WHERE username = $2"#)
            .bind(hashed_password)
            .bind(username)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_write(ENTITY, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(ENTITY));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Soft-delete a user. Already disabled users are `NotFound`.
    pub async fn deactivate(&self, username: &str) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"UPDATE "user" SET disabled = true WHERE username = $1 AND disabled = false"#,
        )
        .bind(username)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(ENTITY, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(ENTITY));
        }

        tx.commit().await?;
        tracing::info!(username, "User deactivated");
        Ok(())
    }
}

#[async_trait]
impl UserLookup for UserRepository {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        UserRepository::find_by_username(self, username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_debug_redacts_hash() {
        let record = UserRecord::new(
            User {
                id: Uuid::new_v4(),
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                disabled: false,
            },
            "$argon2id$v=19$secret",
        );

        let rendered = format!("{:?}", record);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_user_json_has_no_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            disabled: true,
        };

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["username"], "bob");
        assert_eq!(value["disabled"], true);
        assert!(value.get("hashed_password").is_none());
    }
}
