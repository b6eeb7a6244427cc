//! Repository Errors
//!
//! Error types for store-backed operations.

/// Errors that can occur in a repository
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No row matched the id (and owner, for owner-scoped entities)
    #[error("No {0} could be found with the provided ID")]
    NotFound(&'static str),

    /// Unique, foreign-key or other integrity constraint violated
    #[error("{0}")]
    Conflict(String),

    /// Connectivity or unexpected store failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Classify an error raised while writing.
    ///
    /// SQLSTATE class 23 (integrity constraint violation) becomes
    /// `Conflict`; anything else stays a store failure.
    pub fn from_write(entity: &'static str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let is_integrity = db_err
                .code()
                .map(|code| code.starts_with("23"))
                .unwrap_or(false);

            if is_integrity {
                tracing::warn!(
                    entity,
                    constraint = ?db_err.constraint(),
                    "Constraint violation: {}",
                    db_err.message()
                );
                return RepositoryError::Conflict(db_err.message().to_string());
            }
        }

        RepositoryError::Database(err)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::Conflict(_))
    }
}
