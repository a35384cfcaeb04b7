use common::InvalidCode;
use domain::RepositoryError;
use thiserror::Error;

/// Errors that can occur when talking to PostgreSQL.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored enum column holds a code no variant maps to.
    #[error("Corrupt row: {0}")]
    InvalidCode(#[from] InvalidCode),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        RepositoryError::Backend(Box::new(err))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
