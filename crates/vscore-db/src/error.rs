//! Database error types.

use thiserror::Error;
use vscore_models::VideoStatus;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A conditional status update found the row in another state.
    #[error("Video {id} is {status}, expected {expected}")]
    StatusConflict {
        id: String,
        status: VideoStatus,
        expected: VideoStatus,
    },

    #[error("Video {0} has no blob URL yet")]
    MissingUrl(String),

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// True for state-machine rejections, as opposed to infrastructure failures.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DbError::StatusConflict { .. } | DbError::MissingUrl(_)
        )
    }
}
