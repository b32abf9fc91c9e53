//! Error types for store operations

use std::fmt;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations
///
/// Failures are isolated per call: a failed append for one metric kind never
/// blocks or fails appends for others, and the store itself does not retry.
#[derive(Debug)]
pub enum StoreError {
    /// Durable write failed on the underlying I/O path
    WriteFailed(String),

    /// Read query failed
    QueryFailed(String),

    /// Could not open or reach the underlying storage
    ConnectionFailed(String),

    /// Schema migration failed
    MigrationFailed(String),

    /// Sample could not be encoded or decoded
    Serialization(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::WriteFailed(msg) => write!(f, "sample write failed: {}", msg),
            StoreError::QueryFailed(msg) => write!(f, "store query failed: {}", msg),
            StoreError::ConnectionFailed(msg) => {
                write!(f, "failed to connect to store: {}", msg)
            }
            StoreError::MigrationFailed(msg) => write!(f, "store migration failed: {}", msg),
            StoreError::Serialization(msg) => write!(f, "sample serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::QueryFailed("no rows found".to_string()),
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}
