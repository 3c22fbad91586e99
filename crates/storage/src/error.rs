//! Error types for the geospatial store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a store backend.
///
/// None of these are retried by the store; retry policy belongs to callers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or the pool is exhausted/closed.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A nearest-neighbour query ran before the spatial index existed.
    #[error("No spatial index on dataset '{dataset}'")]
    IndexMissing { dataset: String },

    #[error("Database error: {0}")]
    Database(String),

    /// A value could not be converted to or from its stored form.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Self::Unavailable(err.to_string()),
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
