//! Error types for spatial queries.

use thiserror::Error;

use storage::StoreError;

/// Errors that can occur while querying stored grid points.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The store rejected or failed the query.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No metadata record exists for the dataset.
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    /// The dataset does not hold the requested variable.
    #[error("variable '{variable}' not found in dataset '{dataset}'")]
    VariableNotFound { dataset: String, variable: String },

    /// The query window corners are not usable coordinates.
    #[error("invalid query window: {0}")]
    InvalidWindow(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
