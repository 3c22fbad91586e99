//! Error types for grid construction.

use thiserror::Error;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Errors raised while assembling grid arrays.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Variable '{name}' expects {expected} values, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Variable '{0}' declares zero levels")]
    EmptyLevels(String),
}
