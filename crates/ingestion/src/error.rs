//! Error types for the ingestion crate.

use thiserror::Error;

use storage::StoreError;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Cannot partition {items} cells across {workers} workers")]
    InvalidPartition { items: usize, workers: usize },

    #[error("Variable '{variable}' has no cell at lat index {lat_index}, lon index {lon_index}")]
    CellOutOfBounds {
        variable: String,
        lat_index: usize,
        lon_index: usize,
    },

    #[error("Worker task did not complete: {0}")]
    Join(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Grid source error: {0}")]
    Source(String),

    #[error("Dataset '{dataset}' is stored with scale {stored}, got {requested}")]
    ScaleMismatch {
        dataset: String,
        stored: u32,
        requested: u32,
    },

    #[error("All {tile_count} tiles of '{dataset}' are already ingested")]
    TilesExhausted { dataset: String, tile_count: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<atlas_common::GridError> for IngestionError {
    fn from(err: atlas_common::GridError) -> Self {
        Self::Source(err.to_string())
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
