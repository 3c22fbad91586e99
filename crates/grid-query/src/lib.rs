//! Spatial queries over ingested grid points.
//!
//! Two read operations, both independent of ingestion:
//!
//! - **Bounding box**: every stored point inside a rectangle given by its
//!   top-left and bottom-right corners
//! - **Resampling**: for each query location, an exponentially weighted
//!   mean of the `k` nearest stored points within a radius, per level
//!
//! # Example
//!
//! ```ignore
//! use grid_query::{ResampleConfig, SpatialQueryEngine};
//!
//! let engine = SpatialQueryEngine::new(store);
//! let results = engine
//!     .resample("gsde", &[LonLat::new(10.0, 45.0)], "clay", &ResampleConfig::default())
//!     .await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod resample;
pub mod window;

// Re-export commonly used types at crate root
pub use config::{ResampleConfig, DEFAULT_DECAY, DEFAULT_K, DEFAULT_MAX_DISTANCE};
pub use engine::{PointValues, ResampleResult, SpatialQueryEngine};
pub use error::{QueryError, Result};
pub use resample::{idw_mean, interpolate_levels, weight};
pub use window::{quadrilateral_ring, QueryWindow};
