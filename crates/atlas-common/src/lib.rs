//! Common types shared across the atlas crates.
//!
//! Holds the stored document shape ([`GridPoint`]), the dataset metadata
//! record, raw grid cells as supplied by a grid data source, and the small
//! amount of geodesy the store and query engine agree on.

pub mod document;
pub mod error;
pub mod geo;
pub mod grid;
pub mod metadata;

pub use document::{EncodedValue, GridPoint};
pub use error::{GridError, GridResult};
pub use geo::{haversine_distance, LonLat, Polygon, EARTH_RADIUS_M};
pub use grid::{enumerate_cells, GridCell, RawCell, RawValue, VariableArray};
pub use metadata::{DatasetMetadata, DimensionDescriptor, Parameter, VariableDescriptor};
