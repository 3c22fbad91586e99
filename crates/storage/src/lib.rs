//! Geospatial document store for atlas grid points.
//!
//! Provides:
//! - [`GeoStore`] / [`StoreSession`] traits: bulk insert, metadata replace,
//!   polygon intersection, k-nearest-within-radius, spatial index creation
//! - [`MemoryStore`]: process-local backend used by tests and tooling
//! - [`PostgisStore`]: PostgreSQL + PostGIS backend

pub mod config;
pub mod error;
pub mod memory;
pub mod postgis;
pub mod store;

pub use config::{StoreBackend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::{CollectionStats, MemoryStore};
pub use postgis::PostgisStore;
pub use store::{GeoStore, NearQuery, Neighbor, StoreSession};
