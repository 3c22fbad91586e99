//! Store traits shared by every backend.

use async_trait::async_trait;

use atlas_common::{DatasetMetadata, GridPoint, LonLat, Polygon};

use crate::error::StoreResult;

/// Parameters of a k-nearest-within-radius query.
#[derive(Debug, Clone, PartialEq)]
pub struct NearQuery {
    pub point: LonLat,
    /// Search radius in meters.
    pub max_distance: f64,
    /// Maximum number of neighbours returned.
    pub limit: usize,
    /// Variable kept in the projection of each neighbour.
    pub variable: String,
}

/// A stored point found by [`GeoStore::nearest`].
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub point: GridPoint,
    /// Spherical distance to the query point in meters.
    pub distance: f64,
}

/// An exclusive write handle onto the store.
///
/// Each ingestion worker holds its own session for the lifetime of its
/// slice so writes from different workers never interleave on one
/// connection.
#[async_trait]
pub trait StoreSession: Send {
    /// Insert a batch of documents in one bulk write.
    ///
    /// Returns the number of documents written.
    async fn insert_many(&mut self, dataset: &str, documents: &[GridPoint]) -> StoreResult<usize>;
}

/// A geospatial document store.
#[async_trait]
pub trait GeoStore: Send + Sync {
    /// Open a new exclusive write session.
    async fn session(&self) -> StoreResult<Box<dyn StoreSession>>;

    /// Upper bound on sessions that can be open at the same time, if any.
    fn max_sessions(&self) -> Option<usize> {
        None
    }

    /// Replace the metadata record for `metadata.name`.
    ///
    /// Any prior record of that name is discarded, never merged. Backends
    /// that support it perform the delete and insert atomically.
    async fn replace_metadata(&self, metadata: &DatasetMetadata) -> StoreResult<()>;

    /// Fetch a dataset's metadata record.
    async fn metadata(&self, name: &str) -> StoreResult<Option<DatasetMetadata>>;

    /// Create the 2-D spherical index on the location field. Idempotent.
    async fn create_spatial_index(&self, dataset: &str) -> StoreResult<()>;

    /// Every point whose location intersects `polygon`, projected to the
    /// location and `variable`.
    async fn intersecting(
        &self,
        dataset: &str,
        polygon: &Polygon,
        variable: &str,
    ) -> StoreResult<Vec<GridPoint>>;

    /// Up to `query.limit` points within `query.max_distance`, nearest first.
    async fn nearest(&self, dataset: &str, query: &NearQuery) -> StoreResult<Vec<Neighbor>>;
}
