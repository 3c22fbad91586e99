//! In-memory store backend.
//!
//! Mirrors the semantics of a geospatial document store closely enough for
//! tests and single-process use: bulk inserts are additive, metadata
//! replacement is atomic, and nearest-neighbour queries require the spatial
//! index to have been created first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use atlas_common::{DatasetMetadata, GridPoint, Polygon};

use crate::error::{StoreError, StoreResult};
use crate::store::{GeoStore, NearQuery, Neighbor, StoreSession};

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<GridPoint>,
    indexed: bool,
    index_calls: usize,
    insert_batches: Vec<usize>,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Collection>,
    metadata: HashMap<String, DatasetMetadata>,
    metadata_writes: usize,
}

/// Observed activity on one dataset, for inspection in tests and tooling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionStats {
    pub documents: usize,
    pub indexed: bool,
    pub index_calls: usize,
    /// Size of every bulk insert, in arrival order.
    pub insert_batches: Vec<usize>,
}

/// Process-local geospatial store.
///
/// Cloning yields another handle onto the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    sessions: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stats(&self, dataset: &str) -> CollectionStats {
        let state = self.state.read().await;
        state
            .collections
            .get(dataset)
            .map(|c| CollectionStats {
                documents: c.documents.len(),
                indexed: c.indexed,
                index_calls: c.index_calls,
                insert_batches: c.insert_batches.clone(),
            })
            .unwrap_or_default()
    }

    /// All documents stored for `dataset`, in insertion order.
    pub async fn documents(&self, dataset: &str) -> Vec<GridPoint> {
        let state = self.state.read().await;
        state
            .collections
            .get(dataset)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    /// Total metadata replacements performed across all datasets.
    pub async fn metadata_writes(&self) -> usize {
        self.state.read().await.metadata_writes
    }

    /// Number of sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.sessions.load(Ordering::Relaxed)
    }
}

/// Write session onto a [`MemoryStore`].
pub struct MemorySession {
    id: usize,
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn insert_many(&mut self, dataset: &str, documents: &[GridPoint]) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let collection = state.collections.entry(dataset.to_string()).or_default();
        collection.documents.extend_from_slice(documents);
        collection.insert_batches.push(documents.len());

        debug!(session = self.id, dataset = %dataset, count = documents.len(), "Inserted batch");
        Ok(documents.len())
    }
}

#[async_trait]
impl GeoStore for MemoryStore {
    async fn session(&self) -> StoreResult<Box<dyn StoreSession>> {
        let id = self.sessions.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemorySession {
            id,
            state: Arc::clone(&self.state),
        }))
    }

    async fn replace_metadata(&self, metadata: &DatasetMetadata) -> StoreResult<()> {
        let mut state = self.state.write().await;
        // Delete and insert happen under one write lock.
        state.metadata.remove(&metadata.name);
        state.metadata.insert(metadata.name.clone(), metadata.clone());
        state.metadata_writes += 1;
        Ok(())
    }

    async fn metadata(&self, name: &str) -> StoreResult<Option<DatasetMetadata>> {
        Ok(self.state.read().await.metadata.get(name).cloned())
    }

    async fn create_spatial_index(&self, dataset: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let collection = state.collections.entry(dataset.to_string()).or_default();
        collection.indexed = true;
        collection.index_calls += 1;
        Ok(())
    }

    async fn intersecting(
        &self,
        dataset: &str,
        polygon: &Polygon,
        variable: &str,
    ) -> StoreResult<Vec<GridPoint>> {
        let state = self.state.read().await;
        let Some(collection) = state.collections.get(dataset) else {
            return Ok(Vec::new());
        };

        Ok(collection
            .documents
            .iter()
            .filter(|doc| polygon.intersects_point(&doc.location))
            .map(|doc| doc.project(variable))
            .collect())
    }

    async fn nearest(&self, dataset: &str, query: &NearQuery) -> StoreResult<Vec<Neighbor>> {
        let state = self.state.read().await;
        let collection = match state.collections.get(dataset) {
            Some(c) if c.indexed => c,
            _ => {
                return Err(StoreError::IndexMissing {
                    dataset: dataset.to_string(),
                })
            }
        };

        let mut found: Vec<Neighbor> = collection
            .documents
            .iter()
            .filter_map(|doc| {
                let distance = query.point.distance_to(&doc.location);
                (distance <= query.max_distance).then(|| Neighbor {
                    point: doc.project(&query.variable),
                    distance,
                })
            })
            .collect();

        found.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        found.truncate(query.limit);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_common::{EncodedValue, LonLat};

    fn point(lon: f64, lat: f64, v: i64) -> GridPoint {
        GridPoint::new(LonLat::new(lon, lat))
            .with_value("v", EncodedValue::Scalar(v))
            .with_value("other", EncodedValue::Scalar(-v))
    }

    #[tokio::test]
    async fn test_insert_records_batches() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();
        session.insert_many("ds", &[point(0.0, 0.0, 1), point(1.0, 1.0, 2)]).await.unwrap();
        session.insert_many("ds", &[point(2.0, 2.0, 3)]).await.unwrap();

        let stats = store.stats("ds").await;
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.insert_batches, vec![2, 1]);
        assert!(!stats.indexed);
    }

    #[tokio::test]
    async fn test_nearest_requires_index() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();
        session.insert_many("ds", &[point(0.0, 0.0, 1)]).await.unwrap();

        let query = NearQuery {
            point: LonLat::new(0.0, 0.0),
            max_distance: 1000.0,
            limit: 10,
            variable: "v".into(),
        };
        assert!(matches!(
            store.nearest("ds", &query).await,
            Err(StoreError::IndexMissing { .. })
        ));

        store.create_spatial_index("ds").await.unwrap();
        let found = store.nearest("ds", &query).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_nearest_orders_and_limits() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();
        // ~111 m per 0.001 degree of latitude
        session
            .insert_many(
                "ds",
                &[point(0.0, 0.003, 3), point(0.0, 0.001, 1), point(0.0, 0.002, 2), point(0.0, 1.0, 9)],
            )
            .await
            .unwrap();
        store.create_spatial_index("ds").await.unwrap();

        let query = NearQuery {
            point: LonLat::new(0.0, 0.0),
            max_distance: 1000.0,
            limit: 2,
            variable: "v".into(),
        };
        let found = store.nearest("ds", &query).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].point.value("v"), Some(&EncodedValue::Scalar(1)));
        assert_eq!(found[1].point.value("v"), Some(&EncodedValue::Scalar(2)));
        assert!(found[0].distance < found[1].distance);
        assert!(found[0].point.value("other").is_none());
    }

    #[tokio::test]
    async fn test_replace_metadata_discards_previous() {
        let store = MemoryStore::new();
        let mut first = DatasetMetadata::new("ds", "First", 3);
        first.lons = Some(vec![1.0]);
        store.replace_metadata(&first).await.unwrap();

        let second = DatasetMetadata::new("ds", "Second", 3);
        store.replace_metadata(&second).await.unwrap();

        let stored = store.metadata("ds").await.unwrap().unwrap();
        assert_eq!(stored.human_name, "Second");
        assert!(stored.lons.is_none());
        assert_eq!(store.metadata_writes().await, 2);
    }

    #[tokio::test]
    async fn test_intersecting_projects_variable() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();
        session
            .insert_many("ds", &[point(1.0, 1.0, 1), point(5.0, 5.0, 5)])
            .await
            .unwrap();

        let polygon = Polygon::from_ring(vec![
            LonLat::new(0.0, 2.0),
            LonLat::new(0.0, 0.0),
            LonLat::new(2.0, 0.0),
            LonLat::new(2.0, 2.0),
        ]);
        let found = store.intersecting("ds", &polygon, "v").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].values.len(), 1);
        assert!(store.intersecting("missing", &polygon, "v").await.unwrap().is_empty());
    }
}
