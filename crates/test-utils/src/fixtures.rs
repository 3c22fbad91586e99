//! Store fixtures with injectable failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use atlas_common::{DatasetMetadata, GridPoint, Polygon};
use storage::{
    GeoStore, MemoryStore, NearQuery, Neighbor, StoreError, StoreResult, StoreSession,
};

/// A [`MemoryStore`] that can be told to fail.
///
/// Insert failures are counted across every session: after `fail_after`
/// successful bulk inserts in total, each further insert returns
/// [`StoreError::Unavailable`].
#[derive(Clone)]
pub struct FlakyStore {
    inner: MemoryStore,
    inserts: Arc<AtomicUsize>,
    fail_after: Option<usize>,
    fail_sessions: bool,
    fail_index: bool,
    session_limit: Option<usize>,
}

impl FlakyStore {
    /// A store that behaves like `inner` until configured otherwise.
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            inserts: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
            fail_sessions: false,
            fail_index: false,
            session_limit: None,
        }
    }

    /// Fail every bulk insert after the first `batches`.
    pub fn fail_inserts_after(mut self, batches: usize) -> Self {
        self.fail_after = Some(batches);
        self
    }

    /// Refuse to open sessions.
    pub fn fail_sessions(mut self) -> Self {
        self.fail_sessions = true;
        self
    }

    /// Fail spatial index creation.
    pub fn fail_index(mut self) -> Self {
        self.fail_index = true;
        self
    }

    /// Advertise a limit on concurrently open sessions, like a sized pool.
    pub fn limit_sessions(mut self, sessions: usize) -> Self {
        self.session_limit = Some(sessions);
        self
    }

    /// Handle onto the wrapped store for inspection.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

struct FlakySession {
    inner: Box<dyn StoreSession>,
    inserts: Arc<AtomicUsize>,
    fail_after: Option<usize>,
}

#[async_trait]
impl StoreSession for FlakySession {
    async fn insert_many(&mut self, dataset: &str, documents: &[GridPoint]) -> StoreResult<usize> {
        if let Some(limit) = self.fail_after {
            let n = self.inserts.fetch_add(1, Ordering::SeqCst);
            if n >= limit {
                return Err(StoreError::Unavailable(format!(
                    "injected failure on insert {}",
                    n + 1
                )));
            }
        }
        self.inner.insert_many(dataset, documents).await
    }
}

#[async_trait]
impl GeoStore for FlakyStore {
    async fn session(&self) -> StoreResult<Box<dyn StoreSession>> {
        if self.fail_sessions {
            return Err(StoreError::Unavailable("injected session failure".to_string()));
        }
        Ok(Box::new(FlakySession {
            inner: self.inner.session().await?,
            inserts: Arc::clone(&self.inserts),
            fail_after: self.fail_after,
        }))
    }

    fn max_sessions(&self) -> Option<usize> {
        self.session_limit
    }

    async fn replace_metadata(&self, metadata: &DatasetMetadata) -> StoreResult<()> {
        self.inner.replace_metadata(metadata).await
    }

    async fn metadata(&self, name: &str) -> StoreResult<Option<DatasetMetadata>> {
        self.inner.metadata(name).await
    }

    async fn create_spatial_index(&self, dataset: &str) -> StoreResult<()> {
        if self.fail_index {
            return Err(StoreError::Database("injected index failure".to_string()));
        }
        self.inner.create_spatial_index(dataset).await
    }

    async fn intersecting(
        &self,
        dataset: &str,
        polygon: &Polygon,
        variable: &str,
    ) -> StoreResult<Vec<GridPoint>> {
        self.inner.intersecting(dataset, polygon, variable).await
    }

    async fn nearest(&self, dataset: &str, query: &NearQuery) -> StoreResult<Vec<Neighbor>> {
        self.inner.nearest(dataset, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_common::LonLat;

    fn docs(n: usize) -> Vec<GridPoint> {
        (0..n)
            .map(|i| GridPoint::new(LonLat::new(i as f64, 0.0)))
            .collect()
    }

    #[tokio::test]
    async fn test_inserts_fail_after_limit() {
        let store = FlakyStore::new(MemoryStore::new()).fail_inserts_after(2);
        let mut a = store.session().await.unwrap();
        let mut b = store.session().await.unwrap();

        assert!(a.insert_many("ds", &docs(3)).await.is_ok());
        assert!(b.insert_many("ds", &docs(3)).await.is_ok());
        assert!(matches!(
            a.insert_many("ds", &docs(3)).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.inner().stats("ds").await.documents, 6);
    }

    #[tokio::test]
    async fn test_session_and_index_failures() {
        let store = FlakyStore::new(MemoryStore::new()).fail_sessions().fail_index();
        assert!(store.session().await.is_err());
        assert!(store.create_spatial_index("ds").await.is_err());
        assert!(!store.inner().stats("ds").await.indexed);
    }
}
