//! Multi-tile ingestion and deferred index creation.

use std::sync::Arc;

use atlas_common::{LonLat, RawValue, VariableArray};
use ingestion::metadata::{LAT_DIMENSION, LON_DIMENSION};
use ingestion::{
    Coordinator, ExecutionMode, GridDataset, GridSource, IndexOutcome, IndexState, IngestConfig,
    IngestionError, TileProgress,
};
use storage::{GeoStore, MemoryStore, NearQuery, StoreError};
use test_utils::{axis, indexed_variable};

fn tile(lat_start: f64, lon_start: f64) -> GridDataset {
    GridDataset::new("gsde_tile", axis(lat_start, 0.5, 3), axis(lon_start, 0.5, 4))
        .with_variable(indexed_variable("clay", 3, 4).unwrap())
}

fn near(point: LonLat) -> NearQuery {
    NearQuery {
        point,
        max_distance: 1000.0,
        limit: 10,
        variable: "clay".to_string(),
    }
}

#[tokio::test]
async fn test_two_tiles_index_only_on_last() {
    let store = MemoryStore::new();
    let coordinator = Coordinator::new(Arc::new(store.clone()), IngestConfig::default()).unwrap();

    let progress = TileProgress::new("gsde", 2).unwrap();
    let (first, progress) = coordinator
        .ingest_tile(&progress, &tile(0.0, 0.0), ExecutionMode::Parallel)
        .await
        .unwrap();

    assert!(first.succeeded());
    assert!(matches!(first.index, IndexOutcome::Deferred));
    assert_eq!(progress.state(), IndexState::AwaitingTiles { remaining: 1 });
    let stats = store.stats("gsde").await;
    assert_eq!(stats.documents, 12);
    assert_eq!(stats.index_calls, 0);

    // Points are stored but not yet queryable by distance.
    let err = store.nearest("gsde", &near(LonLat::new(0.0, 0.0))).await.unwrap_err();
    assert!(matches!(err, StoreError::IndexMissing { .. }));

    let (second, progress) = coordinator
        .ingest_tile(&progress, &tile(1.5, 2.0), ExecutionMode::Parallel)
        .await
        .unwrap();

    assert!(matches!(second.index, IndexOutcome::Created));
    assert!(progress.is_complete());
    let stats = store.stats("gsde").await;
    assert_eq!(stats.documents, 24);
    assert_eq!(stats.index_calls, 1);

    let found = store.nearest("gsde", &near(LonLat::new(0.0, 0.0))).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].distance, 0.0);
}

#[tokio::test]
async fn test_metadata_carries_axis_union() {
    let store = MemoryStore::new();
    let coordinator = Coordinator::new(Arc::new(store.clone()), IngestConfig::default()).unwrap();

    let progress = TileProgress::new("gsde", 2).unwrap();
    let (_, progress) = coordinator
        .ingest_tile(&progress, &tile(0.0, 0.0), ExecutionMode::Serial)
        .await
        .unwrap();

    let after_first = store.metadata("gsde").await.unwrap().unwrap();
    assert_eq!(after_first.lats, Some(vec![0.0, 0.5, 1.0]));

    // Second tile overlaps the first on lat 1.0 and lons 1.0..1.5.
    coordinator
        .ingest_tile(&progress, &tile(1.0, 1.0), ExecutionMode::Serial)
        .await
        .unwrap();

    let metadata = store.metadata("gsde").await.unwrap().unwrap();
    assert_eq!(metadata.name, "gsde");
    assert_eq!(metadata.lats, Some(vec![0.0, 0.5, 1.0, 1.5, 2.0]));
    assert_eq!(
        metadata.lons,
        Some(vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5])
    );
    assert_eq!(store.metadata_writes().await, 2);

    let lon = &metadata.dimensions[LON_DIMENSION];
    assert_eq!((lon.size, lon.min, lon.max), (6, Some(0.0), Some(2.5)));
    let lat = &metadata.dimensions[LAT_DIMENSION];
    assert_eq!((lat.size, lat.min, lat.max), (5, Some(0.0), Some(2.0)));
}

#[tokio::test]
async fn test_variable_range_spans_every_tile() {
    let store = MemoryStore::new();
    let coordinator = Coordinator::new(Arc::new(store.clone()), IngestConfig::default()).unwrap();

    // The first tile spans 0..=2003; the second spans -50..=-39.
    let shifted = GridDataset::new("gsde_tile", axis(5.0, 0.5, 3), axis(5.0, 0.5, 4))
        .with_variable(
            VariableArray::scalar(
                "clay",
                3,
                4,
                (0..12).map(|v| RawValue::Number(v as f64 - 50.0)).collect(),
            )
            .unwrap(),
        );

    let progress = TileProgress::new("gsde", 2).unwrap();
    let (_, progress) = coordinator
        .ingest_tile(&progress, &tile(0.0, 0.0), ExecutionMode::Serial)
        .await
        .unwrap();
    coordinator
        .ingest_tile(&progress, &shifted, ExecutionMode::Serial)
        .await
        .unwrap();

    let metadata = store.metadata("gsde").await.unwrap().unwrap();
    let clay = metadata.variable("clay").unwrap();
    assert_eq!((clay.min, clay.max), (Some(-50.0), Some(2003.0)));
    let lon = &metadata.dimensions[LON_DIMENSION];
    assert_eq!(lon.size, metadata.lons.as_ref().unwrap().len());
}

#[tokio::test]
async fn test_exactly_one_index_call_for_many_tiles() {
    let store = MemoryStore::new();
    let coordinator = Coordinator::new(Arc::new(store.clone()), IngestConfig::default()).unwrap();

    let tiles: Vec<Arc<dyn GridSource>> = (0..5)
        .map(|i| Arc::new(tile(i as f64 * 2.0, 0.0)) as Arc<dyn GridSource>)
        .collect();
    let reports = coordinator
        .ingest_tiles("gsde", &tiles, ExecutionMode::Parallel)
        .await
        .unwrap();

    assert_eq!(reports.len(), 5);
    for report in &reports[..4] {
        assert!(matches!(report.index, IndexOutcome::Deferred));
    }
    assert!(matches!(reports[4].index, IndexOutcome::Created));
    assert_eq!(store.stats("gsde").await.index_calls, 1);
    assert_eq!(store.stats("gsde").await.documents, 60);
}

#[tokio::test]
async fn test_extra_tile_rejected() {
    let store = MemoryStore::new();
    let coordinator = Coordinator::new(Arc::new(store.clone()), IngestConfig::default()).unwrap();

    let progress = TileProgress::new("gsde", 1).unwrap();
    let (_, progress) = coordinator
        .ingest_tile(&progress, &tile(0.0, 0.0), ExecutionMode::Serial)
        .await
        .unwrap();

    let err = coordinator
        .ingest_tile(&progress, &tile(5.0, 5.0), ExecutionMode::Serial)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestionError::TilesExhausted { tile_count: 1, .. }));
    assert_eq!(store.stats("gsde").await.documents, 12);
}

#[tokio::test]
async fn test_scale_mismatch_between_tiles() {
    let store = MemoryStore::new();
    let first = Coordinator::new(Arc::new(store.clone()), IngestConfig::default()).unwrap();
    let second =
        Coordinator::new(Arc::new(store.clone()), IngestConfig::default().with_scale(2)).unwrap();

    let progress = TileProgress::new("gsde", 2).unwrap();
    let (_, progress) = first
        .ingest_tile(&progress, &tile(0.0, 0.0), ExecutionMode::Serial)
        .await
        .unwrap();

    let err = second
        .ingest_tile(&progress, &tile(5.0, 5.0), ExecutionMode::Serial)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestionError::ScaleMismatch {
            stored: 3,
            requested: 2,
            ..
        }
    ));

    // The rejected tile leaves progress intact, so it can be retried.
    assert_eq!(progress.tiles_done(), 1);
    let (report, progress) = first
        .ingest_tile(&progress, &tile(5.0, 5.0), ExecutionMode::Serial)
        .await
        .unwrap();
    assert!(matches!(report.index, IndexOutcome::Created));
    assert_eq!(progress.state(), IndexState::Indexed);
    assert_eq!(store.stats("gsde").await.index_calls, 1);
}
