//! Ingestion coordinator: fan-out, join barrier, metadata and index.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use atlas_common::{enumerate_cells, DatasetMetadata, GridCell};
use storage::{GeoStore, StoreError};

use crate::config::IngestConfig;
use crate::error::{IngestionError, Result};
use crate::metadata::{build_metadata, merge_tile_metadata};
use crate::partition::partition;
use crate::source::{load_variables, GridSource, VariableMap};
use crate::tiles::TileProgress;
use crate::worker::{IngestionWorker, WorkerResult};

/// How the cells of one call are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One worker, awaited inline.
    Serial,
    /// One task per slice, joined before anything else happens.
    #[default]
    Parallel,
}

/// Everything one raster ingestion needs.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub dataset: String,
    pub variables: Arc<VariableMap>,
    pub cells: Vec<GridCell>,
    pub scale: u32,
}

impl IngestRequest {
    /// Request covering every cell of the `lats` x `lons` grid.
    pub fn for_grid(
        dataset: impl Into<String>,
        variables: Arc<VariableMap>,
        lats: &[f64],
        lons: &[f64],
        scale: u32,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            variables,
            cells: enumerate_cells(lats, lons),
            scale,
        }
    }
}

/// What happened to the spatial index at the end of a call.
#[derive(Debug)]
pub enum IndexOutcome {
    /// Not due on this call.
    Deferred,
    Created,
    Failed(StoreError),
}

/// Coarse classification of an [`IngestReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Every slice finished and the index, when due, was created.
    Complete,
    /// Something failed after at least one document was committed.
    Partial,
    /// Something failed and no document was committed.
    NothingWritten,
}

/// Per-slice outcomes of one ingestion call.
#[derive(Debug)]
pub struct IngestReport {
    pub dataset: String,
    /// One entry per slice, in slice order
    pub slices: Vec<WorkerResult>,
    pub index: IndexOutcome,
}

impl IngestReport {
    /// True only if no worker failed and the index, when due, was created.
    pub fn succeeded(&self) -> bool {
        self.slices.iter().all(WorkerResult::is_ok)
            && !matches!(self.index, IndexOutcome::Failed(_))
    }

    pub fn documents_written(&self) -> usize {
        self.slices.iter().map(|s| s.documents_written).sum()
    }

    pub fn batches(&self) -> usize {
        self.slices.iter().map(|s| s.batches).sum()
    }

    pub fn outcome(&self) -> IngestOutcome {
        if self.succeeded() {
            IngestOutcome::Complete
        } else if self.documents_written() > 0 {
            IngestOutcome::Partial
        } else {
            IngestOutcome::NothingWritten
        }
    }

    /// The first worker error in slice order, if any.
    pub fn first_error(&self) -> Option<&IngestionError> {
        self.slices.iter().find_map(|s| s.error.as_ref())
    }

    /// Slices whose worker stopped early.
    pub fn failed_slices(&self) -> Vec<usize> {
        self.slices
            .iter()
            .filter(|s| !s.is_ok())
            .map(|s| s.slice)
            .collect()
    }
}

/// Drives workers against a store.
pub struct Coordinator {
    store: Arc<dyn GeoStore>,
    config: IngestConfig,
}

impl Coordinator {
    pub fn new(store: Arc<dyn GeoStore>, config: IngestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn GeoStore> {
        &self.store
    }

    /// Replace the dataset's metadata record.
    #[instrument(skip(self, metadata), fields(dataset = %metadata.name))]
    pub async fn ingest_metadata(&self, metadata: &DatasetMetadata) -> Result<()> {
        let start = Instant::now();
        debug!("Stage metadata started");
        self.store.replace_metadata(metadata).await?;
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            variables = metadata.variables.len(),
            "Stage metadata complete"
        );
        Ok(())
    }

    /// Ingest the cells of `request`, then create the index unless deferred.
    ///
    /// The index call, if any, happens only after every worker has
    /// terminated.
    #[instrument(skip(self, request), fields(dataset = %request.dataset, cells = request.cells.len()))]
    pub async fn ingest(
        &self,
        request: IngestRequest,
        mode: ExecutionMode,
        defer_index: bool,
    ) -> Result<IngestReport> {
        let dataset = request.dataset.clone();
        let slices = self.ingest_raster(request, mode).await?;
        let index = if defer_index {
            IndexOutcome::Deferred
        } else {
            self.create_index(&dataset).await
        };

        let report = IngestReport {
            dataset,
            slices,
            index,
        };
        self.log_report(&report);
        Ok(report)
    }

    /// Ingest a complete single-tile dataset: metadata, raster, index.
    #[instrument(skip(self, source), fields(dataset = %source.name()))]
    pub async fn ingest_source(
        &self,
        source: &dyn GridSource,
        mode: ExecutionMode,
    ) -> Result<IngestReport> {
        let variables = load_variables(source, &self.config)?;
        let metadata = build_metadata(source, &variables, self.config.scale);
        self.ingest_metadata(&metadata).await?;

        let request = IngestRequest::for_grid(
            source.name(),
            variables,
            source.latitudes(),
            source.longitudes(),
            self.config.scale,
        );
        self.ingest(request, mode, false).await
    }

    /// Ingest one tile of a multi-tile dataset.
    ///
    /// Returns the successor of `progress`, which is left untouched so a
    /// failed tile can be retried. Metadata carrying the accumulated lon/lat
    /// union and the widened variable ranges is replaced on every tile; the
    /// index is created only on the tile that brings the remaining count to
    /// zero.
    #[instrument(
        skip(self, progress, source),
        fields(dataset = %progress.dataset(), tile = progress.tiles_done() + 1, tile_count = progress.tile_count())
    )]
    pub async fn ingest_tile(
        &self,
        progress: &TileProgress,
        source: &dyn GridSource,
        mode: ExecutionMode,
    ) -> Result<(IngestReport, TileProgress)> {
        let (next, index_due) = progress.next(source.longitudes(), source.latitudes())?;

        let stored = if progress.tiles_done() > 0 {
            self.store.metadata(progress.dataset()).await?
        } else {
            None
        };
        if let Some(stored) = &stored {
            if stored.scale != self.config.scale {
                return Err(IngestionError::ScaleMismatch {
                    dataset: progress.dataset().to_string(),
                    stored: stored.scale,
                    requested: self.config.scale,
                });
            }
        }

        let variables = load_variables(source, &self.config)?;
        let mut metadata = build_metadata(source, &variables, self.config.scale);
        metadata.name = next.dataset().to_string();
        merge_tile_metadata(&mut metadata, stored.as_ref(), next.lons(), next.lats());
        self.ingest_metadata(&metadata).await?;

        let request = IngestRequest::for_grid(
            next.dataset(),
            variables,
            source.latitudes(),
            source.longitudes(),
            self.config.scale,
        );
        let report = self.ingest(request, mode, !index_due).await?;
        Ok((report, next))
    }

    /// Ingest every tile of `dataset` in order, one report per tile.
    ///
    /// A tile whose workers fail does not stop the run; a store or source
    /// error does.
    pub async fn ingest_tiles(
        &self,
        dataset: &str,
        tiles: &[Arc<dyn GridSource>],
        mode: ExecutionMode,
    ) -> Result<Vec<IngestReport>> {
        let mut progress = TileProgress::new(dataset, tiles.len())?;
        let mut reports = Vec::with_capacity(tiles.len());

        for tile in tiles {
            let (report, next) = self.ingest_tile(&progress, tile.as_ref(), mode).await?;
            if !report.succeeded() {
                warn!(
                    dataset = %dataset,
                    tile = next.tiles_done(),
                    "Tile ingested with failures"
                );
            }
            reports.push(report);
            progress = next;
        }

        Ok(reports)
    }

    async fn ingest_raster(
        &self,
        request: IngestRequest,
        mode: ExecutionMode,
    ) -> Result<Vec<WorkerResult>> {
        let start = Instant::now();
        debug!(mode = ?mode, "Stage raster started");

        let IngestRequest {
            dataset,
            variables,
            cells,
            scale,
        } = request;
        let dataset: Arc<str> = Arc::from(dataset);

        let results = match mode {
            ExecutionMode::Serial => {
                if cells.is_empty() {
                    return Err(IngestionError::InvalidPartition {
                        items: 0,
                        workers: 1,
                    });
                }
                let result = run_slice(
                    Arc::clone(&self.store),
                    0,
                    Arc::clone(&dataset),
                    scale,
                    self.config.batch_size,
                    cells,
                    Arc::clone(&variables),
                )
                .await;
                vec![result]
            }
            ExecutionMode::Parallel => {
                let workers = self.parallel_workers(cells.len());
                let slices = partition(cells, workers)?;
                debug!(workers = slices.len(), "Spawning workers");

                let mut sizes = Vec::with_capacity(slices.len());
                let mut handles = Vec::with_capacity(slices.len());
                for (slice, cells) in slices.into_iter().enumerate() {
                    sizes.push(cells.len());
                    let store = Arc::clone(&self.store);
                    let dataset = Arc::clone(&dataset);
                    let variables = Arc::clone(&variables);
                    let batch_size = self.config.batch_size;
                    handles.push(tokio::spawn(async move {
                        run_slice(store, slice, dataset, scale, batch_size, cells, variables).await
                    }));
                }

                // Join barrier: nothing proceeds until every task has ended.
                join_all(handles)
                    .await
                    .into_iter()
                    .zip(sizes)
                    .enumerate()
                    .map(|(slice, (joined, cells))| match joined {
                        Ok(result) => result,
                        Err(e) => {
                            error!(slice = slice, error = %e, "Worker task did not complete");
                            WorkerResult::failed(slice, cells, IngestionError::Join(e.to_string()))
                        }
                    })
                    .collect()
            }
        };

        let documents: usize = results.iter().map(|r| r.documents_written).sum();
        let batches: usize = results.iter().map(|r| r.batches).sum();
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            documents = documents,
            batches = batches,
            slices = results.len(),
            "Stage raster complete"
        );
        Ok(results)
    }

    /// Worker count for `cells` cells, capped by the cell count and by the
    /// number of sessions the store can hold open at once.
    fn parallel_workers(&self, cells: usize) -> usize {
        let mut workers = self.config.resolved_workers().min(cells);
        if let Some(sessions) = self.store.max_sessions() {
            if sessions < workers {
                debug!(
                    requested = workers,
                    sessions = sessions,
                    "Capping workers at store session limit"
                );
                workers = sessions;
            }
        }
        workers.max(1)
    }

    async fn create_index(&self, dataset: &str) -> IndexOutcome {
        let start = Instant::now();
        debug!(dataset = %dataset, "Stage index started");
        match self.store.create_spatial_index(dataset).await {
            Ok(()) => {
                info!(
                    dataset = %dataset,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Stage index complete"
                );
                IndexOutcome::Created
            }
            Err(e) => {
                error!(dataset = %dataset, error = %e, "Spatial index creation failed");
                IndexOutcome::Failed(e)
            }
        }
    }

    fn log_report(&self, report: &IngestReport) {
        match report.outcome() {
            IngestOutcome::Complete => info!(
                dataset = %report.dataset,
                documents = report.documents_written(),
                "Ingestion complete"
            ),
            outcome => error!(
                dataset = %report.dataset,
                outcome = ?outcome,
                documents = report.documents_written(),
                failed_slices = ?report.failed_slices(),
                "Ingestion failed"
            ),
        }
    }
}

/// Open a session and run one worker over `cells`.
async fn run_slice(
    store: Arc<dyn GeoStore>,
    slice: usize,
    dataset: Arc<str>,
    scale: u32,
    batch_size: usize,
    cells: Vec<GridCell>,
    variables: Arc<VariableMap>,
) -> WorkerResult {
    let session = match store.session().await {
        Ok(session) => session,
        Err(e) => {
            error!(slice = slice, error = %e, "Could not open store session");
            return WorkerResult::failed(slice, cells.len(), e.into());
        }
    };

    IngestionWorker::new(slice, dataset, scale, batch_size, session)
        .run(&cells, &variables)
        .await
}
