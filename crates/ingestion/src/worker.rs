//! Ingestion worker: owns one slice, encodes cells, flushes batches.

use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use atlas_common::{GridCell, GridPoint, LonLat};
use storage::StoreSession;

use crate::codec;
use crate::error::{IngestionError, Result};
use crate::source::VariableMap;

/// Outcome of one worker's slice.
#[derive(Debug)]
pub struct WorkerResult {
    /// Position of the slice in the partition
    pub slice: usize,
    /// Cells assigned to the slice
    pub cells: usize,
    /// Documents committed to the store by this worker
    pub documents_written: usize,
    /// Bulk writes issued
    pub batches: usize,
    /// Cells skipped because every variable was null
    pub skipped: usize,
    /// Variable values dropped after a recovered codec condition
    pub recovered: usize,
    /// First error; the remainder of the slice was not processed
    pub error: Option<IngestionError>,
}

impl WorkerResult {
    pub fn new(slice: usize, cells: usize) -> Self {
        Self {
            slice,
            cells,
            documents_written: 0,
            batches: 0,
            skipped: 0,
            recovered: 0,
            error: None,
        }
    }

    /// A slice that failed before any work was done.
    pub fn failed(slice: usize, cells: usize, error: IngestionError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(slice, cells)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Processes one slice through a dedicated store session.
pub struct IngestionWorker {
    slice: usize,
    dataset: Arc<str>,
    scale: u32,
    batch_size: usize,
    session: Box<dyn StoreSession>,
}

impl IngestionWorker {
    pub fn new(
        slice: usize,
        dataset: Arc<str>,
        scale: u32,
        batch_size: usize,
        session: Box<dyn StoreSession>,
    ) -> Self {
        Self {
            slice,
            dataset,
            scale,
            batch_size: batch_size.max(1),
            session,
        }
    }

    /// Ingest every cell of `cells`.
    ///
    /// A batch is flushed each time it reaches `batch_size` documents and
    /// once more for the remainder. The first error aborts the rest of the
    /// slice; batches flushed before it stay committed.
    #[instrument(skip_all, fields(dataset = %self.dataset, slice = self.slice, cells = cells.len()))]
    pub async fn run(mut self, cells: &[GridCell], variables: &VariableMap) -> WorkerResult {
        let mut result = WorkerResult::new(self.slice, cells.len());
        let mut batch: Vec<GridPoint> = Vec::with_capacity(self.batch_size);

        for cell in cells {
            match self.build_document(cell, variables, &mut result) {
                Ok(Some(document)) => {
                    batch.push(document);
                    if batch.len() == self.batch_size {
                        if let Err(e) = self.flush(&mut batch, &mut result).await {
                            return self.abort(result, e);
                        }
                    }
                }
                Ok(None) => result.skipped += 1,
                Err(e) => return self.abort(result, e),
            }
        }

        if !batch.is_empty() {
            if let Err(e) = self.flush(&mut batch, &mut result).await {
                return self.abort(result, e);
            }
        }

        debug!(
            documents = result.documents_written,
            batches = result.batches,
            skipped = result.skipped,
            "Slice complete"
        );
        result
    }

    /// Encode every variable at `cell`; `None` when all of them are null.
    fn build_document(
        &self,
        cell: &GridCell,
        variables: &VariableMap,
        result: &mut WorkerResult,
    ) -> Result<Option<GridPoint>> {
        let mut document = GridPoint::new(LonLat::new(cell.lon, cell.lat));

        for (name, array) in variables {
            let raw = array.cell(cell.lat_index, cell.lon_index).ok_or_else(|| {
                IngestionError::CellOutOfBounds {
                    variable: name.clone(),
                    lat_index: cell.lat_index,
                    lon_index: cell.lon_index,
                }
            })?;

            match codec::encode(raw, self.scale) {
                Ok(Some(value)) => {
                    document.values.insert(name.clone(), value);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        variable = %name,
                        lat = cell.lat,
                        lon = cell.lon,
                        error = %e,
                        "Treating cell as null"
                    );
                    result.recovered += 1;
                }
            }
        }

        Ok((!document.values.is_empty()).then_some(document))
    }

    async fn flush(&mut self, batch: &mut Vec<GridPoint>, result: &mut WorkerResult) -> Result<()> {
        let written = self.session.insert_many(&self.dataset, batch).await?;
        result.documents_written += written;
        result.batches += 1;
        debug!(batch = result.batches, size = batch.len(), "Flushed batch");
        batch.clear();
        Ok(())
    }

    fn abort(&self, mut result: WorkerResult, err: IngestionError) -> WorkerResult {
        error!(
            error = %err,
            documents = result.documents_written,
            "Worker aborted, earlier batches remain committed"
        );
        result.error = Some(err);
        result
    }
}
