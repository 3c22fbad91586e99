//! Read-only spatial queries against a [`GeoStore`].

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, info, instrument};

use atlas_common::{DatasetMetadata, GridPoint, LonLat};
use ingestion::decode;
use storage::{GeoStore, NearQuery};

use crate::config::ResampleConfig;
use crate::error::{QueryError, Result};
use crate::resample::{interpolate_levels, level_values};
use crate::window::QueryWindow;

/// A stored point with its variable decoded to floating point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointValues {
    pub location: LonLat,
    /// One entry per level; scalars have exactly one.
    pub values: Vec<Option<f64>>,
}

/// Interpolated values at one query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResampleResult {
    pub location: LonLat,
    /// Neighbours found within the search radius.
    pub neighbours: usize,
    /// One interpolated value per level, null where no neighbour had one.
    pub values: Vec<Option<f64>>,
}

impl ResampleResult {
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// Bounding-box extraction and IDW resampling. Never writes to the store.
pub struct SpatialQueryEngine {
    store: Arc<dyn GeoStore>,
}

impl SpatialQueryEngine {
    pub fn new(store: Arc<dyn GeoStore>) -> Self {
        Self { store }
    }

    /// Every stored point inside `window`, projected to `variable`.
    #[instrument(skip(self, window), fields(dataset = %dataset, variable = %variable))]
    pub async fn bbox(
        &self,
        dataset: &str,
        window: &QueryWindow,
        variable: &str,
    ) -> Result<Vec<GridPoint>> {
        let start = Instant::now();
        let points = self
            .store
            .intersecting(dataset, &window.polygon(), variable)
            .await?;
        debug!(
            points = points.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Bounding box query complete"
        );
        Ok(points)
    }

    /// [`Self::bbox`] with values decoded using the dataset's scale.
    pub async fn bbox_values(
        &self,
        dataset: &str,
        window: &QueryWindow,
        variable: &str,
    ) -> Result<Vec<PointValues>> {
        let metadata = self.metadata(dataset).await?;
        let levels = level_count(&metadata, variable)?;
        let points = self.bbox(dataset, window, variable).await?;

        Ok(points
            .iter()
            .map(|p| PointValues {
                location: p.location,
                values: level_values(decode(p.value(variable), metadata.scale).as_ref(), levels),
            })
            .collect())
    }

    /// Interpolate `variable` at each of `points`.
    ///
    /// Results are in the order of `points`. A point with no neighbour
    /// within `config.max_distance` yields all nulls.
    #[instrument(skip(self, points, config), fields(dataset = %dataset, variable = %variable, points = points.len()))]
    pub async fn resample(
        &self,
        dataset: &str,
        points: &[LonLat],
        variable: &str,
        config: &ResampleConfig,
    ) -> Result<Vec<ResampleResult>> {
        config.validate()?;
        let start = Instant::now();

        let metadata = self.metadata(dataset).await?;
        let levels = level_count(&metadata, variable)?;
        let scale = metadata.scale;

        let results: Vec<ResampleResult> = stream::iter(points.iter().copied())
            .map(|point| self.resample_point(dataset, point, variable, levels, scale, config))
            .buffered(config.concurrency)
            .try_collect()
            .await?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            empty = results.iter().filter(|r| r.is_empty()).count(),
            "Resample complete"
        );
        Ok(results)
    }

    async fn resample_point(
        &self,
        dataset: &str,
        point: LonLat,
        variable: &str,
        levels: usize,
        scale: u32,
        config: &ResampleConfig,
    ) -> Result<ResampleResult> {
        let query = NearQuery {
            point,
            max_distance: config.max_distance,
            limit: config.k,
            variable: variable.to_string(),
        };
        let found = self.store.nearest(dataset, &query).await?;

        let neighbours: Vec<(Vec<Option<f64>>, f64)> = found
            .iter()
            .map(|n| {
                let decoded = decode(n.point.value(variable), scale);
                (level_values(decoded.as_ref(), levels), n.distance)
            })
            .collect();

        Ok(ResampleResult {
            location: point,
            neighbours: neighbours.len(),
            values: interpolate_levels(&neighbours, levels, config.decay),
        })
    }

    async fn metadata(&self, dataset: &str) -> Result<DatasetMetadata> {
        self.store
            .metadata(dataset)
            .await?
            .ok_or_else(|| QueryError::DatasetNotFound(dataset.to_string()))
    }
}

fn level_count(metadata: &DatasetMetadata, variable: &str) -> Result<usize> {
    metadata
        .variable(variable)
        .map(|v| v.levels.unwrap_or(1))
        .ok_or_else(|| QueryError::VariableNotFound {
            dataset: metadata.name.clone(),
            variable: variable.to_string(),
        })
}
