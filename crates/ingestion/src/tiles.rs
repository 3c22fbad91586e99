//! Index deferral for datasets assembled from several tiles.

use crate::error::{IngestionError, Result};
use crate::metadata::merge_axis;

/// Where a multi-tile dataset stands with respect to its spatial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// `remaining` tiles have yet to be ingested; no index exists.
    AwaitingTiles { remaining: usize },
    /// Every tile has been ingested and the index was requested.
    Indexed,
}

impl IndexState {
    /// A fresh dataset of `tile_count` tiles.
    pub fn for_tiles(tile_count: usize) -> Result<Self> {
        if tile_count == 0 {
            return Err(IngestionError::InvalidConfig(
                "tile_count must be > 0".to_string(),
            ));
        }
        Ok(Self::AwaitingTiles {
            remaining: tile_count,
        })
    }

    /// The state after one more tile, and whether that tile must build
    /// the index. Only the transition to zero remaining does.
    pub fn advance(self) -> (Self, bool) {
        match self {
            Self::AwaitingTiles { remaining } if remaining > 1 => (
                Self::AwaitingTiles {
                    remaining: remaining - 1,
                },
                false,
            ),
            Self::AwaitingTiles { .. } => (Self::Indexed, true),
            Self::Indexed => (Self::Indexed, false),
        }
    }

    pub fn remaining(&self) -> usize {
        match self {
            Self::AwaitingTiles { remaining } => *remaining,
            Self::Indexed => 0,
        }
    }
}

/// Progress of one logical dataset across its tiles.
///
/// Values are consumed by each tile call and a successor returned, so no
/// tile observes another's mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct TileProgress {
    dataset: String,
    tile_count: usize,
    state: IndexState,
    lons: Vec<f64>,
    lats: Vec<f64>,
}

impl TileProgress {
    pub fn new(dataset: impl Into<String>, tile_count: usize) -> Result<Self> {
        Ok(Self {
            dataset: dataset.into(),
            tile_count,
            state: IndexState::for_tiles(tile_count)?,
            lons: Vec::new(),
            lats: Vec::new(),
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn tile_count(&self) -> usize {
        self.tile_count
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    /// Tiles already ingested.
    pub fn tiles_done(&self) -> usize {
        self.tile_count - self.state.remaining()
    }

    pub fn is_complete(&self) -> bool {
        self.state == IndexState::Indexed
    }

    /// Distinct longitudes seen so far, sorted.
    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    /// Distinct latitudes seen so far, sorted.
    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    /// Successor after absorbing one tile's axes, plus whether the index
    /// is due on this tile.
    pub fn next(&self, lons: &[f64], lats: &[f64]) -> Result<(Self, bool)> {
        if self.is_complete() {
            return Err(IngestionError::TilesExhausted {
                dataset: self.dataset.clone(),
                tile_count: self.tile_count,
            });
        }

        let (state, index_due) = self.state.advance();
        Ok((
            Self {
                dataset: self.dataset.clone(),
                tile_count: self.tile_count,
                state,
                lons: merge_axis(&self.lons, lons),
                lats: merge_axis(&self.lats, lats),
            },
            index_due,
        ))
    }
}
