//! Bounding-box query windows.

use serde::{Deserialize, Serialize};

use atlas_common::{LonLat, Polygon};

use crate::error::{QueryError, Result};

/// A rectangular window given by its top-left and bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub top_left: LonLat,
    pub bottom_right: LonLat,
}

impl QueryWindow {
    pub fn new(top_left: LonLat, bottom_right: LonLat) -> Result<Self> {
        for corner in [top_left, bottom_right] {
            if !corner.lon.is_finite() || !corner.lat.is_finite() {
                return Err(QueryError::InvalidWindow(format!(
                    "corner ({}, {}) is not finite",
                    corner.lon, corner.lat
                )));
            }
            if !(-90.0..=90.0).contains(&corner.lat) {
                return Err(QueryError::InvalidWindow(format!(
                    "latitude {} out of range",
                    corner.lat
                )));
            }
        }
        Ok(Self {
            top_left,
            bottom_right,
        })
    }

    /// The closed five-point ring, first point repeated last.
    pub fn ring(&self) -> [LonLat; 5] {
        quadrilateral_ring(self.top_left, self.bottom_right)
    }

    pub fn polygon(&self) -> Polygon {
        Polygon::from_ring(self.ring().to_vec())
    }
}

/// `[tl, (tl.lon, br.lat), br, (br.lon, tl.lat), tl]`
pub fn quadrilateral_ring(top_left: LonLat, bottom_right: LonLat) -> [LonLat; 5] {
    [
        top_left,
        LonLat::new(top_left.lon, bottom_right.lat),
        bottom_right,
        LonLat::new(bottom_right.lon, top_left.lat),
        top_left,
    ]
}
