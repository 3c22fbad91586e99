//! The stored point document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::LonLat;

/// A fixed-point encoded variable value.
///
/// Scalar cells hold one integer. Cells with an extra level dimension hold
/// one entry per level, in level order; a masked level is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncodedValue {
    Scalar(i64),
    Levels(Vec<Option<i64>>),
}

impl EncodedValue {
    /// Number of levels carried by this value (1 for a scalar).
    pub fn level_count(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Levels(levels) => levels.len(),
        }
    }

    /// The encoded integer at `level`, treating a scalar as a single level.
    pub fn level(&self, level: usize) -> Option<i64> {
        match self {
            Self::Scalar(v) if level == 0 => Some(*v),
            Self::Scalar(_) => None,
            Self::Levels(levels) => levels.get(level).copied().flatten(),
        }
    }
}

/// One stored grid point: a location plus the encoded values of every
/// variable that was not fully masked at that cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub location: LonLat,
    pub values: BTreeMap<String, EncodedValue>,
}

impl GridPoint {
    pub fn new(location: LonLat) -> Self {
        Self {
            location,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, variable: impl Into<String>, value: EncodedValue) -> Self {
        self.values.insert(variable.into(), value);
        self
    }

    pub fn value(&self, variable: &str) -> Option<&EncodedValue> {
        self.values.get(variable)
    }

    /// Copy of this point carrying only `variable` (or no values when absent).
    pub fn project(&self, variable: &str) -> GridPoint {
        let mut projected = GridPoint::new(self.location);
        if let Some(value) = self.values.get(variable) {
            projected.values.insert(variable.to_string(), value.clone());
        }
        projected
    }
}
