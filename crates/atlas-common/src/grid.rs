//! Raw grid cells as supplied by a grid data source.

use crate::error::{GridError, GridResult};

/// One position of the lat x lon cross product, with both indices and
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub lat_index: usize,
    pub lat: f64,
    pub lon_index: usize,
    pub lon: f64,
}

/// Enumerate every (latitude, longitude) pair, latitude-major.
pub fn enumerate_cells(lats: &[f64], lons: &[f64]) -> Vec<GridCell> {
    let mut cells = Vec::with_capacity(lats.len() * lons.len());
    for (lat_index, &lat) in lats.iter().enumerate() {
        for (lon_index, &lon) in lons.iter().enumerate() {
            cells.push(GridCell {
                lat_index,
                lat,
                lon_index,
                lon,
            });
        }
    }
    cells
}

/// A single raw element of a variable array.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    /// Missing/fill value.
    Masked,
    /// A value the source could not express as a number.
    Text(String),
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<Option<f64>> for RawValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Self::Masked, Self::Number)
    }
}

/// A borrowed view of one cell of a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawCell<'a> {
    Scalar(&'a RawValue),
    Levels(&'a [RawValue]),
}

/// A variable's values addressable as `[lat][lon]` or `[lat][lon][level]`.
///
/// Storage is flat and row-major with latitude outermost.
#[derive(Debug, Clone)]
pub struct VariableArray {
    name: String,
    n_lat: usize,
    n_lon: usize,
    levels: Option<usize>,
    values: Vec<RawValue>,
}

impl VariableArray {
    /// A 2-D variable.
    pub fn scalar(
        name: impl Into<String>,
        n_lat: usize,
        n_lon: usize,
        values: Vec<RawValue>,
    ) -> GridResult<Self> {
        Self::build(name.into(), n_lat, n_lon, None, values)
    }

    /// A variable with an extra level dimension of size `levels`.
    pub fn layered(
        name: impl Into<String>,
        n_lat: usize,
        n_lon: usize,
        levels: usize,
        values: Vec<RawValue>,
    ) -> GridResult<Self> {
        let name = name.into();
        if levels == 0 {
            return Err(GridError::EmptyLevels(name));
        }
        Self::build(name, n_lat, n_lon, Some(levels), values)
    }

    fn build(
        name: String,
        n_lat: usize,
        n_lon: usize,
        levels: Option<usize>,
        values: Vec<RawValue>,
    ) -> GridResult<Self> {
        let expected = n_lat * n_lon * levels.unwrap_or(1);
        if values.len() != expected {
            return Err(GridError::ShapeMismatch {
                name,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            name,
            n_lat,
            n_lon,
            levels,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_lat, self.n_lon)
    }

    /// Size of the level dimension, `None` for 2-D variables.
    pub fn levels(&self) -> Option<usize> {
        self.levels
    }

    /// The cell at `[lat_index][lon_index]`, or `None` when out of range.
    pub fn cell(&self, lat_index: usize, lon_index: usize) -> Option<RawCell<'_>> {
        if lat_index >= self.n_lat || lon_index >= self.n_lon {
            return None;
        }
        let flat = lat_index * self.n_lon + lon_index;
        match self.levels {
            None => self.values.get(flat).map(RawCell::Scalar),
            Some(n) => self.values.get(flat * n..(flat + 1) * n).map(RawCell::Levels),
        }
    }

    /// Minimum and maximum over finite numeric elements.
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter_map(|v| match v {
                RawValue::Number(x) if x.is_finite() => Some(*x),
                _ => None,
            })
            .fold(None, |acc, x| match acc {
                None => Some((x, x)),
                Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
            })
    }
}
