//! Synthetic grid generators with predictable values.
//!
//! Values are laid out latitude-major, matching [`VariableArray`], so a
//! test can compute the expected value of any cell from its indices.

use atlas_common::{GridResult, RawValue, VariableArray};

/// `n` evenly spaced coordinates starting at `start`.
///
/// # Example
///
/// ```
/// use test_utils::axis;
///
/// assert_eq!(axis(10.0, 0.5, 3), vec![10.0, 10.5, 11.0]);
/// ```
pub fn axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Value generated by [`indexed_values`] for one cell.
pub fn indexed_value(lat_index: usize, lon_index: usize) -> f64 {
    (lat_index * 1000 + lon_index) as f64
}

/// Cells valued `lat_index * 1000 + lon_index`.
///
/// # Example
///
/// ```
/// use test_utils::indexed_values;
/// use atlas_common::RawValue;
///
/// let values = indexed_values(2, 3);
/// assert_eq!(values.len(), 6);
/// assert_eq!(values[4], RawValue::Number(1001.0)); // lat 1, lon 1
/// ```
pub fn indexed_values(n_lat: usize, n_lon: usize) -> Vec<RawValue> {
    let mut values = Vec::with_capacity(n_lat * n_lon);
    for lat in 0..n_lat {
        for lon in 0..n_lon {
            values.push(RawValue::Number(indexed_value(lat, lon)));
        }
    }
    values
}

/// Temperature-like values in Celsius with a fractional part, from about
/// -20 at the first cell to about 40 at the last.
pub fn temperature_values(n_lat: usize, n_lon: usize) -> Vec<RawValue> {
    let mut values = Vec::with_capacity(n_lat * n_lon);
    for lat in 0..n_lat {
        for lon in 0..n_lon {
            let y = lat as f64 / n_lat.max(1) as f64;
            let x = lon as f64 / n_lon.max(1) as f64;
            values.push(RawValue::Number(-20.0 + 30.0 * y + 30.0 * x + 0.123_456));
        }
    }
    values
}

/// Mask every `every`-th value, starting with the first.
pub fn mask_every(values: Vec<RawValue>, every: usize) -> Vec<RawValue> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            if every > 0 && i % every == 0 {
                RawValue::Masked
            } else {
                v
            }
        })
        .collect()
}

/// A 2-D variable from [`indexed_values`].
pub fn indexed_variable(name: &str, n_lat: usize, n_lon: usize) -> GridResult<VariableArray> {
    VariableArray::scalar(name, n_lat, n_lon, indexed_values(n_lat, n_lon))
}

/// A 2-D variable holding `value` everywhere.
pub fn constant_variable(
    name: &str,
    n_lat: usize,
    n_lon: usize,
    value: f64,
) -> GridResult<VariableArray> {
    VariableArray::scalar(name, n_lat, n_lon, vec![RawValue::Number(value); n_lat * n_lon])
}

/// A 2-D variable with every cell masked.
pub fn masked_variable(name: &str, n_lat: usize, n_lon: usize) -> GridResult<VariableArray> {
    VariableArray::scalar(name, n_lat, n_lon, vec![RawValue::Masked; n_lat * n_lon])
}

/// A 3-D variable whose level `k` at a cell holds
/// `indexed_value(lat, lon) + k * 0.5`.
pub fn layered_variable(
    name: &str,
    n_lat: usize,
    n_lon: usize,
    levels: usize,
) -> GridResult<VariableArray> {
    let mut values = Vec::with_capacity(n_lat * n_lon * levels);
    for lat in 0..n_lat {
        for lon in 0..n_lon {
            for k in 0..levels {
                values.push(RawValue::Number(indexed_value(lat, lon) + k as f64 * 0.5));
            }
        }
    }
    VariableArray::layered(name, n_lat, n_lon, levels, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_common::RawCell;

    #[test]
    fn test_axis() {
        assert_eq!(axis(-1.0, 0.25, 5), vec![-1.0, -0.75, -0.5, -0.25, 0.0]);
        assert!(axis(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_indexed_variable_cells() {
        let array = indexed_variable("v", 3, 4).unwrap();
        assert_eq!(array.shape(), (3, 4));
        match array.cell(2, 3) {
            Some(RawCell::Scalar(RawValue::Number(v))) => assert_eq!(*v, 2003.0),
            other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn test_mask_every() {
        let values = mask_every(indexed_values(1, 4), 2);
        assert_eq!(values[0], RawValue::Masked);
        assert_eq!(values[1], RawValue::Number(1.0));
        assert_eq!(values[2], RawValue::Masked);
    }

    #[test]
    fn test_layered_variable_levels() {
        let array = layered_variable("soil", 2, 2, 3).unwrap();
        assert_eq!(array.levels(), Some(3));
        match array.cell(1, 0) {
            Some(RawCell::Levels(levels)) => {
                assert_eq!(levels[2], RawValue::Number(1001.0));
            }
            other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn test_temperature_values_range() {
        let values = temperature_values(10, 10);
        for v in values {
            match v {
                RawValue::Number(t) => assert!((-20.0..=40.0).contains(&t)),
                other => panic!("unexpected value {:?}", other),
            }
        }
    }
}
