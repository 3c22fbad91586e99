//! Exponentially weighted inverse-distance interpolation.
//!
//! Each neighbour `j` at distance `d_j` gets weight `exp(-decay * d_j)`.
//! Per level, neighbours whose value is null drop out of both the weighted
//! sum and the denominator; a zero denominator yields null.

use ingestion::DecodedValue;

/// Weight of a neighbour `distance` meters away.
pub fn weight(distance: f64, decay: f64) -> f64 {
    (-decay * distance).exp()
}

/// Weighted mean of `(value, distance)` samples, skipping nulls.
///
/// The mean is accumulated as offsets from the first valid value, so
/// neighbours that all share one value reproduce it exactly.
pub fn idw_mean<I>(samples: I, decay: f64) -> Option<f64>
where
    I: IntoIterator<Item = (Option<f64>, f64)>,
{
    let mut base: Option<f64> = None;
    let mut weighted = 0.0;
    let mut total = 0.0;

    for (value, distance) in samples {
        let Some(value) = value.filter(|v| v.is_finite()) else {
            continue;
        };
        let w = weight(distance, decay);
        let origin = *base.get_or_insert(value);
        weighted += (value - origin) * w;
        total += w;
    }

    if total > 0.0 {
        base.map(|origin| origin + weighted / total)
    } else {
        None
    }
}

/// The value of `decoded` at every level, padded with nulls to `levels`.
pub fn level_values(decoded: Option<&DecodedValue>, levels: usize) -> Vec<Option<f64>> {
    let mut values = match decoded {
        Some(DecodedValue::Scalar(v)) => vec![Some(*v)],
        Some(DecodedValue::Levels(v)) => v.clone(),
        None => Vec::new(),
    };
    values.resize(levels.max(values.len()), None);
    values
}

/// Interpolate each level independently.
///
/// `neighbours` pairs every neighbour's per-level values with its distance.
/// The result has `levels` entries, or more if a neighbour carries more.
pub fn interpolate_levels(
    neighbours: &[(Vec<Option<f64>>, f64)],
    levels: usize,
    decay: f64,
) -> Vec<Option<f64>> {
    let width = neighbours
        .iter()
        .map(|(values, _)| values.len())
        .max()
        .unwrap_or(0)
        .max(levels);

    (0..width)
        .map(|level| {
            idw_mean(
                neighbours
                    .iter()
                    .map(|(values, d)| (values.get(level).copied().flatten(), *d)),
                decay,
            )
        })
        .collect()
}
