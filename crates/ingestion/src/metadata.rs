//! Dataset metadata derivation.

use chrono::Utc;

use atlas_common::{DatasetMetadata, DimensionDescriptor, Parameter, VariableDescriptor};

use crate::source::{GridSource, VariableMap};

/// Index of the longitude descriptor in [`DatasetMetadata::dimensions`].
pub const LON_DIMENSION: usize = 0;
/// Index of the latitude descriptor in [`DatasetMetadata::dimensions`].
pub const LAT_DIMENSION: usize = 1;

/// Build the metadata record for `source` as it will be ingested.
pub fn build_metadata(
    source: &dyn GridSource,
    variables: &VariableMap,
    scale: u32,
) -> DatasetMetadata {
    let mut metadata = DatasetMetadata::new(source.name(), source.human_name(), scale);

    metadata.dimensions.push(axis_descriptor("lon", "Longitude", source.longitudes()));
    metadata.dimensions.push(axis_descriptor("lat", "Latitude", source.latitudes()));
    let extra = source.dimensions();
    metadata.dimensions.extend(extra.iter().cloned());

    for (name, array) in variables {
        let mut dimensions = vec![LAT_DIMENSION, LON_DIMENSION];
        if let Some(levels) = array.levels() {
            if let Some(pos) = extra.iter().position(|d| d.size == levels) {
                dimensions.push(pos + 2);
            }
        }
        let range = array.numeric_range();

        metadata.variables.push(VariableDescriptor {
            name: name.clone(),
            human_name: name.clone(),
            min: range.map(|(lo, _)| lo),
            max: range.map(|(_, hi)| hi),
            unit: source.unit(name),
            dimensions,
            levels: array.levels(),
        });
    }

    metadata.parameters = source.parameters();
    metadata.inserted_at = Utc::now();
    metadata
}

fn axis_descriptor(name: &str, human_name: &str, values: &[f64]) -> DimensionDescriptor {
    let min = values.iter().copied().fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |a| a.min(v)))
    });
    let max = values.iter().copied().fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |a| a.max(v)))
    });
    DimensionDescriptor {
        name: name.to_string(),
        human_name: human_name.to_string(),
        min,
        max,
        size: values.len(),
        unit: Some("degrees".to_string()),
    }
}

/// Fold a tile's metadata into the record already stored for its dataset.
///
/// The lon/lat descriptors are rebuilt from the accumulated axis unions and
/// each variable's range is widened by the stored range of the same name.
pub fn merge_tile_metadata(
    metadata: &mut DatasetMetadata,
    stored: Option<&DatasetMetadata>,
    lons: &[f64],
    lats: &[f64],
) {
    metadata.dimensions[LON_DIMENSION] = axis_descriptor("lon", "Longitude", lons);
    metadata.dimensions[LAT_DIMENSION] = axis_descriptor("lat", "Latitude", lats);
    metadata.lons = Some(lons.to_vec());
    metadata.lats = Some(lats.to_vec());

    let Some(stored) = stored else {
        return;
    };
    for variable in &mut metadata.variables {
        if let Some(previous) = stored.variable(&variable.name) {
            variable.min = widen(variable.min, previous.min, f64::min);
            variable.max = widen(variable.max, previous.max, f64::max);
        }
    }
}

fn widen(a: Option<f64>, b: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}

/// Map the `_`-separated tokens of a file stem to named parameters.
///
/// `keys[i]` names token `i`; `None` keys and tokens beyond `keys` are
/// dropped. For example the stem
/// `papsim_wfdei.cru_hist_default_firr_whe_annual` with keys
/// `[agricultural_model, climate_model, None, harms, irrigation, variable, crop]`
/// yields six parameters.
pub fn parse_name_parameters(stem: &str, keys: &[Option<&str>]) -> Vec<Parameter> {
    stem.split('_')
        .zip(keys.iter())
        .filter_map(|(token, key)| key.map(|k| Parameter::new(k, token)))
        .collect()
}

/// Sorted union of two coordinate lists with duplicates removed.
pub fn merge_axis(existing: &[f64], incoming: &[f64]) -> Vec<f64> {
    let mut merged: Vec<f64> = existing.iter().chain(incoming).copied().collect();
    merged.sort_by(f64::total_cmp);
    merged.dedup();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::GridDataset;
    use atlas_common::{RawValue, VariableArray};
    use std::collections::BTreeMap;

    #[test]
    fn test_build_metadata() {
        let levels = DimensionDescriptor {
            name: "depth".into(),
            human_name: "Soil depth".into(),
            min: Some(0.0),
            max: Some(1.0),
            size: 2,
            unit: Some("m".into()),
        };
        let source = GridDataset::new("soil", vec![5.0, 6.0], vec![-1.0, 1.0, 3.0])
            .with_human_name("Soil")
            .with_dimension(levels)
            .with_parameters(vec![Parameter::new("source", "test")]);

        let mut variables = BTreeMap::new();
        let values = (0..12).map(|v| RawValue::Number(v as f64)).collect();
        variables.insert(
            "clay".to_string(),
            VariableArray::layered("clay", 2, 3, 2, values).unwrap(),
        );

        let meta = build_metadata(&source, &variables, 2);
        assert_eq!(meta.name, "soil");
        assert_eq!(meta.scale, 2);
        assert_eq!(meta.dimensions.len(), 3);
        assert_eq!(meta.dimensions[LON_DIMENSION].size, 3);
        assert_eq!(meta.dimensions[LON_DIMENSION].min, Some(-1.0));
        assert_eq!(meta.dimensions[LAT_DIMENSION].max, Some(6.0));

        let clay = meta.variable("clay").unwrap();
        assert_eq!(clay.dimensions, vec![LAT_DIMENSION, LON_DIMENSION, 2]);
        assert_eq!(clay.levels, Some(2));
        assert_eq!((clay.min, clay.max), (Some(0.0), Some(11.0)));
        assert_eq!(meta.parameter("source"), Some("test"));
    }

    #[test]
    fn test_parse_name_parameters() {
        let keys = [
            Some("agricultural_model"),
            Some("climate_model"),
            None,
            Some("harms"),
            Some("irrigation"),
            Some("variable"),
            Some("crop"),
        ];
        let params = parse_name_parameters(
            "papsim_wfdei.cru_hist_default_firr_whe_annual_1979_2012",
            &keys,
        );
        assert_eq!(params.len(), 6);
        assert_eq!(params[0], Parameter::new("agricultural_model", "papsim"));
        assert_eq!(params[1], Parameter::new("climate_model", "wfdei.cru"));
        assert_eq!(params[2], Parameter::new("harms", "default"));
        assert_eq!(params[5], Parameter::new("crop", "annual"));
    }

    #[test]
    fn test_merge_tile_metadata_widens_ranges() {
        let source = GridDataset::new("soil", vec![5.0, 6.0], vec![1.0, 2.0]);
        let mut variables = BTreeMap::new();
        let values = (0..4).map(|v| RawValue::Number(10.0 + v as f64)).collect();
        variables.insert(
            "clay".to_string(),
            VariableArray::scalar("clay", 2, 2, values).unwrap(),
        );

        let mut stored = build_metadata(&source, &variables, 3);
        stored.variables[0].min = Some(-4.0);
        stored.variables[0].max = Some(12.0);

        let mut meta = build_metadata(&source, &variables, 3);
        let lons = [0.0, 1.0, 2.0];
        let lats = [4.0, 5.0, 6.0, 7.0];
        merge_tile_metadata(&mut meta, Some(&stored), &lons, &lats);

        let lon = &meta.dimensions[LON_DIMENSION];
        assert_eq!((lon.size, lon.min, lon.max), (3, Some(0.0), Some(2.0)));
        let lat = &meta.dimensions[LAT_DIMENSION];
        assert_eq!((lat.size, lat.min, lat.max), (4, Some(4.0), Some(7.0)));
        assert_eq!(meta.lats.as_deref(), Some(&lats[..]));

        let clay = meta.variable("clay").unwrap();
        assert_eq!((clay.min, clay.max), (Some(-4.0), Some(13.0)));
    }

    #[test]
    fn test_merge_axis() {
        assert_eq!(
            merge_axis(&[3.0, 1.0], &[2.0, 3.0, 0.5]),
            vec![0.5, 1.0, 2.0, 3.0]
        );
    }
}
