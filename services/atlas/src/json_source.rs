//! Grid data source backed by a JSON file.
//!
//! ```json
//! {
//!   "name": "gsde",
//!   "human_name": "Global Soil Dataset",
//!   "lats": [0.0, 0.5],
//!   "lons": [10.0, 10.5, 11.0],
//!   "variables": {
//!     "clay": { "unit": "%", "values": [[1.0, null, 3.0], [4.0, 5.0, 6.0]] },
//!     "sand": { "levels": 2, "values": [[[1, 2], [3, null], null], [[1, 2], [3, 4], [5, 6]]] }
//!   }
//! }
//! ```
//!
//! `null` marks a masked cell or level. Values are addressed `[lat][lon]`
//! or `[lat][lon][level]`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use atlas_common::{DimensionDescriptor, RawValue, VariableArray};
use ingestion::{parse_name_parameters, GridDataset};

#[derive(Debug, Deserialize)]
struct GridFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    human_name: Option<String>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    variables: BTreeMap<String, VariableFile>,
    #[serde(default)]
    dimensions: Vec<DimensionDescriptor>,
    #[serde(default)]
    excluded_variables: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VariableFile {
    #[serde(default)]
    levels: Option<usize>,
    #[serde(default)]
    unit: Option<String>,
    values: Vec<Vec<CellFile>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ElementFile {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellFile {
    Levels(Vec<Option<ElementFile>>),
    Single(Option<ElementFile>),
}

fn raw(element: &Option<ElementFile>) -> RawValue {
    match element {
        Some(ElementFile::Number(v)) => RawValue::Number(*v),
        Some(ElementFile::Text(s)) => RawValue::Text(s.clone()),
        None => RawValue::Masked,
    }
}

/// Options applied while loading a grid file.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Overrides the name in the file and the file stem.
    pub name: Option<String>,
    /// Positional parameter names for the `_`-separated file stem.
    pub name_keys: Vec<Option<String>>,
}

/// Load a grid file into an in-memory dataset.
pub fn load_grid(path: &Path, options: &LoadOptions) -> Result<GridDataset> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read grid file {}", path.display()))?;
    let file: GridFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse grid file {}", path.display()))?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let keys: Vec<Option<&str>> = options.name_keys.iter().map(|k| k.as_deref()).collect();
    let parameters = parse_name_parameters(&stem, &keys);

    let name = options
        .name
        .clone()
        .or_else(|| file.name.clone())
        .unwrap_or_else(|| stem.clone());
    let human_name = file.human_name.clone().unwrap_or_else(|| {
        if parameters.is_empty() {
            name.clone()
        } else {
            parameters
                .iter()
                .map(|p| p.value.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        }
    });

    let (n_lat, n_lon) = (file.lats.len(), file.lons.len());
    let mut dataset = GridDataset::new(name, file.lats, file.lons)
        .with_human_name(human_name)
        .with_parameters(parameters);

    for dimension in file.dimensions {
        dataset = dataset.with_dimension(dimension);
    }
    for variable in file.excluded_variables {
        dataset = dataset.excluding(variable);
    }

    for (name, variable) in file.variables {
        if let Some(unit) = &variable.unit {
            dataset.units.insert(name.clone(), unit.clone());
        }
        let array = variable_array(&name, n_lat, n_lon, variable)?;
        dataset = dataset.with_variable(array);
    }

    Ok(dataset)
}

fn variable_array(name: &str, n_lat: usize, n_lon: usize, file: VariableFile) -> Result<VariableArray> {
    if file.values.len() != n_lat {
        bail!("Variable '{}' has {} rows, expected {}", name, file.values.len(), n_lat);
    }

    let levels = file.levels.or_else(|| {
        file.values.iter().flatten().find_map(|cell| match cell {
            CellFile::Levels(levels) => Some(levels.len()),
            CellFile::Single(_) => None,
        })
    });

    let mut values = Vec::with_capacity(n_lat * n_lon * levels.unwrap_or(1));
    for (lat_index, row) in file.values.iter().enumerate() {
        if row.len() != n_lon {
            bail!(
                "Variable '{}' row {} has {} cells, expected {}",
                name,
                lat_index,
                row.len(),
                n_lon
            );
        }
        for cell in row {
            match (levels, cell) {
                (None, CellFile::Single(element)) => values.push(raw(element)),
                (Some(n), CellFile::Levels(elements)) if elements.len() == n => {
                    values.extend(elements.iter().map(raw));
                }
                (Some(n), CellFile::Single(None)) => {
                    values.extend(std::iter::repeat(RawValue::Masked).take(n));
                }
                _ => bail!(
                    "Variable '{}' row {} has a cell that does not match {} levels",
                    name,
                    lat_index,
                    levels.unwrap_or(1)
                ),
            }
        }
    }

    let array = match levels {
        Some(n) => VariableArray::layered(name, n_lat, n_lon, n, values)?,
        None => VariableArray::scalar(name, n_lat, n_lon, values)?,
    };
    Ok(array)
}

/// Parse a comma-separated key list; empty entries skip a token.
pub fn parse_name_keys(s: &str) -> Vec<Option<String>> {
    s.split(',')
        .map(str::trim)
        .map(|k| (!k.is_empty()).then(|| k.to_string()))
        .collect()
}
