//! Grid data source collaborator.
//!
//! A source supplies ordered latitudes and longitudes, the variable arrays
//! addressable as `[lat][lon]` or `[lat][lon][level]`, and the descriptive
//! fields that end up in the dataset metadata record. File parsing and
//! axis reordering happen behind this trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use atlas_common::{DimensionDescriptor, Parameter, VariableArray};

use crate::config::IngestConfig;
use crate::error::{IngestionError, Result};

/// Variables of one ingestion call, shared read-only by every worker.
pub type VariableMap = BTreeMap<String, VariableArray>;

/// Something that can hand a gridded dataset to the coordinator.
pub trait GridSource: Send + Sync {
    /// Slugified, machine-readable dataset name.
    fn name(&self) -> &str;

    fn human_name(&self) -> &str;

    fn latitudes(&self) -> &[f64];

    fn longitudes(&self) -> &[f64];

    /// Every variable the source holds, before exclusions.
    fn variable_names(&self) -> Vec<String>;

    /// Read one variable, already ordered latitude-first.
    fn variable(&self, name: &str) -> Result<VariableArray>;

    /// Dimensions other than longitude and latitude.
    fn dimensions(&self) -> Vec<DimensionDescriptor> {
        Vec::new()
    }

    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }

    /// Variables this source never wants ingested.
    fn excluded_variables(&self) -> Vec<String> {
        Vec::new()
    }

    fn unit(&self, _variable: &str) -> Option<String> {
        None
    }
}

/// Read every non-excluded variable of `source`.
pub fn load_variables(source: &dyn GridSource, config: &IngestConfig) -> Result<Arc<VariableMap>> {
    let excluded = source.excluded_variables();
    let mut variables = VariableMap::new();

    for name in source.variable_names() {
        if config.is_excluded(&name) || excluded.iter().any(|e| e == &name) {
            continue;
        }
        let array = source.variable(&name)?;
        let expected = (source.latitudes().len(), source.longitudes().len());
        if array.shape() != expected {
            return Err(IngestionError::Source(format!(
                "Variable '{}' has shape {:?}, grid is {:?}",
                name,
                array.shape(),
                expected
            )));
        }
        variables.insert(name, array);
    }

    Ok(Arc::new(variables))
}

/// A fully materialised grid held in memory.
#[derive(Debug, Clone, Default)]
pub struct GridDataset {
    pub name: String,
    pub human_name: String,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub variables: BTreeMap<String, VariableArray>,
    pub dimensions: Vec<DimensionDescriptor>,
    pub parameters: Vec<Parameter>,
    pub excluded: Vec<String>,
    pub units: BTreeMap<String, String>,
}

impl GridDataset {
    pub fn new(name: impl Into<String>, lats: Vec<f64>, lons: Vec<f64>) -> Self {
        let name = name.into();
        Self {
            human_name: name.clone(),
            name,
            lats,
            lons,
            ..Default::default()
        }
    }

    pub fn with_human_name(mut self, human_name: impl Into<String>) -> Self {
        self.human_name = human_name.into();
        self
    }

    pub fn with_variable(mut self, array: VariableArray) -> Self {
        self.variables.insert(array.name().to_string(), array);
        self
    }

    pub fn with_dimension(mut self, dimension: DimensionDescriptor) -> Self {
        self.dimensions.push(dimension);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn excluding(mut self, variable: impl Into<String>) -> Self {
        self.excluded.push(variable.into());
        self
    }
}

impl GridSource for GridDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn human_name(&self) -> &str {
        &self.human_name
    }

    fn latitudes(&self) -> &[f64] {
        &self.lats
    }

    fn longitudes(&self) -> &[f64] {
        &self.lons
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    fn variable(&self, name: &str) -> Result<VariableArray> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| IngestionError::Source(format!("No variable '{}'", name)))
    }

    fn dimensions(&self) -> Vec<DimensionDescriptor> {
        self.dimensions.clone()
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.parameters.clone()
    }

    fn excluded_variables(&self) -> Vec<String> {
        self.excluded.clone()
    }

    fn unit(&self, variable: &str) -> Option<String> {
        self.units.get(variable).cloned()
    }
}
