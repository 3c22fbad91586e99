//! Dataset metadata record, one per ingested dataset name.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptor of one dimension of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDescriptor {
    pub name: String,
    pub human_name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub size: usize,
    pub unit: Option<String>,
}

/// Descriptor of one variable of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub name: String,
    pub human_name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: Option<String>,
    /// Indices into [`DatasetMetadata::dimensions`] this variable varies over.
    pub dimensions: Vec<usize>,
    /// Size of the level dimension, if the variable has one.
    pub levels: Option<usize>,
}

/// A free-form name/value parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Metadata for one ingested dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub name: String,
    pub human_name: String,
    pub created_at: DateTime<Utc>,
    pub inserted_at: DateTime<Utc>,
    /// Fixed-point exponent shared by every document of the dataset.
    pub scale: u32,
    pub dimensions: Vec<DimensionDescriptor>,
    pub variables: Vec<VariableDescriptor>,
    pub parameters: Vec<Parameter>,
    /// Distinct longitudes seen so far (multi-tile datasets).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lons: Option<Vec<f64>>,
    /// Distinct latitudes seen so far (multi-tile datasets).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lats: Option<Vec<f64>>,
}

impl DatasetMetadata {
    pub fn new(name: impl Into<String>, human_name: impl Into<String>, scale: u32) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            human_name: human_name.into(),
            created_at: now,
            inserted_at: now,
            scale,
            dimensions: Vec::new(),
            variables: Vec::new(),
            parameters: Vec::new(),
            lons: None,
            lats: None,
        }
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_names(&self) -> BTreeSet<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}
