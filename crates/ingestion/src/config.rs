//! Ingestion configuration.

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// Documents per bulk write.
pub const DEFAULT_BATCH_SIZE: usize = 800;

/// Default fixed-point exponent.
pub const DEFAULT_SCALE: u32 = 3;

/// Largest exponent whose scaled values still carry integer precision in an f64.
pub const MAX_SCALE: u32 = 15;

/// Tunables for an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Fixed-point exponent; must be the same for every call on a dataset
    #[serde(default = "default_scale")]
    pub scale: u32,

    /// Parallel workers; `None` uses every available core
    #[serde(default)]
    pub workers: Option<usize>,

    /// Documents per bulk write
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Variables never ingested, in addition to any a source excludes itself
    #[serde(default)]
    pub excluded_variables: Vec<String>,
}

fn default_scale() -> u32 {
    DEFAULT_SCALE
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            workers: None,
            batch_size: DEFAULT_BATCH_SIZE,
            excluded_variables: Vec::new(),
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values are ignored and the default kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ATLAS_SCALE") {
            if let Ok(scale) = val.parse() {
                config.scale = scale;
            }
        }

        if let Ok(val) = std::env::var("ATLAS_WORKERS") {
            if let Ok(workers) = val.parse() {
                config.workers = Some(workers);
            }
        }

        if let Ok(val) = std::env::var("ATLAS_BATCH_SIZE") {
            if let Ok(size) = val.parse() {
                config.batch_size = size;
            }
        }

        if let Ok(val) = std::env::var("ATLAS_EXCLUDED_VARIABLES") {
            config.excluded_variables = val
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();
        }

        config
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Number of workers a parallel run fans out to.
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    pub fn is_excluded(&self, variable: &str) -> bool {
        self.excluded_variables.iter().any(|v| v == variable)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestionError::InvalidConfig(
                "batch_size must be > 0".to_string(),
            ));
        }
        if self.scale > MAX_SCALE {
            return Err(IngestionError::InvalidConfig(format!(
                "scale must be <= {}",
                MAX_SCALE
            )));
        }
        if self.workers == Some(0) {
            return Err(IngestionError::InvalidConfig(
                "workers must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.batch_size, 800);
        assert!(config.resolved_workers() >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(IngestConfig::default().with_batch_size(0).validate().is_err());
        assert!(IngestConfig::default().with_workers(0).validate().is_err());
        assert!(IngestConfig::default().with_scale(16).validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: IngestConfig = serde_json::from_str(r#"{"workers": 4}"#).unwrap();
        assert_eq!(config.workers, Some(4));
        assert_eq!(config.scale, DEFAULT_SCALE);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }
}
