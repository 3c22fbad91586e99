//! Atlas configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use grid_query::ResampleConfig;
use ingestion::IngestConfig;
use storage::StoreConfig;

/// Top-level configuration, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Geospatial store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Ingestion tunables
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Resampling defaults
    #[serde(default)]
    pub resample: ResampleConfig,
}

impl AtlasConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            store: StoreConfig::from_env()?,
            ingest: IngestConfig::from_env(),
            resample: ResampleConfig::from_env(),
        })
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.ingest.validate()?;
        self.resample.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use storage::StoreBackend;

    #[test]
    fn test_from_yaml_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "store:\n  backend: postgres\n  database_url: postgresql://db/atlas\ningest:\n  scale: 2\n  workers: 4\nresample:\n  k: 5"
        )
        .unwrap();

        let config = AtlasConfig::from_yaml(file.path()).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.store.database_url, "postgresql://db/atlas");
        assert_eq!(config.ingest.scale, 2);
        assert_eq!(config.ingest.workers, Some(4));
        assert_eq!(config.ingest.batch_size, 800);
        assert_eq!(config.resample.k, 5);
        assert_eq!(config.resample.max_distance, 1000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AtlasConfig::from_yaml("/nonexistent/atlas.yaml").is_err());
    }
}
