//! Configuration for IDW resampling.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

/// Neighbours considered per query point.
pub const DEFAULT_K: usize = 10;

/// Search radius in meters.
pub const DEFAULT_MAX_DISTANCE: f64 = 1000.0;

/// Decay constant of the exponential weight, per meter.
pub const DEFAULT_DECAY: f64 = 0.002;

/// Configuration for resampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Maximum neighbours per query point.
    pub k: usize,

    /// Neighbours further than this many meters are ignored.
    pub max_distance: f64,

    /// Weight of a neighbour at distance `d` is `exp(-decay * d)`.
    pub decay: f64,

    /// Query points resolved concurrently.
    pub concurrency: usize,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            max_distance: DEFAULT_MAX_DISTANCE,
            decay: DEFAULT_DECAY,
            concurrency: 8,
        }
    }
}

impl ResampleConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ATLAS_RESAMPLE_K") {
            if let Ok(k) = val.parse() {
                config.k = k;
            }
        }

        if let Ok(val) = std::env::var("ATLAS_MAX_DISTANCE") {
            if let Ok(distance) = val.parse() {
                config.max_distance = distance;
            }
        }

        if let Ok(val) = std::env::var("ATLAS_DECAY") {
            if let Ok(decay) = val.parse() {
                config.decay = decay;
            }
        }

        if let Ok(val) = std::env::var("ATLAS_QUERY_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                config.concurrency = n;
            }
        }

        config
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(QueryError::ConfigError("k must be > 0".to_string()));
        }

        if !self.max_distance.is_finite() || self.max_distance < 0.0 {
            return Err(QueryError::ConfigError(
                "max_distance must be a finite non-negative number".to_string(),
            ));
        }

        if !self.decay.is_finite() || self.decay < 0.0 {
            return Err(QueryError::ConfigError(
                "decay must be a finite non-negative number".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(QueryError::ConfigError(
                "concurrency must be > 0".to_string(),
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
        let config = ResampleConfig::default();
        assert_eq!(config.k, 10);
        assert_eq!(config.max_distance, 1000.0);
        assert_eq!(config.decay, 0.002);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ResampleConfig::default().with_k(0).validate().is_err());
        assert!(ResampleConfig::default()
            .with_max_distance(-1.0)
            .validate()
            .is_err());
        let config = ResampleConfig {
            decay: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: ResampleConfig = serde_json::from_str(r#"{"k": 3}"#).unwrap();
        assert_eq!(config.k, 3);
        assert_eq!(config.max_distance, DEFAULT_MAX_DISTANCE);
    }
}
