//! Engine configuration
//!
//! Every field has a default, so an empty JSON object is a valid config file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Minimum fuzzy score for a phase-two match
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.76;

/// Mapping key read from candidate models by the selector
pub const DEFAULT_SYSTEM_CODE: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub fuzzy_threshold: f64,
    pub system_code: String,
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            system_code: DEFAULT_SYSTEM_CODE.to_string(),
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load a config from a JSON file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let config: EngineConfig = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.fuzzy_threshold)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if self.cache.capacity == 0 {
            return Err(Error::InvalidConfig("cache capacity must be positive".to_string()));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(Error::InvalidConfig("sweep interval must be positive".to_string()));
        }
        Ok(())
    }
}

/// Reject thresholds outside [0, 1] (and NaN)
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(Error::InvalidOption(format!(
            "fuzzy threshold must be within [0, 1], got {}",
            threshold
        )))
    }
}

/// Memoization tiers: entry capacity and time-to-live per artifact kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub parsed_ttl_secs: u64,
    pub flattened_ttl_secs: u64,
    pub hints_ttl_secs: u64,
    pub comparison_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            parsed_ttl_secs: 3600,
            flattened_ttl_secs: 600,
            hints_ttl_secs: 86_400,
            comparison_ttl_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

impl CacheConfig {
    pub fn parsed_ttl(&self) -> Duration {
        Duration::from_secs(self.parsed_ttl_secs)
    }

    pub fn flattened_ttl(&self) -> Duration {
        Duration::from_secs(self.flattened_ttl_secs)
    }

    pub fn hints_ttl(&self) -> Duration {
        Duration::from_secs(self.hints_ttl_secs)
    }

    pub fn comparison_ttl(&self) -> Duration {
        Duration::from_secs(self.comparison_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.fuzzy_threshold, 0.76);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"fuzzy_threshold": 0.8, "cache": {"capacity": 16}}"#).unwrap();
        assert_eq!(config.fuzzy_threshold, 0.8);
        assert_eq!(config.cache.capacity, 16);
        assert_eq!(config.cache.flattened_ttl_secs, 600);
        assert_eq!(config.system_code, "default");
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(validate_threshold(1.2).is_err());
        assert!(validate_threshold(-0.1).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
        assert!(validate_threshold(0.0).is_ok());

        let config = EngineConfig {
            fuzzy_threshold: 2.0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = EngineConfig::default();
        config.cache.capacity = 0;
        assert!(config.validate().is_err());
    }
}
