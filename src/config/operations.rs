//! Config loading, validation, and serialization.

use super::model::Config;
use crate::error::{FleetError, Result};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            FleetError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config, falling back to defaults when the file is absent.
    ///
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| FleetError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| FleetError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values.
    ///
    /// - `txn_max_attempts` must be positive
    /// - `lock_stale_minutes` must be positive
    /// - `max_active_branches` must be positive
    pub fn validate(&self) -> Result<()> {
        if self.txn_max_attempts == 0 {
            return Err(FleetError::UserError(
                "config validation failed: txn_max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.lock_stale_minutes == 0 {
            return Err(FleetError::UserError(
                "config validation failed: lock_stale_minutes must be greater than 0".to_string(),
            ));
        }

        if self.max_active_branches == 0 {
            return Err(FleetError::UserError(
                "config validation failed: max_active_branches must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The pause between transaction attempts.
    pub fn txn_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.txn_retry_backoff_ms)
    }
}
