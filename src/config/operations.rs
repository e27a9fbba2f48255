//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{DistLockError, Result};
use crate::locks::{WaitPolicy, default_process_id};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(DistLockError::Config)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            DistLockError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path` if it exists, otherwise fall back to defaults.
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                DistLockError::Config(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            DistLockError::Config(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `ping_interval_ms` must be positive
    /// - `lock_retry_interval_ms` must be positive
    /// - `ping_stale_minutes` must be positive
    /// - `process_id`, when set, must not be blank
    pub fn validate(&self) -> Result<()> {
        if self.ping_interval_ms == 0 {
            return Err(DistLockError::Config(
                "config validation failed: ping_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.lock_retry_interval_ms == 0 {
            return Err(DistLockError::Config(
                "config validation failed: lock_retry_interval_ms must be greater than 0"
                    .to_string(),
            ));
        }

        if self.ping_stale_minutes == 0 {
            return Err(DistLockError::Config(
                "config validation failed: ping_stale_minutes must be greater than 0".to_string(),
            ));
        }

        if let Some(id) = &self.process_id
            && id.trim().is_empty()
        {
            return Err(DistLockError::Config(
                "config validation failed: process_id must not be blank".to_string(),
            ));
        }

        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.lock_retry_interval_ms)
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::from_millis(self.lock_wait_ms)
    }

    /// The configured process identity, or the derived `user@host:pid`.
    pub fn resolved_process_id(&self) -> String {
        self.process_id.clone().unwrap_or_else(default_process_id)
    }
}
