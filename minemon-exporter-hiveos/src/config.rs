//! HiveOS rig configuration.
//!
//! Rig identity comes from the HiveOS agent's own config file, a flat
//! list of `KEY="value"` shell assignments at `/hive-config/rig.conf`.
//! Only the worker name is needed here; credential keys are dropped at
//! parse time so they can never leak into logs or labels.

use std::collections::BTreeMap;
use std::path::Path;

use minemon_common::ConfigError;
use tracing::debug;

/// Default location of the HiveOS agent configuration.
pub const DEFAULT_RIG_CONF: &str = "/hive-config/rig.conf";

/// Keys that are never read into memory.
const SENSITIVE_KEYS: &[&str] = &["RIG_PASSWD"];

/// Parsed view of a HiveOS `rig.conf`.
#[derive(Debug, Clone, Default)]
pub struct RigConfig {
    values: BTreeMap<String, String>,
}

impl RigConfig {
    /// Load and parse a rig configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading HiveOS configuration");
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Io(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::parse(&content))
    }

    /// Parse `KEY="value"` lines, skipping comments, malformed lines
    /// and sensitive keys.
    pub fn parse(content: &str) -> Self {
        let mut values = BTreeMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty()
                || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                || SENSITIVE_KEYS.contains(&key)
            {
                continue;
            }
            let value = value.trim().trim_matches('"');
            if value.is_empty() {
                continue;
            }
            values.insert(key.to_string(), value.to_string());
        }

        Self { values }
    }

    /// Look up a configuration value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The rig's worker name, required for every metric label.
    pub fn worker_name(&self) -> Result<&str, ConfigError> {
        self.get("WORKER_NAME").ok_or_else(|| {
            ConfigError::Validation("rig configuration is missing WORKER_NAME".to_string())
        })
    }
}
