//! Pool instance configuration.
//!
//! The configuration file is a YAML map from pool identifier to the list
//! of monitored account instances:
//!
//! ```yaml
//! hiveon:
//!   - wallet: "0xabc123"
//!     coin: ETH
//! suprnova:
//!   - api_key: "secret"
//!     coin: BTG
//!     refresh_interval: 120
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use minemon_common::config::{self, ConfigError};

/// One monitored pool account.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolInstanceConfig {
    /// Wallet address, for pools keyed by wallet.
    pub wallet: Option<String>,

    /// API key, for pools keyed by key.
    pub api_key: Option<String>,

    /// Coin ticker, e.g. "ETH".
    pub coin: String,

    /// Refresh cadence in seconds. Falls back to the exporter-wide
    /// default when omitted.
    pub refresh_interval: Option<u64>,

    /// Override of the provider base URL. Mainly for mirrors and tests.
    pub endpoint: Option<String>,

    /// Skip TLS certificate verification for this instance.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// The full pool configuration: pool identifier to monitored instances.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolsConfig {
    #[serde(flatten)]
    pub pools: BTreeMap<String, Vec<PoolInstanceConfig>>,
}

impl PoolsConfig {
    /// Load the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = config::load_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the configuration from a YAML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = config::parse_yaml(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// A configuration without a single instance is rejected; an exporter
    /// with nothing to monitor is a deployment mistake.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pools.values().all(|instances| instances.is_empty()) {
            return Err(ConfigError::Validation(
                "no pools are configured for monitoring".to_string(),
            ));
        }
        Ok(())
    }

    /// Total number of configured instances.
    pub fn instance_count(&self) -> usize {
        self.pools.values().map(|instances| instances.len()).sum()
    }
}
