//! String-keyed construction of pool adapters from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::adapter::PoolAdapter;
use crate::cache::ResponseCache;
use crate::client::{ApiClient, HttpSettings};
use crate::config::{PoolInstanceConfig, PoolsConfig};
use crate::error::{PoolError, Result};
use crate::hiveon::Hiveon;
use crate::suprnova::Suprnova;

/// Build one adapter from its pool identifier and instance configuration.
///
/// `hiveon` instances need a wallet, `suprnova` instances an API key;
/// anything missing is a configuration error, reported before the
/// exporter starts serving.
pub fn build_adapter(
    pool_id: &str,
    instance: &PoolInstanceConfig,
    cache: Arc<ResponseCache>,
) -> Result<Box<dyn PoolAdapter>> {
    if instance.coin.trim().is_empty() {
        return Err(PoolError::Config(format!(
            "{} instance has an empty 'coin'",
            pool_id
        )));
    }

    let settings = HttpSettings {
        accept_invalid_certs: instance.accept_invalid_certs,
        ..HttpSettings::default()
    };
    let client = ApiClient::new(cache, &settings)?;

    match pool_id {
        "hiveon" => {
            let wallet = instance.wallet.as_deref().filter(|w| !w.trim().is_empty());
            let wallet = wallet.ok_or_else(|| {
                PoolError::Config(format!(
                    "hiveon instance for coin '{}' is missing 'wallet'",
                    instance.coin
                ))
            })?;
            Ok(Box::new(Hiveon::new(
                wallet,
                &instance.coin,
                instance.endpoint.as_deref(),
                client,
            )?))
        }
        "suprnova" => {
            let api_key = instance.api_key.as_deref().filter(|k| !k.trim().is_empty());
            let api_key = api_key.ok_or_else(|| {
                PoolError::Config(format!(
                    "suprnova instance for coin '{}' is missing 'api_key'",
                    instance.coin
                ))
            })?;
            Ok(Box::new(Suprnova::new(
                api_key,
                &instance.coin,
                instance.endpoint.as_deref(),
                client,
            )))
        }
        other => Err(PoolError::Config(format!(
            "Unsupported pool type: {}",
            other
        ))),
    }
}

/// Build every adapter in the configuration, sharing one response cache.
///
/// Instances without a refresh interval get `default_refresh`. The
/// cadence is recorded for operators; collection itself is driven by
/// scrapes, with the response cache bounding the upstream request rate.
pub fn build_adapters(
    config: &PoolsConfig,
    cache: Arc<ResponseCache>,
    default_refresh: Duration,
) -> Result<Vec<Box<dyn PoolAdapter>>> {
    let mut adapters = Vec::with_capacity(config.instance_count());

    for (pool_id, instances) in &config.pools {
        for instance in instances {
            let adapter = build_adapter(pool_id, instance, cache.clone())?;
            let refresh = instance
                .refresh_interval
                .map(Duration::from_secs)
                .unwrap_or(default_refresh);
            info!(
                pool = %adapter.pool_name(),
                coin = %adapter.coin(),
                refresh_secs = refresh.as_secs(),
                "Configured pool instance"
            );
            adapters.push(adapter);
        }
    }

    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cache() -> Arc<ResponseCache> {
        Arc::new(ResponseCache::default())
    }

    fn instance(wallet: Option<&str>, api_key: Option<&str>) -> PoolInstanceConfig {
        PoolInstanceConfig {
            wallet: wallet.map(str::to_string),
            api_key: api_key.map(str::to_string),
            coin: "ETH".to_string(),
            refresh_interval: None,
            endpoint: None,
            accept_invalid_certs: false,
        }
    }

    #[test]
    fn test_build_hiveon_adapter() {
        let adapter = build_adapter("hiveon", &instance(Some("0xabc"), None), make_cache()).unwrap();

        assert_eq!(adapter.pool_name(), "hiveon.net");
        assert_eq!(adapter.coin(), "ETH");
    }

    #[test]
    fn test_build_suprnova_adapter() {
        let adapter =
            build_adapter("suprnova", &instance(None, Some("secret")), make_cache()).unwrap();

        assert_eq!(adapter.pool_name(), "suprnova.cc");
    }

    #[test]
    fn test_hiveon_without_wallet_is_config_error() {
        let err = build_adapter("hiveon", &instance(None, None), make_cache()).unwrap_err();

        assert!(matches!(err, PoolError::Config(_)));
        assert!(err.to_string().contains("wallet"));
    }

    #[test]
    fn test_empty_wallet_is_config_error() {
        let err = build_adapter("hiveon", &instance(Some(""), None), make_cache()).unwrap_err();

        assert!(matches!(err, PoolError::Config(_)));
    }

    #[test]
    fn test_whitespace_wallet_is_config_error() {
        let err = build_adapter("hiveon", &instance(Some("   "), None), make_cache()).unwrap_err();

        assert!(matches!(err, PoolError::Config(_)));
    }

    // A wallet of just the hex prefix normalizes to the empty string and
    // must be rejected like a missing one.
    #[test]
    fn test_prefix_only_wallet_is_config_error() {
        let err = build_adapter("hiveon", &instance(Some("0x"), None), make_cache()).unwrap_err();

        assert!(matches!(err, PoolError::Config(_)));
    }

    #[test]
    fn test_whitespace_api_key_is_config_error() {
        let err = build_adapter("suprnova", &instance(None, Some("  ")), make_cache()).unwrap_err();

        assert!(matches!(err, PoolError::Config(_)));
    }

    #[test]
    fn test_empty_coin_is_config_error() {
        let mut config = instance(Some("abc"), None);
        config.coin = String::new();

        let err = build_adapter("hiveon", &config, make_cache()).unwrap_err();

        assert!(matches!(err, PoolError::Config(_)));
        assert!(err.to_string().contains("coin"));
    }

    #[test]
    fn test_suprnova_without_api_key_is_config_error() {
        let err = build_adapter("suprnova", &instance(None, None), make_cache()).unwrap_err();

        assert!(matches!(err, PoolError::Config(_)));
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_unknown_pool_id_is_config_error() {
        let err = build_adapter("ethermine", &instance(Some("abc"), None), make_cache())
            .unwrap_err();

        assert!(err.to_string().contains("Unsupported pool type"));
    }

    #[test]
    fn test_build_adapters_from_config() {
        let config = PoolsConfig::parse(
            r#"
hiveon:
  - wallet: "abc"
    coin: ETH
suprnova:
  - api_key: "secret"
    coin: BTG
"#,
        )
        .unwrap();

        let adapters =
            build_adapters(&config, make_cache(), Duration::from_secs(55)).unwrap();

        assert_eq!(adapters.len(), 2);
        // BTreeMap ordering puts hiveon before suprnova
        assert_eq!(adapters[0].pool_name(), "hiveon.net");
        assert_eq!(adapters[1].pool_name(), "suprnova.cc");
    }

    #[test]
    fn test_build_adapters_fails_on_first_bad_instance() {
        let config = PoolsConfig::parse(
            r#"
hiveon:
  - coin: ETH
"#,
        )
        .unwrap();

        let result = build_adapters(&config, make_cache(), Duration::from_secs(55));

        assert!(result.is_err());
    }
}
