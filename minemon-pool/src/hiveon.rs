//! Adapter for the Hiveon pool API.
//!
//! Everything hangs off one per-account base path,
//! `/api/v1/stats/miner/{wallet}/{coin}`: the bare path serves account
//! stats, `/workers` the per-worker breakdown and `/billing-acc` the
//! money flows. All endpoints are unauthenticated JSON.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use minemon_common::MetricSample;

use crate::adapter::{PoolAdapter, RatioKind};
use crate::client::{ApiClient, decode};
use crate::error::{PoolError, Result};

/// The `pool` label value for this adapter.
pub const POOL_NAME: &str = "hiveon.net";

const DEFAULT_ORIGIN: &str = "https://hiveon.net";

/// Timestamp format of share statistics and earnings.
const SHARE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
/// Payout timestamps additionally carry fractional seconds.
const PAYOUT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Hiveon account adapter. Accounts are identified by wallet address;
/// there is no API key.
#[derive(Debug)]
pub struct Hiveon {
    wallet: String,
    coin: String,
    base_url: String,
    client: ApiClient,
}

impl Hiveon {
    /// Build an adapter for one account.
    ///
    /// The wallet loses any leading `0x` and is lowercased; the coin is
    /// uppercased. A wallet with nothing left after normalization is a
    /// configuration error. `endpoint` overrides the
    /// `https://hiveon.net` origin.
    pub fn new(
        wallet: &str,
        coin: &str,
        endpoint: Option<&str>,
        client: ApiClient,
    ) -> Result<Self> {
        let normalized = wallet.strip_prefix("0x").unwrap_or(wallet).to_lowercase();
        if normalized.trim().is_empty() {
            return Err(PoolError::Config(format!(
                "hiveon wallet '{}' is empty after normalization",
                wallet
            )));
        }
        let coin = coin.to_uppercase();
        let origin = endpoint.unwrap_or(DEFAULT_ORIGIN).trim_end_matches('/');
        let base_url = format!("{}/api/v1/stats/miner/{}/{}", origin, normalized, coin);

        Ok(Self {
            wallet: normalized,
            coin,
            base_url,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let body = self.client.call(&url).await?;
        decode(&url, body)
    }
}

#[derive(Debug, Deserialize)]
struct HashrateStats {
    hashrate: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountShares {
    shares_status_stats: ShareStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShareStats {
    valid_count: f64,
    stale_count: f64,
    last_share_dt: String,
}

#[derive(Debug, Deserialize)]
struct WorkerList {
    workers: HashMap<String, WorkerStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkerStats {
    hashrate: Option<f64>,
    shares_status_stats: Option<ShareStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Balance {
    total_unpaid: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EarningHistory {
    earning_stats: Vec<Earning>,
}

#[derive(Debug, Deserialize)]
struct Earning {
    reward: f64,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayoutHistory {
    succeed_payouts: Option<Vec<Payout>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payout {
    amount: f64,
    created_at: String,
}

#[async_trait]
impl PoolAdapter for Hiveon {
    fn pool_name(&self) -> &str {
        POOL_NAME
    }

    fn coin(&self) -> &str {
        &self.coin
    }

    async fn wallet(&self) -> Result<String> {
        Ok(self.wallet.clone())
    }

    async fn hashrate(&self) -> Result<MetricSample> {
        let stats: HashrateStats = self.fetch("").await?;
        Ok(MetricSample::new(stats.hashrate))
    }

    async fn balance(&self) -> Result<MetricSample> {
        let billing: Balance = self.fetch("/billing-acc").await?;
        Ok(MetricSample::new(billing.total_unpaid))
    }

    async fn ratios(&self) -> Result<Vec<(RatioKind, MetricSample)>> {
        let url = self.url("");
        let account: AccountShares = self.fetch("").await?;
        let shares = account.shares_status_stats;
        let timestamp = parse_epoch(&shares.last_share_dt, SHARE_TIME_FORMAT, &url)?;

        Ok(vec![
            (
                RatioKind::Accepted,
                MetricSample::at(shares.valid_count, timestamp),
            ),
            (
                RatioKind::Rejected,
                MetricSample::at(shares.stale_count, timestamp),
            ),
        ])
    }

    async fn worker_hashrates(&self) -> Result<Vec<(String, MetricSample)>> {
        let list: WorkerList = self.fetch("/workers").await?;

        // Workers that have not submitted recently may omit the hashrate
        // field; they still exist and report 0.
        Ok(list
            .workers
            .into_iter()
            .map(|(name, info)| (name, MetricSample::new(info.hashrate.unwrap_or(0.0))))
            .collect())
    }

    async fn worker_ratios(&self) -> Result<Vec<(String, RatioKind, MetricSample)>> {
        let url = self.url("/workers");
        let list: WorkerList = self.fetch("/workers").await?;

        let mut out = Vec::with_capacity(list.workers.len() * 2);
        for (name, info) in list.workers {
            let shares = info
                .shares_status_stats
                .ok_or_else(|| PoolError::ResponseFormat {
                    url: url.clone(),
                    reason: format!("worker '{}' has no share statistics", name),
                })?;
            let timestamp = parse_epoch(&shares.last_share_dt, SHARE_TIME_FORMAT, &url)?;

            out.push((
                name.clone(),
                RatioKind::Accepted,
                MetricSample::at(shares.valid_count, timestamp),
            ));
            out.push((
                name,
                RatioKind::Rejected,
                MetricSample::at(shares.stale_count, timestamp),
            ));
        }
        Ok(out)
    }

    async fn rewards(&self) -> Result<Vec<MetricSample>> {
        let url = self.url("/billing-acc");
        let history: EarningHistory = self.fetch("/billing-acc").await?;

        history
            .earning_stats
            .iter()
            .map(|earned| {
                let timestamp = parse_epoch(&earned.timestamp, SHARE_TIME_FORMAT, &url)?;
                Ok(MetricSample::at(earned.reward, timestamp))
            })
            .collect()
    }

    async fn payouts(&self) -> Result<Vec<MetricSample>> {
        let url = self.url("/billing-acc");
        let history: PayoutHistory = self.fetch("/billing-acc").await?;

        // The API reports null instead of an empty list for accounts
        // that were never paid out.
        match history.succeed_payouts {
            Some(payouts) => payouts
                .iter()
                .map(|payout| {
                    let timestamp = parse_epoch(&payout.created_at, PAYOUT_TIME_FORMAT, &url)?;
                    Ok(MetricSample::at(payout.amount, timestamp))
                })
                .collect(),
            None => Ok(Vec::new()),
        }
    }
}

/// Convert an upstream timestamp to epoch seconds. The `Z` suffix in
/// both formats pins the input to UTC.
fn parse_epoch(raw: &str, format: &str, url: &str) -> Result<f64> {
    match NaiveDateTime::parse_from_str(raw, format) {
        Ok(parsed) => Ok(parsed.and_utc().timestamp_micros() as f64 / 1_000_000.0),
        Err(e) => Err(PoolError::ResponseFormat {
            url: url.to_string(),
            reason: format!("bad timestamp '{}': {}", raw, e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::client::HttpSettings;
    use std::sync::Arc;

    fn make_client() -> ApiClient {
        ApiClient::new(Arc::new(ResponseCache::default()), &HttpSettings::default()).unwrap()
    }

    #[test]
    fn test_wallet_and_coin_normalization() {
        let adapter = Hiveon::new("0xAbC123", "eth", None, make_client()).unwrap();

        assert_eq!(adapter.wallet, "abc123");
        assert_eq!(adapter.coin, "ETH");
        assert_eq!(
            adapter.base_url,
            "https://hiveon.net/api/v1/stats/miner/abc123/ETH"
        );
    }

    #[test]
    fn test_wallet_without_hex_prefix_is_kept() {
        let adapter = Hiveon::new("abc123", "ETH", None, make_client()).unwrap();

        assert_eq!(adapter.wallet, "abc123");
    }

    #[test]
    fn test_prefix_only_wallet_is_rejected() {
        let err = Hiveon::new("0x", "ETH", None, make_client()).unwrap_err();

        assert!(matches!(err, PoolError::Config(_)));
        assert!(err.to_string().contains("0x"));
    }

    #[test]
    fn test_endpoint_override() {
        let adapter = Hiveon::new(
            "abc123",
            "ETH",
            Some("http://127.0.0.1:9999/"),
            make_client(),
        )
        .unwrap();

        assert_eq!(
            adapter.base_url,
            "http://127.0.0.1:9999/api/v1/stats/miner/abc123/ETH"
        );
        assert_eq!(
            adapter.url("/workers"),
            "http://127.0.0.1:9999/api/v1/stats/miner/abc123/ETH/workers"
        );
    }

    #[test]
    fn test_parse_share_timestamp() {
        let epoch = parse_epoch("2021-01-01T00:00:00Z", SHARE_TIME_FORMAT, "u").unwrap();

        assert_eq!(epoch, 1_609_459_200.0);
    }

    #[test]
    fn test_parse_payout_timestamp_keeps_fraction() {
        let epoch = parse_epoch("2021-01-01T00:00:00.250Z", PAYOUT_TIME_FORMAT, "u").unwrap();

        assert_eq!(epoch, 1_609_459_200.25);
    }

    #[test]
    fn test_bad_timestamp_is_response_format_error() {
        let err = parse_epoch("yesterday", SHARE_TIME_FORMAT, "u").unwrap_err();

        assert!(matches!(err, PoolError::ResponseFormat { .. }));
    }
}
