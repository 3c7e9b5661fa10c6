//! Adapter for the Suprnova family of pools.
//!
//! Each coin lives on its own subdomain with one query-style endpoint,
//! `index.php?page=api&api_key=...&action=<name>`, and every response
//! wraps its payload in an `{<action>: {"data": ...}}` envelope. The
//! account wallet is not part of the configuration; it is resolved from
//! the `getuserstatus` action on first use and then memoized.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;

use minemon_common::MetricSample;

use crate::adapter::{PoolAdapter, RatioKind};
use crate::client::{ApiClient, decode};
use crate::error::{PoolError, Result};

/// The `pool` label value for this adapter.
pub const POOL_NAME: &str = "suprnova.cc";

const TRANSACTION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The API reports hashrates in kH/s; metrics use H/s.
const KHS_TO_HS: f64 = 1000.0;

/// Suprnova account adapter. Accounts are identified by API key; the
/// wallet (account name) comes from the API itself.
pub struct Suprnova {
    coin: String,
    base_url: String,
    client: ApiClient,
    wallet: OnceCell<String>,
}

impl Suprnova {
    /// Build an adapter for one account.
    ///
    /// The coin is uppercased for the label and lowercased in the default
    /// `https://{coin}.suprnova.cc` origin. `endpoint` overrides that
    /// origin.
    pub fn new(api_key: &str, coin: &str, endpoint: Option<&str>, client: ApiClient) -> Self {
        let coin = coin.to_uppercase();
        let origin = match endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.suprnova.cc", coin.to_lowercase()),
        };
        let base_url = format!("{}/index.php?page=api&api_key={}", origin, api_key);

        Self {
            coin,
            base_url,
            client,
            wallet: OnceCell::new(),
        }
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}&action={}", self.base_url, action)
    }

    /// Call one API action and unwrap its response envelope.
    async fn call_action(&self, action: &str) -> Result<Value> {
        let url = self.action_url(action);
        let body = self.client.call(&url).await?;

        match body.get(action).and_then(|entry| entry.get("data")) {
            Some(data) => Ok(data.clone()),
            None => Err(PoolError::ResponseFormat {
                url,
                reason: format!("missing '{}.data' envelope", action),
            }),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, action: &str) -> Result<T> {
        let data = self.call_action(action).await?;
        decode(&self.action_url(action), data)
    }

    async fn transactions_of_kind(&self, kind: &str) -> Result<Vec<MetricSample>> {
        let url = self.action_url("getusertransactions");
        let list: TransactionList = self.fetch("getusertransactions").await?;

        list.transactions
            .iter()
            .filter(|trx| trx.kind == kind)
            .map(|trx| {
                let timestamp = parse_epoch(&trx.timestamp, TRANSACTION_TIME_FORMAT, &url)?;
                Ok(MetricSample::at(trx.amount, timestamp))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct StatusWallet {
    username: String,
}

#[derive(Debug, Deserialize)]
struct StatusHashrate {
    hashrate: f64,
}

#[derive(Debug, Deserialize)]
struct StatusShares {
    shares: ShareCounts,
}

#[derive(Debug, Deserialize)]
struct ShareCounts {
    valid: f64,
    invalid: f64,
}

#[derive(Debug, Deserialize)]
struct UserBalance {
    confirmed: f64,
    unconfirmed: f64,
}

#[derive(Debug, Deserialize)]
struct WorkerStatus {
    username: String,
    hashrate: f64,
    shares: f64,
}

#[derive(Debug, Deserialize)]
struct TransactionList {
    transactions: Vec<Transaction>,
}

#[derive(Debug, Deserialize)]
struct Transaction {
    #[serde(rename = "type")]
    kind: String,
    amount: f64,
    timestamp: String,
}

#[async_trait]
impl PoolAdapter for Suprnova {
    fn pool_name(&self) -> &str {
        POOL_NAME
    }

    fn coin(&self) -> &str {
        &self.coin
    }

    async fn wallet(&self) -> Result<String> {
        let wallet = self
            .wallet
            .get_or_try_init(|| async {
                let status: StatusWallet = self.fetch("getuserstatus").await?;
                Ok::<_, PoolError>(status.username)
            })
            .await?;

        Ok(wallet.clone())
    }

    async fn hashrate(&self) -> Result<MetricSample> {
        let status: StatusHashrate = self.fetch("getuserstatus").await?;
        Ok(MetricSample::new(status.hashrate * KHS_TO_HS))
    }

    async fn balance(&self) -> Result<MetricSample> {
        let balance: UserBalance = self.fetch("getuserbalance").await?;
        Ok(MetricSample::new(balance.confirmed + balance.unconfirmed))
    }

    async fn ratios(&self) -> Result<Vec<(RatioKind, MetricSample)>> {
        let status: StatusShares = self.fetch("getuserstatus").await?;

        Ok(vec![
            (
                RatioKind::Accepted,
                MetricSample::new(status.shares.valid),
            ),
            (
                RatioKind::Rejected,
                MetricSample::new(status.shares.invalid),
            ),
        ])
    }

    async fn worker_hashrates(&self) -> Result<Vec<(String, MetricSample)>> {
        let workers: Vec<WorkerStatus> = self.fetch("getuserworkers").await?;

        Ok(workers
            .into_iter()
            .map(|worker| {
                (
                    strip_account_prefix(&worker.username),
                    MetricSample::new(worker.hashrate * KHS_TO_HS),
                )
            })
            .collect())
    }

    async fn worker_ratios(&self) -> Result<Vec<(String, RatioKind, MetricSample)>> {
        // The API has no per-worker rejected counts, so only accepted
        // shares are reported.
        let workers: Vec<WorkerStatus> = self.fetch("getuserworkers").await?;

        Ok(workers
            .into_iter()
            .map(|worker| {
                (
                    strip_account_prefix(&worker.username),
                    RatioKind::Accepted,
                    MetricSample::new(worker.shares),
                )
            })
            .collect())
    }

    async fn rewards(&self) -> Result<Vec<MetricSample>> {
        self.transactions_of_kind("Credit").await
    }

    async fn payouts(&self) -> Result<Vec<MetricSample>> {
        self.transactions_of_kind("Debit_AP").await
    }
}

/// Worker usernames arrive as `account.worker`; drop the account
/// segment. Worker names may themselves contain dots.
fn strip_account_prefix(username: &str) -> String {
    match username.split_once('.') {
        Some((_, worker)) => worker.to_string(),
        None => String::new(),
    }
}

/// Convert an upstream timestamp to epoch seconds, read as UTC.
fn parse_epoch(raw: &str, format: &str, url: &str) -> Result<f64> {
    match NaiveDateTime::parse_from_str(raw, format) {
        Ok(parsed) => Ok(parsed.and_utc().timestamp_micros() as f64 / 1_000_000.0),
        Err(e) => Err(PoolError::ResponseFormat {
            url: url.to_string(),
            reason: format!("bad timestamp '{}': {}", raw, e),
        }),
    }
}
