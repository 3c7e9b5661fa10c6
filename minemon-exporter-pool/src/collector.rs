//! Scrape-driven collection of pool metrics.
//!
//! Each scrape rebuilds the four metric families from scratch by
//! walking every configured adapter. Nothing is carried over between
//! scrapes; the HTTP layer's response cache is what bounds upstream
//! request traffic when scrapes arrive faster than the cache TTL.

use std::sync::Arc;
use std::time::Duration;

use minemon_common::{MetricFamily, MetricKind, MetricSample, render_families};
use minemon_pool::{PoolAdapter, RatioKind};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Account-level series carry this worker label.
const TOTAL_WORKER: &str = "total";

/// Upper bound on one adapter's fetches within a single scrape.
const ADAPTER_TIMEOUT: Duration = Duration::from_secs(30);

const HASHRATE_LABELS: &[&str] = &["wallet", "coin", "pool", "worker"];
const BALANCE_LABELS: &[&str] = &["wallet", "coin", "pool", "type"];
const RATIO_LABELS: &[&str] = &["wallet", "coin", "pool", "type", "worker"];
const REWARD_LABELS: &[&str] = BALANCE_LABELS;

/// Shared reference to the collector.
pub type SharedCollector = Arc<PoolCollector>;

/// Everything one adapter contributes to a scrape, fetched up front.
///
/// Fetching the whole snapshot before touching the families means a
/// half-failed adapter leaves no partial samples behind.
struct AdapterSnapshot {
    wallet: String,
    coin: String,
    pool: String,
    hashrate: MetricSample,
    balance: MetricSample,
    ratios: Vec<(RatioKind, MetricSample)>,
    worker_hashrates: Vec<(String, MetricSample)>,
    worker_ratios: Vec<(String, RatioKind, MetricSample)>,
    rewards: Vec<MetricSample>,
    payouts: Vec<MetricSample>,
}

async fn snapshot(adapter: &dyn PoolAdapter) -> minemon_pool::Result<AdapterSnapshot> {
    Ok(AdapterSnapshot {
        wallet: adapter.wallet().await?,
        coin: adapter.coin().to_string(),
        pool: adapter.pool_name().to_string(),
        hashrate: adapter.hashrate().await?,
        balance: adapter.balance().await?,
        ratios: adapter.ratios().await?,
        worker_hashrates: adapter.worker_hashrates().await?,
        worker_ratios: adapter.worker_ratios().await?,
        rewards: adapter.rewards().await?,
        payouts: adapter.payouts().await?,
    })
}

/// Collects metrics from all configured pool adapters on demand.
pub struct PoolCollector {
    adapters: Vec<Box<dyn PoolAdapter>>,
    adapter_timeout: Duration,
}

impl PoolCollector {
    /// Create a collector over the given adapters.
    pub fn new(adapters: Vec<Box<dyn PoolAdapter>>) -> Self {
        Self {
            adapters,
            adapter_timeout: ADAPTER_TIMEOUT,
        }
    }

    /// Override the per-adapter time budget.
    pub fn with_adapter_timeout(mut self, adapter_timeout: Duration) -> Self {
        self.adapter_timeout = adapter_timeout;
        self
    }

    /// Number of configured adapters.
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Run one scrape and return the four metric families.
    ///
    /// An adapter that fails or exceeds its time budget only loses its
    /// own samples for this scrape; the other adapters still report.
    pub async fn collect(&self) -> Vec<MetricFamily> {
        info!("Collecting pool metrics");

        let mut hashrate = MetricFamily::new(
            "pool_hashrate",
            "Pool hashrate in H/s",
            MetricKind::Gauge,
            HASHRATE_LABELS,
        );
        let mut balance = MetricFamily::new(
            "pool_balance",
            "Pool coin balance",
            MetricKind::Counter,
            BALANCE_LABELS,
        );
        let mut ratio = MetricFamily::new(
            "pool_ratio",
            "Share acceptance counters",
            MetricKind::Counter,
            RATIO_LABELS,
        );
        let mut reward = MetricFamily::new(
            "pool_reward",
            "Rewards from pool",
            MetricKind::Gauge,
            REWARD_LABELS,
        );

        for adapter in &self.adapters {
            debug!(
                pool = %adapter.pool_name(),
                coin = %adapter.coin(),
                "Collecting metrics for pool instance"
            );

            let snap = match timeout(self.adapter_timeout, snapshot(adapter.as_ref())).await {
                Ok(Ok(snap)) => snap,
                Ok(Err(e)) => {
                    warn!(
                        pool = %adapter.pool_name(),
                        coin = %adapter.coin(),
                        error = %e,
                        "Skipping pool instance for this scrape"
                    );
                    continue;
                }
                Err(_) => {
                    warn!(
                        pool = %adapter.pool_name(),
                        coin = %adapter.coin(),
                        timeout_secs = self.adapter_timeout.as_secs(),
                        "Pool instance timed out, skipping for this scrape"
                    );
                    continue;
                }
            };

            fold(&snap, &mut hashrate, &mut balance, &mut ratio, &mut reward);
        }

        vec![hashrate, balance, ratio, reward]
    }

    /// Run one scrape and render it in the text exposition format.
    pub async fn render(&self) -> String {
        render_families(&self.collect().await)
    }
}

fn fold(
    snap: &AdapterSnapshot,
    hashrate: &mut MetricFamily,
    balance: &mut MetricFamily,
    ratio: &mut MetricFamily,
    reward: &mut MetricFamily,
) {
    let base = [snap.wallet.clone(), snap.coin.clone(), snap.pool.clone()];

    hashrate.push(labels(&base, &[TOTAL_WORKER]), snap.hashrate);
    for (kind, sample) in &snap.ratios {
        ratio.push(labels(&base, &[kind.as_str(), TOTAL_WORKER]), *sample);
    }

    for (worker, sample) in &snap.worker_hashrates {
        hashrate.push(labels(&base, &[worker]), *sample);
    }
    for (worker, kind, sample) in &snap.worker_ratios {
        ratio.push(labels(&base, &[kind.as_str(), worker]), *sample);
    }

    balance.push(labels(&base, &["unpaid"]), snap.balance);

    for sample in &snap.rewards {
        reward.push(labels(&base, &["reward"]), *sample);
    }
    for sample in &snap.payouts {
        reward.push(labels(&base, &["payout"]), *sample);
    }
}

fn labels(base: &[String; 3], rest: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(base.len() + rest.len());
    out.extend(base.iter().cloned());
    out.extend(rest.iter().map(|s| s.to_string()));
    out
}
