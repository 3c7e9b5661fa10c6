//! The contract every pool adapter fulfils.

use async_trait::async_trait;
use minemon_common::MetricSample;

use crate::error::Result;

/// Share classification reported by a pool.
///
/// Pools use different vocabulary ("stale", "invalid", ...) for shares
/// they did not credit; adapters fold that into this fixed set, which
/// becomes the `type` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatioKind {
    Accepted,
    Rejected,
    Invalid,
}

impl RatioKind {
    /// The `type` label value for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RatioKind::Accepted => "accepted",
            RatioKind::Rejected => "rejected",
            RatioKind::Invalid => "invalid",
        }
    }
}

/// Read-only view of one pool account.
///
/// Accessors fetch eagerly and return complete snapshots; nothing is
/// mutated on the pool side. Implementations go through the shared
/// [`ApiClient`](crate::client::ApiClient), so accessors backed by the
/// same upstream endpoint reuse one cached response instead of
/// re-fetching.
///
/// Values carry the unit conventions of the metric families: hashrates
/// in H/s, balances and money flows in coin units, share ratios as raw
/// counts. Samples keep the upstream event timestamp when the API
/// reports one.
#[async_trait]
pub trait PoolAdapter: Send + Sync {
    /// Identifier of the pool, used as the `pool` metric label.
    fn pool_name(&self) -> &str;

    /// Coin ticker, used as the `coin` metric label.
    fn coin(&self) -> &str;

    /// Wallet address, used as the `wallet` metric label.
    ///
    /// Some pools do not configure a wallet directly and have to resolve
    /// it through their API, which is why this accessor is fallible.
    async fn wallet(&self) -> Result<String>;

    /// Pool-reported total hashrate of the account.
    async fn hashrate(&self) -> Result<MetricSample>;

    /// Unpaid balance of the account.
    async fn balance(&self) -> Result<MetricSample>;

    /// Account-level share ratios.
    async fn ratios(&self) -> Result<Vec<(RatioKind, MetricSample)>>;

    /// Hashrate per worker.
    async fn worker_hashrates(&self) -> Result<Vec<(String, MetricSample)>>;

    /// Share ratios per worker.
    async fn worker_ratios(&self) -> Result<Vec<(String, RatioKind, MetricSample)>>;

    /// Recent rewards credited by the pool.
    async fn rewards(&self) -> Result<Vec<MetricSample>>;

    /// Recent payouts from the pool to the wallet.
    async fn payouts(&self) -> Result<Vec<MetricSample>>;
}

impl std::fmt::Debug for dyn PoolAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolAdapter")
            .field("pool", &self.pool_name())
            .field("coin", &self.coin())
            .finish()
    }
}
