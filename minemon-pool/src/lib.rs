//! Mining pool account adapters.
//!
//! Every supported pool implements [`PoolAdapter`]: a read-only view of one
//! pool account exposing hashrate, balance, share ratios and money flows.
//! Implementations go through a shared HTTP access layer ([`ApiClient`])
//! backed by a TTL response cache ([`ResponseCache`]), so accessors that hit
//! the same upstream endpoint within the cache lifetime reuse one response.
//!
//! Adapters are built from YAML configuration through the string-keyed
//! [`registry`]:
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │  pools.yml   │────>│   registry   │────>│ Box<dyn Pool-   │
//! │ (PoolsConfig)│     │(build_adapters)    │    Adapter>     │
//! └──────────────┘     └──────────────┘     └─────────────────┘
//! ```

pub mod adapter;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod hiveon;
pub mod registry;
pub mod suprnova;

// Re-export commonly used types at the crate root
pub use adapter::{PoolAdapter, RatioKind};
pub use cache::ResponseCache;
pub use client::{ApiClient, HttpSettings};
pub use config::{PoolInstanceConfig, PoolsConfig};
pub use error::{PoolError, Result};
pub use registry::{build_adapter, build_adapters};
