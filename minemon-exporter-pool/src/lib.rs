//! Prometheus exporter for mining pool accounts.
//!
//! This crate serves the metrics of every configured pool account over
//! an HTTP `/metrics` endpoint. Collection is scrape-driven: each
//! request walks the pool adapters and rebuilds the metric families,
//! with the shared response cache in [`minemon_pool`] keeping repeated
//! scrapes from hammering the upstream APIs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │    Pool APIs    │<────│    Collector    │<────│   HTTP Server   │
//! │   (HTTP/JSON)   │     │  (per scrape)   │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! Run the exporter binary with a pool configuration file:
//!
//! ```bash
//! minemon-exporter-pool --config etc/pools.yml
//! ```

pub mod collector;
pub mod http;

pub use collector::{PoolCollector, SharedCollector};
pub use http::HttpServer;
