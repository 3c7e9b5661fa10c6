//! Prometheus exporter for local HiveOS rig telemetry.
//!
//! This crate reads the files the HiveOS agent maintains on a rig
//! (GPU inventory, miner statistics, sensor readings), refreshes a
//! metric snapshot on a fixed cadence and serves it over an HTTP
//! `/metrics` endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   /run/hive/*   │────>│    Collector    │<────│   HTTP Server   │
//! │  (agent files)  │     │  (poll loop)    │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! Run the exporter binary on a HiveOS rig:
//!
//! ```bash
//! minemon-exporter-hiveos --refresh 60
//! ```

pub mod collector;
pub mod config;
pub mod http;
pub mod stats;

pub use collector::{RigCollector, SharedRigCollector};
pub use config::RigConfig;
pub use http::HttpServer;
pub use stats::StatPaths;
