//! Minemon Common Library
//!
//! This crate provides shared building blocks for the minemon exporters:
//!
//! - [`metrics`] - Metric sample/family model and Prometheus text exposition rendering
//! - [`config`] - YAML configuration loading

pub mod config;
pub mod metrics;

// Re-export commonly used types at the crate root
pub use config::{ConfigError, load_yaml, parse_yaml};
pub use metrics::{MetricFamily, MetricKind, MetricSample, render_families};

/// Initialize tracing for an exporter binary.
///
/// The `RUST_LOG` environment variable still takes precedence; on top of
/// it, every crate in `targets` is set to `level`. An unknown level name
/// falls back to `info`.
///
/// # Example
///
/// ```ignore
/// minemon_common::init_tracing("debug", &["minemon_exporter_pool", "minemon_pool"])?;
/// ```
pub fn init_tracing(level: &str, targets: &[&str]) -> Result<(), ConfigError> {
    use tracing::Level;
    use tracing_subscriber::EnvFilter;

    let level: Level = level.parse().unwrap_or(Level::INFO);

    let mut filter = EnvFilter::from_default_env();
    for target in targets {
        let directive = format!("{}={}", target, level).parse().map_err(|e| {
            ConfigError::Validation(format!("bad log directive for '{}': {}", target, e))
        })?;
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| ConfigError::Validation(format!("Failed to initialize tracing: {}", e)))?;

    Ok(())
}
