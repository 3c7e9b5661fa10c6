//! Prometheus exporter for mining pool accounts.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use minemon_exporter_pool::{HttpServer, PoolCollector};
use minemon_pool::{PoolsConfig, ResponseCache, build_adapters};

/// Prometheus exporter for mining pool accounts.
#[derive(Parser, Debug)]
#[command(name = "minemon-exporter-pool")]
#[command(about = "Export mining pool account statistics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// The listening port for the exporter.
    #[arg(short = 'p', long, default_value_t = 10102)]
    port: u16,

    /// Path to the config file.
    #[arg(short = 'c', long, default_value = "etc/pools.yml")]
    config: String,

    /// Default pool API refresh rate in seconds. Has no effect on
    /// instances that configure their own refresh interval.
    #[arg(short = 'r', long, default_value_t = 55)]
    refresh: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    minemon_common::init_tracing(&args.log_level, &["minemon_exporter_pool", "minemon_pool"])?;

    // Load configuration
    let config = match PoolsConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config, error = %e, "No usable pool configuration, quitting");
            std::process::exit(1);
        }
    };

    let cache = Arc::new(ResponseCache::default());
    let adapters = match build_adapters(&config, cache, Duration::from_secs(args.refresh)) {
        Ok(adapters) => adapters,
        Err(e) => {
            error!(path = %args.config, error = %e, "Invalid pool configuration, quitting");
            std::process::exit(1);
        }
    };

    info!(instances = adapters.len(), "Starting pool exporter");

    let collector = Arc::new(PoolCollector::new(adapters));

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start HTTP server
    let listen_addr = std::net::SocketAddr::from(([0, 0, 0, 0], args.port));
    let http_server = HttpServer::new(collector, listen_addr);
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).unwrap();
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    info!("Exporter stopped");
    Ok(())
}
