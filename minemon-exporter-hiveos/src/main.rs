//! Prometheus exporter for local HiveOS rig telemetry.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use minemon_exporter_hiveos::config::DEFAULT_RIG_CONF;
use minemon_exporter_hiveos::stats::DEFAULT_RUN_DIR;
use minemon_exporter_hiveos::{HttpServer, RigCollector, RigConfig, StatPaths};

/// Prometheus exporter for local HiveOS rig telemetry.
#[derive(Parser, Debug)]
#[command(name = "minemon-exporter-hiveos")]
#[command(about = "Export HiveOS rig statistics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// The listening port for the exporter.
    #[arg(short = 'p', long, default_value_t = 10101)]
    port: u16,

    /// How often to refresh metrics, in seconds.
    #[arg(short = 'r', long, default_value_t = 60)]
    refresh: u64,

    /// Path to the HiveOS agent configuration.
    #[arg(long, default_value = DEFAULT_RIG_CONF)]
    rig_conf: String,

    /// Directory holding the agent's runtime statistics files.
    #[arg(long, default_value = DEFAULT_RUN_DIR)]
    run_dir: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    minemon_common::init_tracing(&args.log_level, &["minemon_exporter_hiveos"])?;

    // The rig name labels every metric; without it there is nothing
    // useful to export.
    let rig = match RigConfig::load(&args.rig_conf)
        .and_then(|config| config.worker_name().map(String::from))
    {
        Ok(rig) => rig,
        Err(e) => {
            error!(path = %args.rig_conf, error = %e, "No usable rig configuration, quitting");
            std::process::exit(1);
        }
    };

    info!(rig = %rig, refresh_secs = args.refresh, "Starting HiveOS exporter");

    let collector = Arc::new(RigCollector::new(rig, StatPaths::new(&args.run_dir)));

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start refresh task
    let refresh_collector = collector.clone();
    let refresh_interval = Duration::from_secs(args.refresh);
    let mut refresh_shutdown = shutdown_rx.clone();

    let refresh_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = refresh_collector.refresh() {
                        warn!(error = %e, "Failed to refresh rig metrics");
                    }
                }
                _ = refresh_shutdown.changed() => {
                    if *refresh_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

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

    // Wait for tasks to complete
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = http_task.await;
        let _ = refresh_task.await;
    })
    .await;

    info!("Exporter stopped");
    Ok(())
}
