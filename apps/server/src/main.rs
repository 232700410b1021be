//! Playlink Server - Standalone headless server for Playlink.
//!
//! Runs the playback-control mediator against the in-process simulated
//! engine and exposes it over HTTP and WebSocket.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use playlink_core::{bind_listener, bootstrap_simulated, serve, Lifecycle, ServerLifecycle};
use tokio::signal;

use crate::config::ServerConfig;

/// Playlink Server - Headless playback-control mediator.
#[derive(Parser, Debug)]
#[command(name = "playlink-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "PLAYLINK_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "PLAYLINK_BIND_PORT")]
    port: Option<u16>,

    /// Exit once the last client unbinds (overrides config file).
    #[arg(long)]
    exit_when_idle: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Playlink Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if args.exit_when_idle {
        config.exit_when_idle = true;
    }

    log::info!(
        "Configuration: bind_port={}, exit_when_idle={}",
        config.bind_port,
        config.exit_when_idle
    );

    let lifecycle = Arc::new(ServerLifecycle::new());
    let shutdown_requested = lifecycle.shutdown_token();

    let services = bootstrap_simulated(
        config.to_core_config(),
        Arc::clone(&lifecycle) as Arc<dyn Lifecycle>,
    )
    .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    let (port, listener) = bind_listener(config.bind_port)
        .await
        .context("Failed to bind HTTP listener")?;

    let app_state = services.app_state();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    log::info!("HTTP server started on port {}", port);

    tokio::select! {
        _ = shutdown_signal() => log::info!("Shutdown signal received, cleaning up..."),
        _ = shutdown_requested.cancelled() => log::info!("Idle shutdown requested, cleaning up..."),
    }

    // Graceful shutdown
    services.shutdown().await;

    // Abort the server task; connections are already closed
    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
