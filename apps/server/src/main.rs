//! HLX Server - standalone controller simulator daemon.
//!
//! This binary answers the HLX Telnet control protocol against an
//! in-memory model, persisting it to disk. It stands in for the real
//! hardware during development and drives integration tests for clients
//! and proxies.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hlx_core::{FileStore, LoggingEventSink, MemoryStore, ServerController};
use tokio::signal;

use crate::config::ServerConfig;

/// HLX Server - simulated multi-zone audio controller.
#[derive(Parser, Debug)]
#[command(name = "hlx-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "HLX_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "HLX_BIND_PORT")]
    port: Option<u16>,

    /// Bind address (overrides config file).
    #[arg(short = 'a', long, env = "HLX_BIND_ADDRESS")]
    bind_address: Option<std::net::IpAddr>,

    /// Configuration snapshot file for persistent state.
    #[arg(short = 'd', long, env = "HLX_DATA_FILE")]
    data_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("HLX Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(addr) = args.bind_address {
        config.bind_address = addr;
    }
    if let Some(data_file) = args.data_file {
        config.data_file = Some(data_file);
    }

    let core_config = config.to_core_config();
    core_config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    // Build the backing store. Without a data file the model lives in
    // memory only and every restart is a factory reset.
    let store: Arc<dyn hlx_core::BackingStore> = match &config.data_file {
        Some(path) => {
            log::info!("Using configuration snapshot: {}", path.display());
            Arc::new(FileStore::new(path))
        }
        None => {
            log::info!("No data file configured - configuration will not persist");
            Arc::new(MemoryStore::new())
        }
    };

    let server = ServerController::new(core_config, Arc::new(LoggingEventSink), store);
    if let Some(ref network) = config.network {
        server.set_network_identity(network);
    }
    server.start_autosave();

    let bind = SocketAddr::new(config.bind_address, config.bind_port);
    let listener = server
        .bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    log::info!("Listening on {}", bind);

    let accept = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.run(listener).await })
    };

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Flush unsaved state before exiting.
    if server.is_dirty() {
        if let Err(e) = server.save() {
            log::error!("Final save failed: {}", e);
        }
    }
    server.shutdown();
    accept.abort();

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
