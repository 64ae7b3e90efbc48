//! HLX Proxy - caching protocol relay daemon.
//!
//! Connects to one upstream controller as a client, mirrors its state,
//! and serves the same protocol to any number of downstream clients:
//! queries from the mirror, mutations forwarded upstream.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use hlx_core::{HostAddress, ProxyController};
use tokio::signal;

use crate::config::ProxyConfig;

/// HLX Proxy - caching relay for a multi-zone audio controller.
#[derive(Parser, Debug)]
#[command(name = "hlx-proxy")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "HLX_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Upstream controller address (overrides config file).
    #[arg(short, long, env = "HLX_UPSTREAM")]
    upstream: Option<String>,

    /// Bind port for downstream clients (overrides config file).
    #[arg(short = 'p', long, env = "HLX_BIND_PORT")]
    port: Option<u16>,

    /// Bind address for downstream clients (overrides config file).
    #[arg(short = 'a', long, env = "HLX_BIND_ADDRESS")]
    bind_address: Option<std::net::IpAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("HLX Proxy v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ProxyConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(upstream) = args.upstream {
        config.upstream = upstream;
    }
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(addr) = args.bind_address {
        config.bind_address = addr;
    }

    if config.upstream.is_empty() {
        bail!("No upstream controller configured; pass --upstream or set HLX_UPSTREAM");
    }
    let upstream: HostAddress = config
        .upstream
        .parse()
        .with_context(|| format!("Bad upstream address {:?}", config.upstream))?;

    let core_config = config.to_core_config();
    core_config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    let proxy = ProxyController::new(core_config);

    log::info!("Connecting upstream to {}", upstream);
    proxy
        .connect_upstream(&upstream)
        .await
        .with_context(|| format!("Failed to synchronize with upstream {upstream}"))?;
    log::info!("Upstream mirror synchronized");

    let bind = SocketAddr::new(config.bind_address, config.bind_port);
    let listener = proxy
        .bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    log::info!("Listening on {}", bind);

    let accept = {
        let proxy = Arc::clone(&proxy);
        tokio::spawn(async move { proxy.run(listener).await })
    };

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    proxy.shutdown();
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
