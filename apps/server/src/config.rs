//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the Telnet listener to.
    /// Override: `HLX_BIND_ADDRESS`
    pub bind_address: IpAddr,

    /// Port to bind the Telnet listener to.
    /// Override: `HLX_BIND_PORT`
    pub bind_port: u16,

    /// Entity capacity limits (zones, sources, groups, ...).
    pub capacity: hlx_core::Capacity,

    /// Seconds between dirty-flag checks for configuration autosave.
    /// Override: `HLX_SAVE_INTERVAL`
    pub save_interval_secs: u64,

    /// Also emit the documented front-panel query-response form instead
    /// of the one the hardware actually ships.
    pub emit_documented_front_panel_query: bool,

    /// Network identity the simulator advertises in `QE` responses.
    pub network: Option<hlx_core::NetworkIdentity>,

    /// Path for the persisted configuration snapshot.
    /// Override: `HLX_DATA_FILE`
    pub data_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            bind_port: hlx_core::DEFAULT_PORT,
            capacity: hlx_core::Capacity::default(),
            save_interval_secs: 30,
            emit_documented_front_panel_query: false,
            network: None,
            data_file: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HLX_BIND_ADDRESS") {
            if let Ok(addr) = val.parse() {
                self.bind_address = addr;
            }
        }

        if let Ok(val) = std::env::var("HLX_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("HLX_SAVE_INTERVAL") {
            if let Ok(interval) = val.parse() {
                self.save_interval_secs = interval;
            }
        }

        // Note: HLX_DATA_FILE is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to hlx-core's Config type.
    pub fn to_core_config(&self) -> hlx_core::Config {
        hlx_core::Config {
            capacity: self.capacity,
            save_interval_secs: self.save_interval_secs,
            emit_documented_front_panel_query: self.emit_documented_front_panel_query,
            ..Default::default()
        }
    }
}
