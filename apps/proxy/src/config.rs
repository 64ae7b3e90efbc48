//! Proxy configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Proxy configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Upstream controller address (`telnet://host:port`, `host:port`,
    /// or bare `host`).
    /// Override: `HLX_UPSTREAM`
    pub upstream: String,

    /// Address to bind the downstream listener to.
    /// Override: `HLX_BIND_ADDRESS`
    pub bind_address: IpAddr,

    /// Port to bind the downstream listener to.
    /// Override: `HLX_BIND_PORT`
    pub bind_port: u16,

    /// Entity capacity limits; must match the upstream controller.
    pub capacity: hlx_core::Capacity,

    /// Default per-exchange timeout toward the upstream (milliseconds).
    /// Override: `HLX_UPSTREAM_TIMEOUT_MS`
    pub upstream_timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream: String::new(),
            bind_address: IpAddr::from([0, 0, 0, 0]),
            bind_port: hlx_core::DEFAULT_PORT,
            capacity: hlx_core::Capacity::default(),
            upstream_timeout_ms: 10_000,
        }
    }
}

impl ProxyConfig {
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
        if let Ok(val) = std::env::var("HLX_UPSTREAM") {
            self.upstream = val;
        }

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

        if let Ok(val) = std::env::var("HLX_UPSTREAM_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                self.upstream_timeout_ms = timeout;
            }
        }
    }

    /// Converts to hlx-core's Config type.
    pub fn to_core_config(&self) -> hlx_core::Config {
        hlx_core::Config {
            capacity: self.capacity,
            exchange_timeout_ms: self.upstream_timeout_ms,
            ..Default::default()
        }
    }
}
