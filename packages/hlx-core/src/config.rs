//! Core configuration types.
//!
//! Provides the entity capacity limits ([`Capacity`]) and the runtime
//! configuration ([`Config`]) shared by the client, server, and proxy
//! personalities. All fields have hardware-faithful defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default Telnet control port.
pub const DEFAULT_PORT: u16 = 23;

/// Per-entity-class identifier maxima.
///
/// Identifiers are 1-based and dense within `[1, max]`; the maxima are
/// fixed per entity class by the hardware generation being modeled and are
/// carried here rather than as magic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacity {
    /// Highest addressable zone identifier.
    pub zones: u8,
    /// Highest addressable source identifier.
    pub sources: u8,
    /// Highest addressable group identifier.
    pub groups: u8,
    /// Highest addressable favorite identifier.
    pub favorites: u8,
    /// Highest addressable equalizer preset identifier.
    pub equalizer_presets: u8,
    /// Number of bands per equalizer (zone or preset).
    pub equalizer_bands: u8,
}

impl Default for Capacity {
    fn default() -> Self {
        Self {
            zones: 24,
            sources: 8,
            groups: 10,
            favorites: 10,
            equalizer_presets: 10,
            equalizer_bands: 10,
        }
    }
}

impl Capacity {
    /// Validates the capacity limits.
    ///
    /// # Errors
    ///
    /// Returns an error string if any limit would make the model
    /// unconstructible.
    pub fn validate(&self) -> Result<(), String> {
        if self.zones == 0 {
            return Err("zones must be >= 1".to_string());
        }
        if self.sources == 0 {
            return Err("sources must be >= 1".to_string());
        }
        if self.groups == 0 {
            return Err("groups must be >= 1".to_string());
        }
        if self.favorites == 0 {
            return Err("favorites must be >= 1".to_string());
        }
        if self.equalizer_presets == 0 {
            return Err("equalizer_presets must be >= 1".to_string());
        }
        if self.equalizer_bands == 0 {
            return Err("equalizer_bands must be >= 1 (band identifiers are 1-based)".to_string());
        }
        Ok(())
    }
}

/// Runtime configuration for the HLX core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Entity capacity limits.
    pub capacity: Capacity,

    /// Default per-exchange timeout (milliseconds). Individual exchanges
    /// may override it.
    pub exchange_timeout_ms: u64,

    /// Interval between dirty-flag checks for the server configuration
    /// autosave (seconds).
    pub save_interval_secs: u64,

    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,

    /// Capacity of the per-connection exchange submission channel.
    pub exchange_queue_capacity: usize,

    /// Also emit the documented `FPL<n>QFPL` front-panel query-response
    /// form alongside the form the hardware actually produces.
    ///
    /// The shipped hardware answers `[QFPL]` with a bare `[FPL<n>]`; the
    /// protocol documentation promises a trailing query echo. Off by
    /// default to match the hardware byte-for-byte.
    pub emit_documented_front_panel_query: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: Capacity::default(),
            exchange_timeout_ms: 10_000,
            save_interval_secs: 30,
            event_channel_capacity: 100,
            exchange_queue_capacity: 64,
            emit_documented_front_panel_query: false,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        self.capacity.validate()?;
        if self.exchange_timeout_ms == 0 {
            return Err("exchange_timeout_ms must be >= 1".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.exchange_queue_capacity == 0 {
            return Err("exchange_queue_capacity must be >= 1".to_string());
        }
        Ok(())
    }

    /// Returns the default per-exchange timeout as a [`Duration`].
    #[must_use]
    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }

    /// Returns the autosave observation interval as a [`Duration`].
    #[must_use]
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_default_is_valid() {
        assert!(Capacity::default().validate().is_ok());
    }

    #[test]
    fn capacity_rejects_zero_limits() {
        let mut capacity = Capacity::default();
        capacity.zones = 0;
        assert!(capacity.validate().is_err());

        let mut capacity = Capacity::default();
        capacity.equalizer_bands = 0;
        assert!(capacity.validate().is_err());
    }

    #[test]
    fn config_default_is_sensible() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.save_interval(), Duration::from_secs(30));
        assert!(!config.emit_documented_front_panel_query);
    }

    #[test]
    fn config_rejects_zero_timeout() {
        let mut config = Config::default();
        config.exchange_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
