//! Configuration loading for the transit mesh layer.
//!
//! This crate provides configuration loading with minimal dependencies,
//! designed to be imported by the `transit` crate and any host process
//! without causing circular dependency issues.
//!
//! # Configuration Philosophy
//!
//! Everything here is a *tunable*, not wire-protocol state: the protocol
//! version, queue limits, backoff timing, and heartbeat cadence. None of it
//! changes the shape of packets on the wire.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/transit/config.toml` (system)
//! 2. `~/.config/transit/config.toml` (user)
//! 3. `./transit.toml` (local override)
//! 4. Environment variables (`TRANSIT_*`)
//!
//! # Example Config
//!
//! ```toml
//! protocol_version = "4"
//! max_queue_size = 0
//!
//! [backoff]
//! base_ms = 5000
//! max_ms = 5000
//!
//! [heartbeat]
//! interval_ms = 5000
//! ping_interval_ms = 10000
//! handshake_grace_ms = 200
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;

pub use loader::ConfigSources;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse {
        path: std::path::PathBuf,
        message: String,
    },
}

/// Reconnect backoff tunables for the lifecycle controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first reconnect attempt, in milliseconds.
    /// Default: 5000, reproducing a fixed 5s reconnect delay.
    #[serde(default = "BackoffConfig::default_base_ms")]
    pub base_ms: u64,

    /// Cap on reconnect delay, in milliseconds. Equal to `base_ms` by
    /// default, which reproduces the source's fixed 5s backoff; raise it
    /// to get exponential backoff with a ceiling (see DESIGN.md).
    #[serde(default = "BackoffConfig::default_max_ms")]
    pub max_ms: u64,
}

impl BackoffConfig {
    fn default_base_ms() -> u64 {
        5_000
    }

    fn default_max_ms() -> u64 {
        5_000
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: Self::default_base_ms(),
            max_ms: Self::default_max_ms(),
        }
    }
}

/// Liveness cadence tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatConfig {
    /// Interval between outbound HEARTBEAT broadcasts, in milliseconds.
    #[serde(default = "HeartbeatConfig::default_interval_ms")]
    pub interval_ms: u64,

    /// Interval between outbound PING probes, in milliseconds.
    #[serde(default = "HeartbeatConfig::default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// Grace period after DISCOVER/INFO exchange during the post-connect
    /// handshake, in milliseconds. Default: 200.
    #[serde(default = "HeartbeatConfig::default_handshake_grace_ms")]
    pub handshake_grace_ms: u64,
}

impl HeartbeatConfig {
    fn default_interval_ms() -> u64 {
        5_000
    }

    fn default_ping_interval_ms() -> u64 {
        10_000
    }

    fn default_handshake_grace_ms() -> u64 {
        200
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::default_interval_ms(),
            ping_interval_ms: Self::default_ping_interval_ms(),
            handshake_grace_ms: Self::default_handshake_grace_ms(),
        }
    }
}

/// Telemetry settings (log level only — sink installation is a host concern).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// Complete transit configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitConfig {
    /// Protocol version tag stamped on every outgoing packet and checked
    /// on every inbound one. Mismatch is fatal for that packet.
    #[serde(default = "TransitConfig::default_protocol_version")]
    pub protocol_version: String,

    /// Cap on in-flight outbound requests. Zero means unbounded.
    #[serde(default)]
    pub max_queue_size: usize,

    #[serde(default)]
    pub backoff: BackoffConfig,

    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl TransitConfig {
    fn default_protocol_version() -> String {
        "4".to_string()
    }

    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/transit/config.toml`
    /// 3. `~/.config/transit/config.toml`
    /// 4. `./transit.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and return information about where values came from.
    pub fn load_with_sources() -> Result<(Self, ConfigSources), ConfigError> {
        Self::load_with_sources_from(None)
    }

    /// Load configuration from an optional path and report sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = TransitConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = file_config;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            protocol_version: Self::default_protocol_version(),
            max_queue_size: 0,
            backoff: BackoffConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec() {
        let config = TransitConfig::default();
        assert_eq!(config.protocol_version, "4");
        assert_eq!(config.max_queue_size, 0);
        assert_eq!(config.heartbeat.handshake_grace_ms, 200);
        assert_eq!(config.backoff.base_ms, 5_000);
    }

    #[test]
    fn zero_max_queue_size_means_unbounded() {
        let config = TransitConfig::default();
        assert_eq!(config.max_queue_size, 0, "0 is the unbounded sentinel");
    }
}
