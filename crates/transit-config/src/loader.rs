//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, TransitConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order).
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values.
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local). Only returns files
/// that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/transit/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("transit/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("transit.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load a `TransitConfig` from a single TOML file, filling unset fields
/// with compiled defaults via serde.
pub fn load_from_file(path: &Path) -> Result<TransitConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Apply environment variable overrides to config.
///
/// `TRANSIT_PROTOCOL_VERSION`, `TRANSIT_MAX_QUEUE_SIZE`, `TRANSIT_BACKOFF_BASE_MS`,
/// `TRANSIT_BACKOFF_MAX_MS`, `TRANSIT_HEARTBEAT_INTERVAL_MS`,
/// `TRANSIT_PING_INTERVAL_MS`, `TRANSIT_HANDSHAKE_GRACE_MS`, `TRANSIT_LOG_LEVEL`
/// (also `RUST_LOG`, matching the convention every other crate in this
/// workspace honors).
pub fn apply_env_overrides(config: &mut TransitConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("TRANSIT_PROTOCOL_VERSION") {
        config.protocol_version = v;
        sources.env_overrides.push("TRANSIT_PROTOCOL_VERSION".to_string());
    }
    if let Some(v) = parse_env("TRANSIT_MAX_QUEUE_SIZE", sources) {
        config.max_queue_size = v;
    }
    if let Some(v) = parse_env("TRANSIT_BACKOFF_BASE_MS", sources) {
        config.backoff.base_ms = v;
    }
    if let Some(v) = parse_env("TRANSIT_BACKOFF_MAX_MS", sources) {
        config.backoff.max_ms = v;
    }
    if let Some(v) = parse_env("TRANSIT_HEARTBEAT_INTERVAL_MS", sources) {
        config.heartbeat.interval_ms = v;
    }
    if let Some(v) = parse_env("TRANSIT_PING_INTERVAL_MS", sources) {
        config.heartbeat.ping_interval_ms = v;
    }
    if let Some(v) = parse_env("TRANSIT_HANDSHAKE_GRACE_MS", sources) {
        config.heartbeat.handshake_grace_ms = v;
    }
    if let Ok(v) = env::var("TRANSIT_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("TRANSIT_LOG_LEVEL".to_string());
    }
    if let Ok(v) = env::var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, sources: &mut ConfigSources) -> Option<T> {
    let v = env::var(name).ok()?;
    let parsed = v.parse().ok();
    if parsed.is_some() {
        sources.env_overrides.push(name.to_string());
    }
    parsed
}
