//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use playlink_core::SimulatedEngineConfig;
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = OS-assigned).
    /// Override: `PLAYLINK_BIND_PORT`
    pub bind_port: u16,

    /// Capacity of the session inbox.
    pub command_channel_capacity: usize,

    /// Per-client outbound queue capacity.
    pub client_queue_capacity: usize,

    /// Seconds without traffic before a WebSocket is dropped.
    /// Override: `PLAYLINK_WS_HEARTBEAT_TIMEOUT_SECS`
    pub ws_heartbeat_timeout_secs: u64,

    /// Exit once the last client unbinds.
    /// Override: `PLAYLINK_EXIT_WHEN_IDLE`
    pub exit_when_idle: bool,

    /// Simulated engine settings.
    /// Overrides: `PLAYLINK_ENGINE_INIT_DELAY_MS`, `PLAYLINK_ENGINE_TRACK_LENGTH_MS`
    pub engine: SimulatedEngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = playlink_core::Config::default();
        Self {
            bind_port: core.preferred_port,
            command_channel_capacity: core.command_channel_capacity,
            client_queue_capacity: core.client_queue_capacity,
            ws_heartbeat_timeout_secs: core.ws_heartbeat_timeout_secs,
            exit_when_idle: core.exit_when_idle,
            engine: core.engine,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`; unparsable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = parse_var(&lookup, "PLAYLINK_BIND_PORT") {
            self.bind_port = port;
        }
        if let Some(secs) = parse_var(&lookup, "PLAYLINK_WS_HEARTBEAT_TIMEOUT_SECS") {
            self.ws_heartbeat_timeout_secs = secs;
        }
        if let Some(exit) = parse_var(&lookup, "PLAYLINK_EXIT_WHEN_IDLE") {
            self.exit_when_idle = exit;
        }
        if let Some(ms) = parse_var(&lookup, "PLAYLINK_ENGINE_INIT_DELAY_MS") {
            self.engine.init_delay_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "PLAYLINK_ENGINE_TRACK_LENGTH_MS") {
            self.engine.track_length_ms = ms;
        }

        // Note: PLAYLINK_LOG_LEVEL is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to playlink-core's Config type.
    pub fn to_core_config(&self) -> playlink_core::Config {
        playlink_core::Config {
            preferred_port: self.bind_port,
            command_channel_capacity: self.command_channel_capacity,
            client_queue_capacity: self.client_queue_capacity,
            ws_heartbeat_timeout_secs: self.ws_heartbeat_timeout_secs,
            exit_when_idle: self.exit_when_idle,
            engine: self.engine.clone(),
            ..Default::default()
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let value = lookup(key)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("Ignoring unparsable {}={:?}", key, value);
            None
        }
    }
}
