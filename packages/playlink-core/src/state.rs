//! Core configuration types.

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DEFAULT_CLIENT_QUEUE_CAPACITY, DEFAULT_COMMAND_CHANNEL_CAPACITY, DEFAULT_PORT,
};

/// Settings for the in-process simulated engine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SimulatedEngineConfig {
    /// Time the engine takes to report initialization (milliseconds).
    pub init_delay_ms: u64,

    /// Length of every simulated track (milliseconds).
    pub track_length_ms: u64,
}

impl Default for SimulatedEngineConfig {
    fn default() -> Self {
        Self {
            init_delay_ms: 250,
            track_length_ms: 180_000,
        }
    }
}

/// Configuration for the Playlink mediator.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP/WS server (0 = auto-allocate).
    pub preferred_port: u16,

    // Session
    /// Capacity of the session actor's inbox.
    pub command_channel_capacity: usize,

    // Clients
    /// Per-client outbound event queue capacity.
    ///
    /// A client whose queue fills up is treated as unreachable and dropped.
    pub client_queue_capacity: usize,

    // WebSocket
    /// WebSocket heartbeat timeout (seconds).
    pub ws_heartbeat_timeout_secs: u64,

    /// Interval between WebSocket heartbeat checks (seconds).
    pub ws_heartbeat_check_interval_secs: u64,

    // Lifecycle
    /// Request shutdown once the last bound client goes away.
    pub exit_when_idle: bool,

    // Engine
    /// Simulated engine settings.
    pub engine: SimulatedEngineConfig,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.command_channel_capacity == 0 {
            return Err(
                "command_channel_capacity must be >= 1 (mpsc::channel panics on 0)".to_string(),
            );
        }
        if self.client_queue_capacity == 0 {
            return Err(
                "client_queue_capacity must be >= 1 (mpsc::channel panics on 0)".to_string(),
            );
        }
        if self.ws_heartbeat_check_interval_secs == 0 {
            return Err("ws_heartbeat_check_interval_secs must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: DEFAULT_PORT,
            command_channel_capacity: DEFAULT_COMMAND_CHANNEL_CAPACITY,
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
            ws_heartbeat_timeout_secs: 30,
            ws_heartbeat_check_interval_secs: 1,
            exit_when_idle: false,
            engine: SimulatedEngineConfig::default(),
        }
    }
}
