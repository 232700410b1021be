//! Fixed protocol constants shared by the transport and the session.
//!
//! Tunable values (channel capacities, timeouts) live in [`crate::state::Config`];
//! the values here are part of the wire contract with clients and the engine.

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "playlink";

/// The only protocol identifier accepted by the bind point.
///
/// Clients binding with any other identifier get no handle.
pub const PROTOCOL_ID: &str = "playlink.v1";

// ─────────────────────────────────────────────────────────────────────────────
// Engine Contract
// ─────────────────────────────────────────────────────────────────────────────

/// Smallest seek target passed to the engine (milliseconds).
///
/// Some engine versions reject a seek to exactly zero.
pub const MIN_SEEK_POSITION_MS: u32 = 1;

/// Error message broadcast when playback moved to another device.
pub const LOST_PERMISSION_MESSAGE: &str = "playback active on another device";

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default capacity of the session actor's inbound channel.
pub const DEFAULT_COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Default capacity of each client's outbound event queue.
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

/// Default port for the HTTP/WebSocket server.
pub const DEFAULT_PORT: u16 = 49500;
