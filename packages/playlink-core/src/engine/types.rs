//! Types exchanged with the external player engine.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failures reported by the engine boundary.
///
/// None of these are fatal to the mediator: the affected operation is logged
/// and dropped, and the next command is served normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine's executor is saturated and rejected the call.
    #[error("engine busy: {0}")]
    Busy(String),

    /// No engine instance exists (nothing prepared, or already released).
    #[error("no player instance")]
    NotInitialized,

    /// The engine could not be brought up at all.
    #[error("engine initialization failed: {0}")]
    InitFailed(String),
}

/// Result alias for engine boundary calls.
pub type EngineResult<T> = Result<T, EngineError>;

// ─────────────────────────────────────────────────────────────────────────────
// Credentials & Bitrate
// ─────────────────────────────────────────────────────────────────────────────

/// Access credentials handed to the engine when a track is prepared.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Opaque access token.
    pub access_token: String,
    /// Token expiry as a Unix timestamp (seconds or milliseconds, engine-defined).
    pub expires_at: i64,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, expires_at: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }
}

// Tokens must never reach the logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Streaming quality levels supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bitrate {
    Low,
    Normal,
    High,
}

impl Bitrate {
    /// Maps the numeric wire level (`0`, `1`, `2`) to a bitrate.
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(Self::Low),
            1 => Some(Self::Normal),
            2 => Some(Self::High),
            _ => None,
        }
    }

    /// Maps a level name (`LOW`, `NORMAL`, `HIGH`, any case) to a bitrate.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "NORMAL" => Some(Self::Normal),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine State & Signals
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of the engine's playback state, as returned by a state query and
/// attached to every playback event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    /// Track the engine currently holds, if any.
    pub uri: Option<String>,
    /// Whether audio is currently playing.
    pub playing: bool,
    /// Position within the track in milliseconds.
    pub position_ms: i32,
}

/// Playback notifications raised by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEventKind {
    TrackStart,
    TrackEnd,
    Pause,
    Play,
    LostPermission,
}

/// Connection-state notifications. Logged only; never broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    LoggedIn,
    LoggedOut,
    LoginFailed(String),
    TemporaryError,
    Message(String),
}

/// Everything an engine instance can report through its sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSignal {
    /// Asynchronous initialization completed.
    Initialized,
    /// Asynchronous initialization failed; no playback will follow.
    InitFailed(String),
    /// A playback event together with the engine state at that moment.
    Playback {
        kind: PlaybackEventKind,
        state: EngineState,
    },
    /// A playback error (codec, network, permission ...).
    PlaybackError { kind: String, details: String },
    /// A connection-state change.
    Connection(ConnectionEvent),
}

/// Why the session asked the engine for its state.
///
/// Carried back with the reply so the session knows which guard the reply
/// resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateQuery {
    /// A `Play` command is waiting to decide whether to resume.
    Resume,
    /// A `Pause` command is waiting to decide whether to pause.
    Pause,
    /// A position report for clients.
    Position,
}
