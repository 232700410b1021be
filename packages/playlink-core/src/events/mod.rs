//! Event system for real-time client communication.
//!
//! This module provides:
//! - [`PlaybackEvent`], the immutable payload broadcast to every client
//! - [`EventEmitter`] trait through which the session publishes events
//!
//! The client registry is the production emitter; see
//! [`crate::clients::ClientRegistry`].

mod emitter;

pub use emitter::EventEmitter;

use serde::Serialize;

/// Events broadcast to every registered client.
///
/// Serialized with a `type` tag in SCREAMING_SNAKE_CASE and camelCase fields,
/// e.g. `{"type":"POSITION_CHANGED","positionMs":1000,"timestampMs":…}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackEvent {
    /// The engine confirmed the prepared track; playback is paused and ready.
    Prepared {
        /// URI of the track that is now ready.
        uri: String,
    },
    /// Playback of the prepared track started or resumed.
    PlaybackStarted,
    /// Playback of the prepared track paused.
    PlaybackPaused,
    /// The prepared track played to its end.
    EndOfTrack,
    /// Playback position report.
    #[serde(rename_all = "camelCase")]
    PositionChanged {
        /// Position within the track in milliseconds.
        position_ms: i32,
        /// Unix timestamp in milliseconds when the position was sampled.
        timestamp_ms: i64,
    },
    /// An engine or playback error clients should know about.
    Error {
        /// Human-readable description.
        message: String,
    },
}

impl PlaybackEvent {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Prepared { .. } => "PREPARED",
            Self::PlaybackStarted => "PLAYBACK_STARTED",
            Self::PlaybackPaused => "PLAYBACK_PAUSED",
            Self::EndOfTrack => "END_OF_TRACK",
            Self::PositionChanged { .. } => "POSITION_CHANGED",
            Self::Error { .. } => "ERROR",
        }
    }
}
