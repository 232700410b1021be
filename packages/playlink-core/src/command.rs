//! Commands accepted by the session.

use serde::Deserialize;

use crate::engine::{Bitrate, Credentials};

/// A client-issued command, immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load `uri` with fresh credentials, replacing any current track.
    Prepare { uri: String, credentials: Credentials },
    Play,
    Pause,
    /// Seek within the prepared track. Values below 1 are clamped to 1.
    Seek { position_ms: i32 },
    SetBitrate { level: BitrateLevel },
}

impl Command {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Prepare { .. } => "prepare",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Seek { .. } => "seek",
            Self::SetBitrate { .. } => "set_bitrate",
        }
    }
}

/// Bitrate level as sent by a client: either the numeric level or its name.
///
/// Kept unresolved until it reaches the session, where an unrecognized level
/// is a diagnosed no-op rather than a rejected command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BitrateLevel {
    Index(i64),
    Name(String),
}

impl BitrateLevel {
    /// Resolves the level, or `None` if the engine has no such level.
    pub fn resolve(&self) -> Option<Bitrate> {
        match self {
            Self::Index(level) => Bitrate::from_level(*level),
            Self::Name(name) => Bitrate::from_name(name),
        }
    }
}
