//! Playback session: authoritative state plus the actor that owns it.

mod actor;
mod state;

pub use actor::{SessionActor, SessionHandle, SessionMessage};
pub use state::{Attribution, SessionPhase, SessionSnapshot, SessionState};
