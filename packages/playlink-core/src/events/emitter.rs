//! Event emitter abstraction for decoupling the session from client delivery.
//!
//! The session actor depends on the [`EventEmitter`] trait rather than on the
//! client registry, so tests can record emitted events and the registry can be
//! swapped for another fan-out strategy.

use super::PlaybackEvent;

/// Trait for publishing playback events without knowledge of transport.
///
/// Implementations must not block: the session actor calls `emit` while it
/// owns the session state.
pub trait EventEmitter: Send + Sync {
    /// Publishes an event to every current subscriber.
    fn emit(&self, event: PlaybackEvent);
}
