//! Player adapter: owns the replaceable engine instance.
//!
//! The adapter is the only place that talks to the engine. It guarantees that
//! at most one instance is live: acquiring a new instance first detaches,
//! pauses and drops the previous one, and every instance reports through a
//! sink stamped with a fresh generation number.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::traits::{EngineFactory, EngineSink, PlayerEngine};
use super::types::{Bitrate, Credentials, EngineError, EngineResult, StateQuery};
use crate::session::SessionMessage;

/// The live engine instance and the generation its sink reports under.
struct EngineSlot {
    engine: Arc<dyn PlayerEngine>,
    sink: EngineSink,
}

/// Uniform command surface over the current engine instance.
///
/// Owned exclusively by the session actor, so no interior locking is needed.
pub struct PlayerAdapter {
    factory: Arc<dyn EngineFactory>,
    inbox: mpsc::WeakSender<SessionMessage>,
    slot: Option<EngineSlot>,
    last_generation: u64,
}

impl PlayerAdapter {
    /// Creates an adapter whose engine instances report into `inbox`.
    ///
    /// The adapter holds `inbox` weakly so the session still stops once its
    /// last handle is dropped.
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        inbox: mpsc::WeakSender<SessionMessage>,
    ) -> Self {
        Self {
            factory,
            inbox,
            slot: None,
            last_generation: 0,
        }
    }

    /// Whether an engine instance currently exists.
    pub fn has_engine(&self) -> bool {
        self.slot.is_some()
    }

    /// Generation of the live instance, if any.
    pub fn generation(&self) -> Option<u64> {
        self.slot.as_ref().map(|slot| slot.sink.generation())
    }

    /// Whether `generation` belongs to the live instance.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == Some(generation)
    }

    fn engine(&self) -> EngineResult<&Arc<dyn PlayerEngine>> {
        self.slot
            .as_ref()
            .map(|slot| &slot.engine)
            .ok_or(EngineError::NotInitialized)
    }

    /// Replaces the engine instance and starts loading `uri`.
    ///
    /// Any previous instance is released first. If the factory fails, the
    /// adapter is left without an instance.
    pub fn prepare(&mut self, uri: &str, credentials: &Credentials) -> EngineResult<()> {
        self.release();

        self.last_generation += 1;
        let sink = EngineSink::new(self.last_generation, self.inbox.clone());

        log::debug!(
            "[Adapter] (Re-)initializing player (generation {})",
            self.last_generation
        );
        let engine = self.factory.create(credentials, sink.clone())?;
        let result = engine.play(uri);
        self.slot = Some(EngineSlot { engine, sink });
        result
    }

    pub fn pause(&self) -> EngineResult<()> {
        self.engine()?.pause()
    }

    pub fn resume(&self) -> EngineResult<()> {
        self.engine()?.resume()
    }

    pub fn seek_to(&self, position_ms: u32) -> EngineResult<()> {
        self.engine()?.seek_to(position_ms)
    }

    pub fn set_bitrate(&self, bitrate: Bitrate) -> EngineResult<()> {
        self.engine()?.set_bitrate(bitrate)
    }

    /// Asks the live instance for its state; the reply re-enters the session
    /// inbox tagged with `query`.
    pub fn query_state(&self, query: StateQuery) -> EngineResult<()> {
        let slot = self.slot.as_ref().ok_or(EngineError::NotInitialized)?;
        slot.engine.query_state(slot.sink.state_reply(query))
    }

    /// Releases the live instance: detach callbacks, stop playback, drop.
    ///
    /// Returns `false` if there was nothing to release.
    pub fn release(&mut self) -> bool {
        let Some(slot) = self.slot.take() else {
            return false;
        };

        slot.engine.detach();
        if let Err(e) = slot.engine.pause() {
            log::warn!("[Adapter] Failed to stop released player: {}", e);
        }
        log::debug!(
            "[Adapter] Released player (generation {})",
            slot.sink.generation()
        );
        true
    }
}
