//! Trait abstractions for the external player engine.
//!
//! The engine is an opaque collaborator. The mediator only relies on the
//! narrow surface below, which keeps the session testable with scripted
//! engines and lets the server run against [`super::SimulatedEngine`].

use std::sync::Arc;

use tokio::sync::mpsc;

use super::types::{Bitrate, Credentials, EngineResult, EngineSignal, EngineState, StateQuery};
use crate::session::SessionMessage;

/// Command surface of one engine instance.
///
/// Every call is fire-and-forget: results arrive later through the
/// [`EngineSink`] the instance was created with. A call may be rejected
/// synchronously with [`EngineError::Busy`](super::EngineError::Busy) when
/// the engine's executor is saturated.
pub trait PlayerEngine: Send + Sync {
    /// Starts loading and playing `uri`.
    fn play(&self, uri: &str) -> EngineResult<()>;

    /// Pauses playback.
    fn pause(&self) -> EngineResult<()>;

    /// Resumes paused playback.
    fn resume(&self) -> EngineResult<()>;

    /// Seeks within the current track.
    fn seek_to(&self, position_ms: u32) -> EngineResult<()>;

    /// Changes the streaming bitrate.
    fn set_bitrate(&self, bitrate: Bitrate) -> EngineResult<()>;

    /// Requests the current state.
    ///
    /// The reply must be delivered later on the engine's own context,
    /// never from inside this call.
    fn query_state(&self, reply: StateReply) -> EngineResult<()>;

    /// Detaches every callback subscription of this instance.
    ///
    /// After `detach` the instance should stop using its sink. Signals that
    /// still slip through are discarded by generation.
    fn detach(&self);
}

/// Creates engine instances.
///
/// Creation returns immediately; the instance reports
/// [`EngineSignal::Initialized`] or [`EngineSignal::InitFailed`] through
/// `sink` once its asynchronous initialization finishes.
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        credentials: &Credentials,
        sink: EngineSink,
    ) -> EngineResult<Arc<dyn PlayerEngine>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Callback Plumbing
// ─────────────────────────────────────────────────────────────────────────────

/// Channel through which one engine instance reports back to the session.
///
/// Each sink carries the generation of the instance it was issued to, so the
/// session can tell a live instance from a torn-down one. The sink does not
/// keep the session inbox open: once every [`SessionHandle`] is gone the
/// session stops, and later signals are discarded.
///
/// [`SessionHandle`]: crate::session::SessionHandle
#[derive(Clone)]
pub struct EngineSink {
    generation: u64,
    tx: mpsc::WeakSender<SessionMessage>,
}

impl EngineSink {
    pub(crate) fn new(generation: u64, tx: mpsc::WeakSender<SessionMessage>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the engine instance owning this sink.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn message(
        &self,
        signal: EngineSignal,
    ) -> Option<(mpsc::Sender<SessionMessage>, SessionMessage)> {
        let tx = self.tx.upgrade()?;
        let message = SessionMessage::Engine {
            generation: self.generation,
            signal,
        };
        Some((tx, message))
    }

    /// Reports a signal from async engine code.
    pub async fn notify(&self, signal: EngineSignal) {
        let Some((tx, message)) = self.message(signal) else {
            log::debug!("[Engine] Session gone, dropping signal");
            return;
        };
        if tx.send(message).await.is_err() {
            log::debug!("[Engine] Session closed, dropping signal");
        }
    }

    /// Reports a signal from an engine-owned OS thread.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async execution context.
    pub fn notify_blocking(&self, signal: EngineSignal) {
        let Some((tx, message)) = self.message(signal) else {
            log::debug!("[Engine] Session gone, dropping signal");
            return;
        };
        if tx.blocking_send(message).is_err() {
            log::debug!("[Engine] Session closed, dropping signal");
        }
    }

    /// Creates the reply slot for a state query.
    pub(crate) fn state_reply(&self, query: StateQuery) -> StateReply {
        StateReply {
            sink: self.clone(),
            query,
        }
    }
}

/// One-shot reply slot for [`PlayerEngine::query_state`].
pub struct StateReply {
    sink: EngineSink,
    query: StateQuery,
}

impl StateReply {
    /// Purpose of the query this reply answers.
    pub fn query(&self) -> StateQuery {
        self.query
    }

    fn into_message(
        self,
        state: EngineState,
    ) -> Option<(mpsc::Sender<SessionMessage>, SessionMessage)> {
        let tx = self.sink.tx.upgrade()?;
        let message = SessionMessage::StateReply {
            generation: self.sink.generation,
            query: self.query,
            state,
        };
        Some((tx, message))
    }

    /// Delivers the queried state from async engine code.
    pub async fn deliver(self, state: EngineState) {
        let Some((tx, message)) = self.into_message(state) else {
            log::debug!("[Engine] Session gone, dropping state reply");
            return;
        };
        if tx.send(message).await.is_err() {
            log::debug!("[Engine] Session closed, dropping state reply");
        }
    }

    /// Delivers the queried state from an engine-owned OS thread.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async execution context.
    pub fn deliver_blocking(self, state: EngineState) {
        let Some((tx, message)) = self.into_message(state) else {
            log::debug!("[Engine] Session gone, dropping state reply");
            return;
        };
        if tx.blocking_send(message).is_err() {
            log::debug!("[Engine] Session closed, dropping state reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_stamps_generation_on_signals() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = EngineSink::new(7, tx.downgrade());

        sink.notify(EngineSignal::Initialized).await;

        match rx.recv().await {
            Some(SessionMessage::Engine { generation, signal }) => {
                assert_eq!(generation, 7);
                assert_eq!(signal, EngineSignal::Initialized);
            }
            _ => panic!("Expected engine signal"),
        }
    }

    #[tokio::test]
    async fn state_reply_carries_query_purpose() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = EngineSink::new(3, tx.downgrade());
        let reply = sink.state_reply(StateQuery::Pause);
        assert_eq!(reply.query(), StateQuery::Pause);

        reply
            .deliver(EngineState {
                uri: Some("track:1".into()),
                playing: true,
                position_ms: 10,
            })
            .await;

        match rx.recv().await {
            Some(SessionMessage::StateReply {
                generation,
                query,
                state,
            }) => {
                assert_eq!(generation, 3);
                assert_eq!(query, StateQuery::Pause);
                assert!(state.playing);
            }
            _ => panic!("Expected state reply"),
        }
    }

    #[tokio::test]
    async fn notify_after_session_closed_is_silent() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = EngineSink::new(1, tx.downgrade());
        sink.notify(EngineSignal::Initialized).await;
    }

    #[tokio::test]
    async fn sink_does_not_keep_session_inbox_open() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = EngineSink::new(1, tx.downgrade());
        drop(tx);

        assert!(rx.recv().await.is_none());
        sink.notify(EngineSignal::Initialized).await;
        sink.state_reply(StateQuery::Position)
            .deliver(EngineState::default())
            .await;
    }
}
