//! The session actor: single owner of the playback session.
//!
//! Client commands and engine callbacks arrive on one bounded inbox and are
//! handled strictly one at a time, so session state needs no locking. Engine
//! calls made from here are fire-and-forget; their outcomes come back through
//! the same inbox as [`SessionMessage::Engine`] or
//! [`SessionMessage::StateReply`], stamped with the generation of the engine
//! instance that produced them.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::state::{Attribution, SessionSnapshot, SessionState};
use crate::command::{BitrateLevel, Command};
use crate::dispatcher::DispatchError;
use crate::engine::{
    ConnectionEvent, Credentials, EngineFactory, EngineSignal, EngineState, PlaybackEventKind,
    PlayerAdapter, StateQuery,
};
use crate::error::ErrorCode;
use crate::events::{EventEmitter, PlaybackEvent};
use crate::protocol_constants::{LOST_PERMISSION_MESSAGE, MIN_SEEK_POSITION_MS};
use crate::runtime::TaskSpawner;
use crate::utils::now_millis;

/// Everything the session actor can receive.
pub enum SessionMessage {
    /// A client command, already validated by the dispatcher.
    Command(Command),
    /// A callback from the engine instance of `generation`.
    Engine { generation: u64, signal: EngineSignal },
    /// The answer to a state query issued for `query`.
    StateReply {
        generation: u64,
        query: StateQuery,
        state: EngineState,
    },
    /// Request for a point-in-time copy of the session.
    Snapshot(oneshot::Sender<SessionSnapshot>),
    /// Release the player and stop; acknowledged once torn down.
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle for talking to a running [`SessionActor`].
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionMessage>,
}

impl SessionHandle {
    /// Queues a command. Waits only if the inbox is full.
    pub async fn send(&self, command: Command) -> Result<(), DispatchError> {
        self.tx
            .send(SessionMessage::Command(command))
            .await
            .map_err(|_| DispatchError::SessionClosed)
    }

    /// Fetches a snapshot of the session state.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, DispatchError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(SessionMessage::Snapshot(tx))
            .await
            .map_err(|_| DispatchError::SessionClosed)?;
        rx.await.map_err(|_| DispatchError::SessionClosed)
    }

    /// Shuts the session down and waits until the player is released.
    ///
    /// Returns immediately if the actor has already stopped.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(SessionMessage::Shutdown(tx)).await.is_err() {
            return;
        }
        let _ = rx.await;
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owns the session state and the player adapter.
pub struct SessionActor {
    state: SessionState,
    adapter: PlayerAdapter,
    emitter: Arc<dyn EventEmitter>,
    inbox: mpsc::Receiver<SessionMessage>,
}

impl SessionActor {
    /// Creates an actor with an inbox of `capacity` messages.
    ///
    /// The actor does nothing until [`run`](Self::run) is polled.
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        emitter: Arc<dyn EventEmitter>,
        capacity: usize,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        let actor = Self {
            state: SessionState::default(),
            adapter: PlayerAdapter::new(factory, tx.downgrade()),
            emitter,
            inbox: rx,
        };
        (actor, SessionHandle { tx })
    }

    /// Runs the actor on `spawner`.
    pub fn spawn<S: TaskSpawner>(self, spawner: &S) {
        spawner.spawn(self.run());
    }

    /// Processes messages until shutdown, or until every [`SessionHandle`]
    /// has been dropped.
    pub async fn run(mut self) {
        log::info!("[Session] Actor started");
        while let Some(message) = self.inbox.recv().await {
            if self.handle(message).is_break() {
                break;
            }
        }
        self.teardown();
        log::info!("[Session] Actor stopped");
    }

    fn handle(&mut self, message: SessionMessage) -> ControlFlow<()> {
        match message {
            SessionMessage::Command(command) => self.handle_command(command),
            SessionMessage::Engine { generation, signal } => {
                self.handle_signal(generation, signal)
            }
            SessionMessage::StateReply {
                generation,
                query,
                state,
            } => self.handle_state_reply(generation, query, state),
            SessionMessage::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            SessionMessage::Shutdown(ack) => {
                self.teardown();
                let _ = ack.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot(self.adapter.generation())
    }

    fn emit(&self, event: PlaybackEvent) {
        log::debug!("[Session] Emitting {}", event.name());
        self.emitter.emit(event);
    }

    fn emit_position(&self, position_ms: i32) {
        self.emit(PlaybackEvent::PositionChanged {
            position_ms,
            timestamp_ms: now_millis(),
        });
    }

    /// Releases the player and forgets the session. Safe to repeat.
    fn teardown(&mut self) {
        if self.adapter.release() {
            log::info!("[Session] Player released");
        }
        self.state.reset();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_command(&mut self, command: Command) {
        log::debug!("[Session] Command: {}", command.name());
        match command {
            Command::Prepare { uri, credentials } => self.handle_prepare(uri, credentials),
            Command::Play => self.handle_play(),
            Command::Pause => self.handle_pause(),
            Command::Seek { position_ms } => self.handle_seek(position_ms),
            Command::SetBitrate { level } => self.handle_set_bitrate(level),
        }
    }

    fn handle_prepare(&mut self, uri: String, credentials: Credentials) {
        log::info!("[Session] Preparing {}", uri);
        self.state.begin_prepare(&uri);

        if let Err(e) = self.adapter.prepare(&uri, &credentials) {
            log::error!("[Session] Failed to prepare {} ({}): {}", uri, e.code(), e);
        }

        self.emit_position(0);
    }

    fn handle_play(&mut self) {
        if !self.adapter.has_engine() {
            log::debug!("[Session] Play ignored, no player");
            return;
        }
        self.state.desired_playing = true;
        if self.state.resume_in_flight {
            log::debug!("[Session] Play coalesced with in-flight resume");
            return;
        }

        self.state.resume_in_flight = true;
        if let Err(e) = self.adapter.query_state(StateQuery::Resume) {
            self.state.resume_in_flight = false;
            log::warn!("[Session] Play dropped ({}): {}", e.code(), e);
        }
    }

    fn handle_pause(&mut self) {
        if !self.adapter.has_engine() {
            log::debug!("[Session] Pause ignored, no player");
            return;
        }
        self.state.desired_playing = false;
        if self.state.pause_in_flight {
            log::debug!("[Session] Pause coalesced with in-flight pause");
            return;
        }

        self.state.pause_in_flight = true;
        if let Err(e) = self.adapter.query_state(StateQuery::Pause) {
            self.state.pause_in_flight = false;
            log::warn!("[Session] Pause dropped ({}): {}", e.code(), e);
        }
    }

    fn handle_seek(&mut self, position_ms: i32) {
        if !self.adapter.has_engine() {
            log::debug!("[Session] Seek ignored, no player");
            return;
        }
        let target = position_ms.max(MIN_SEEK_POSITION_MS as i32);

        match self.adapter.seek_to(target as u32) {
            // Reported before the engine confirms the new position.
            Ok(()) => self.emit_position(target),
            Err(e) => log::warn!(
                "[Session] Seek to {}ms dropped ({}): {}",
                target,
                e.code(),
                e
            ),
        }
    }

    fn handle_set_bitrate(&mut self, level: BitrateLevel) {
        if !self.adapter.has_engine() {
            log::debug!("[Session] Bitrate change ignored, no player");
            return;
        }
        let Some(bitrate) = level.resolve() else {
            log::warn!("[Session] Ignoring unrecognized bitrate level {:?}", level);
            return;
        };

        if let Err(e) = self.adapter.set_bitrate(bitrate) {
            log::warn!("[Session] Bitrate change dropped ({}): {}", e.code(), e);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State Replies
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_state_reply(&mut self, generation: u64, query: StateQuery, state: EngineState) {
        if !self.adapter.is_current(generation) {
            log::debug!(
                "[Session] Dropping {:?} reply from stale player (generation {})",
                query,
                generation
            );
            return;
        }

        match query {
            StateQuery::Resume => {
                self.state.resume_in_flight = false;
                if self.state.desired_playing && !state.playing {
                    if let Err(e) = self.adapter.resume() {
                        log::warn!("[Session] Resume dropped ({}): {}", e.code(), e);
                    }
                }
            }
            StateQuery::Pause => {
                self.state.pause_in_flight = false;
                if !self.state.desired_playing && state.playing {
                    if let Err(e) = self.adapter.pause() {
                        log::warn!("[Session] Pause dropped ({}): {}", e.code(), e);
                    }
                }
            }
            StateQuery::Position => self.emit_position(state.position_ms),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Engine Signals
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_signal(&mut self, generation: u64, signal: EngineSignal) {
        if !self.adapter.is_current(generation) {
            log::debug!(
                "[Session] Dropping signal from stale player (generation {})",
                generation
            );
            return;
        }

        match signal {
            EngineSignal::Initialized => {
                log::info!("[Session] Player initialized (generation {})", generation);
            }
            EngineSignal::InitFailed(reason) => {
                log::error!("[Session] Player initialization failed: {}", reason);
            }
            EngineSignal::Connection(event) => log_connection(&event),
            EngineSignal::PlaybackError { kind, details } => {
                log::warn!("[Session] Playback error {}: {}", kind, details);
                self.emit(PlaybackEvent::Error {
                    message: format!("{}: {}", kind, details),
                });
            }
            EngineSignal::Playback { kind, state } => self.handle_playback(kind, state),
        }
    }

    fn handle_playback(&mut self, kind: PlaybackEventKind, state: EngineState) {
        let Some(uri) = state.uri.as_deref() else {
            log::debug!("[Session] Ignoring {:?} without a track", kind);
            return;
        };

        match (self.state.attribute(uri), kind) {
            (Attribution::Preparing, PlaybackEventKind::TrackStart) => self.confirm_prepared(),
            (Attribution::Prepared, PlaybackEventKind::TrackEnd) => {
                self.emit(PlaybackEvent::EndOfTrack)
            }
            (Attribution::Prepared, PlaybackEventKind::Pause) => {
                self.state.pause_in_flight = false;
                self.emit(PlaybackEvent::PlaybackPaused);
            }
            (Attribution::Prepared, PlaybackEventKind::Play) => {
                self.state.resume_in_flight = false;
                self.emit(PlaybackEvent::PlaybackStarted);
            }
            (Attribution::Prepared, PlaybackEventKind::LostPermission) => {
                self.emit(PlaybackEvent::Error {
                    message: LOST_PERMISSION_MESSAGE.to_string(),
                })
            }
            (Attribution::Foreign, _) => {
                log::debug!("[Session] Ignoring {:?} for foreign track {}", kind, uri);
            }
            _ => {
                log::debug!("[Session] Ignoring {:?} for {}", kind, uri);
            }
        }
    }

    /// The engine started the preparing track: hold it paused and announce it.
    fn confirm_prepared(&mut self) {
        let Some(uri) = self.state.confirm_prepared() else {
            return;
        };

        if let Err(e) = self.adapter.pause() {
            log::warn!("[Session] Failed to hold {} paused: {}", uri, e);
        }
        log::info!("[Session] Prepared {}", uri);
        self.emit(PlaybackEvent::Prepared { uri });

        if let Err(e) = self.adapter.query_state(StateQuery::Position) {
            log::debug!("[Session] Position query dropped ({}): {}", e.code(), e);
        }
    }
}

fn log_connection(event: &ConnectionEvent) {
    match event {
        ConnectionEvent::LoggedIn => log::info!("[Session] Engine logged in"),
        ConnectionEvent::LoggedOut => log::info!("[Session] Engine logged out"),
        ConnectionEvent::LoginFailed(reason) => {
            log::warn!("[Session] Engine login failed: {}", reason)
        }
        ConnectionEvent::TemporaryError => log::warn!("[Session] Engine connection error"),
        ConnectionEvent::Message(message) => {
            log::info!("[Session] Engine message: {}", message)
        }
    }
}
