//! In-process engine used when no real player engine is linked.
//!
//! The simulated engine honours the same asynchronous contract as a real one:
//! it initializes after a delay, confirms a prepared track with `TRACK_START`,
//! reports pause/resume transitions, ends the track after a configured length,
//! and answers state queries on its own task. All notifications of one
//! instance flow through a single pump task, so they arrive in the order the
//! engine produced them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::traits::{EngineFactory, EngineSink, PlayerEngine, StateReply};
use super::types::{
    Bitrate, ConnectionEvent, Credentials, EngineError, EngineResult, EngineSignal, EngineState,
    PlaybackEventKind,
};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::state::SimulatedEngineConfig;

/// Creates [`SimulatedEngine`] instances.
pub struct SimulatedEngineFactory {
    config: SimulatedEngineConfig,
    spawner: TokioSpawner,
    busy: Arc<AtomicBool>,
}

impl SimulatedEngineFactory {
    pub fn new(config: SimulatedEngineConfig, spawner: TokioSpawner) -> Self {
        Self {
            config,
            spawner,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes every instance reject commands as busy until cleared.
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn create(
        &self,
        credentials: &Credentials,
        sink: EngineSink,
    ) -> EngineResult<Arc<dyn PlayerEngine>> {
        let (pump_tx, pump_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            config: self.config.clone(),
            spawner: self.spawner.clone(),
            busy: Arc::clone(&self.busy),
            attached: Arc::new(AtomicBool::new(true)),
            initialized: AtomicBool::new(false),
            playhead: Mutex::new(Playhead::default()),
            pump: pump_tx,
        });

        spawn_pump(&self.spawner, pump_rx, sink, Arc::clone(&shared.attached));
        shared.schedule_init(!credentials.access_token.is_empty());

        Ok(Arc::new(SimulatedEngine { shared }))
    }
}

/// Work item for the notification pump.
enum PumpItem {
    Signal(EngineSignal),
    Reply(StateReply, EngineState),
}

fn spawn_pump(
    spawner: &TokioSpawner,
    mut rx: mpsc::UnboundedReceiver<PumpItem>,
    sink: EngineSink,
    attached: Arc<AtomicBool>,
) {
    spawner.spawn(async move {
        while let Some(item) = rx.recv().await {
            if !attached.load(Ordering::SeqCst) {
                continue;
            }
            match item {
                PumpItem::Signal(signal) => sink.notify(signal).await,
                PumpItem::Reply(reply, state) => reply.deliver(state).await,
            }
        }
    });
}

#[derive(Default)]
struct Playhead {
    uri: Option<String>,
    started: bool,
    playing: bool,
    /// Position accumulated up to `resumed_at`.
    position_ms: u64,
    resumed_at: Option<Instant>,
    /// Bumped on every transition; stale timers compare against it.
    epoch: u64,
}

impl Playhead {
    fn position(&self, track_length_ms: u64) -> u64 {
        let running = self
            .resumed_at
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        (self.position_ms + running).min(track_length_ms)
    }

    fn state(&self, track_length_ms: u64) -> EngineState {
        EngineState {
            uri: self.uri.clone(),
            playing: self.playing,
            position_ms: i32::try_from(self.position(track_length_ms)).unwrap_or(i32::MAX),
        }
    }
}

struct Shared {
    config: SimulatedEngineConfig,
    spawner: TokioSpawner,
    busy: Arc<AtomicBool>,
    attached: Arc<AtomicBool>,
    initialized: AtomicBool,
    playhead: Mutex<Playhead>,
    pump: mpsc::UnboundedSender<PumpItem>,
}

impl Shared {
    fn check_busy(&self, operation: &str) -> EngineResult<()> {
        if self.busy.load(Ordering::SeqCst) {
            return Err(EngineError::Busy(format!("{} rejected", operation)));
        }
        Ok(())
    }

    fn push(&self, item: PumpItem) {
        // The pump only stops once every sender is gone.
        let _ = self.pump.send(item);
    }

    fn playback(&self, kind: PlaybackEventKind, playhead: &Playhead) {
        self.push(PumpItem::Signal(EngineSignal::Playback {
            kind,
            state: playhead.state(self.config.track_length_ms),
        }));
    }

    fn schedule_init(self: &Arc<Self>, has_token: bool) {
        let shared = Arc::clone(self);
        let delay = Duration::from_millis(self.config.init_delay_ms);
        self.spawner.spawn(async move {
            tokio::time::sleep(delay).await;
            if !has_token {
                shared.push(PumpItem::Signal(EngineSignal::InitFailed(
                    "missing access token".into(),
                )));
                return;
            }
            shared.initialized.store(true, Ordering::SeqCst);
            shared.push(PumpItem::Signal(EngineSignal::Initialized));
            shared.push(PumpItem::Signal(EngineSignal::Connection(
                ConnectionEvent::LoggedIn,
            )));

            let mut playhead = shared.playhead.lock();
            if playhead.uri.is_some() && !playhead.started {
                shared.start_track(&mut playhead);
            }
        });
    }

    fn start_track(self: &Arc<Self>, playhead: &mut Playhead) {
        playhead.started = true;
        playhead.playing = true;
        playhead.position_ms = 0;
        playhead.resumed_at = Some(Instant::now());
        playhead.epoch += 1;
        self.playback(PlaybackEventKind::TrackStart, playhead);
        self.schedule_end(playhead.epoch, self.config.track_length_ms);
    }

    fn schedule_end(self: &Arc<Self>, epoch: u64, remaining_ms: u64) {
        let shared = Arc::clone(self);
        self.spawner.spawn(async move {
            tokio::time::sleep(Duration::from_millis(remaining_ms)).await;
            let mut playhead = shared.playhead.lock();
            if playhead.epoch != epoch || !playhead.playing {
                return;
            }
            playhead.position_ms = shared.config.track_length_ms;
            playhead.resumed_at = None;
            playhead.playing = false;
            playhead.epoch += 1;
            shared.playback(PlaybackEventKind::TrackEnd, &playhead);
        });
    }
}

/// One simulated player instance.
pub struct SimulatedEngine {
    shared: Arc<Shared>,
}

impl PlayerEngine for SimulatedEngine {
    fn play(&self, uri: &str) -> EngineResult<()> {
        self.shared.check_busy("play")?;
        let mut playhead = self.shared.playhead.lock();
        playhead.uri = Some(uri.to_string());
        playhead.started = false;
        playhead.playing = false;
        playhead.resumed_at = None;
        playhead.position_ms = 0;
        playhead.epoch += 1;
        if self.shared.initialized.load(Ordering::SeqCst) {
            self.shared.start_track(&mut playhead);
        }
        Ok(())
    }

    fn pause(&self) -> EngineResult<()> {
        self.shared.check_busy("pause")?;
        let length = self.shared.config.track_length_ms;
        let mut playhead = self.shared.playhead.lock();
        if playhead.playing {
            playhead.position_ms = playhead.position(length);
            playhead.resumed_at = None;
            playhead.playing = false;
            playhead.epoch += 1;
            self.shared.playback(PlaybackEventKind::Pause, &playhead);
        }
        Ok(())
    }

    fn resume(&self) -> EngineResult<()> {
        self.shared.check_busy("resume")?;
        let length = self.shared.config.track_length_ms;
        let mut playhead = self.shared.playhead.lock();
        if playhead.started && !playhead.playing && playhead.position_ms < length {
            playhead.playing = true;
            playhead.resumed_at = Some(Instant::now());
            playhead.epoch += 1;
            self.shared.playback(PlaybackEventKind::Play, &playhead);
            self.shared
                .schedule_end(playhead.epoch, length - playhead.position_ms);
        }
        Ok(())
    }

    fn seek_to(&self, position_ms: u32) -> EngineResult<()> {
        self.shared.check_busy("seek")?;
        let length = self.shared.config.track_length_ms;
        let mut playhead = self.shared.playhead.lock();
        if !playhead.started {
            return Ok(());
        }
        playhead.position_ms = u64::from(position_ms).min(length);
        playhead.epoch += 1;
        if playhead.playing {
            playhead.resumed_at = Some(Instant::now());
            self.shared
                .schedule_end(playhead.epoch, length - playhead.position_ms);
        }
        Ok(())
    }

    fn set_bitrate(&self, bitrate: Bitrate) -> EngineResult<()> {
        self.shared.check_busy("set_bitrate")?;
        log::debug!("[SimulatedEngine] Bitrate set to {:?}", bitrate);
        Ok(())
    }

    fn query_state(&self, reply: StateReply) -> EngineResult<()> {
        self.shared.check_busy("query_state")?;
        let state = self
            .shared
            .playhead
            .lock()
            .state(self.shared.config.track_length_ms);
        self.shared.push(PumpItem::Reply(reply, state));
        Ok(())
    }

    fn detach(&self) {
        self.shared.attached.store(false, Ordering::SeqCst);
        self.shared.playhead.lock().epoch += 1;
    }
}
