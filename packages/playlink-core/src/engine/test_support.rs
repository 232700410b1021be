//! Scripted engine shared by the adapter and session tests.
//!
//! Calls are recorded instead of executed; state-query replies are parked
//! until the test delivers them, which makes reply timing fully controllable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::traits::{EngineFactory, EngineSink, PlayerEngine, StateReply};
use super::types::{Bitrate, Credentials, EngineError, EngineResult, StateQuery};

/// A call accepted by [`MockEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Play(String),
    Pause,
    Resume,
    SeekTo(u32),
    SetBitrate(Bitrate),
    QueryState(StateQuery),
    Detach,
}

pub struct MockEngine {
    calls: Mutex<Vec<EngineCall>>,
    replies: Mutex<Vec<StateReply>>,
    busy: AtomicBool,
}

impl MockEngine {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    /// Takes every parked state-query reply, oldest first.
    pub fn take_replies(&self) -> Vec<StateReply> {
        std::mem::take(&mut *self.replies.lock())
    }

    fn accept(&self, call: EngineCall) -> EngineResult<()> {
        if self.busy.load(Ordering::SeqCst) {
            return Err(EngineError::Busy(format!("{:?} rejected", call)));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl PlayerEngine for MockEngine {
    fn play(&self, uri: &str) -> EngineResult<()> {
        self.accept(EngineCall::Play(uri.to_string()))
    }

    fn pause(&self) -> EngineResult<()> {
        self.accept(EngineCall::Pause)
    }

    fn resume(&self) -> EngineResult<()> {
        self.accept(EngineCall::Resume)
    }

    fn seek_to(&self, position_ms: u32) -> EngineResult<()> {
        self.accept(EngineCall::SeekTo(position_ms))
    }

    fn set_bitrate(&self, bitrate: Bitrate) -> EngineResult<()> {
        self.accept(EngineCall::SetBitrate(bitrate))
    }

    fn query_state(&self, reply: StateReply) -> EngineResult<()> {
        self.accept(EngineCall::QueryState(reply.query()))?;
        self.replies.lock().push(reply);
        Ok(())
    }

    fn detach(&self) {
        self.calls.lock().push(EngineCall::Detach);
    }
}

#[derive(Default)]
pub struct MockEngineFactory {
    engines: Mutex<Vec<Arc<MockEngine>>>,
    fail_next: Mutex<Option<String>>,
}

impl MockEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `index`-th engine created, in creation order.
    pub fn engine(&self, index: usize) -> Arc<MockEngine> {
        Arc::clone(&self.engines.lock()[index])
    }

    pub fn latest(&self) -> Arc<MockEngine> {
        let engines = self.engines.lock();
        Arc::clone(engines.last().expect("no engine created"))
    }

    pub fn created(&self) -> usize {
        self.engines.lock().len()
    }

    pub fn fail_next_create(&self, reason: &str) {
        *self.fail_next.lock() = Some(reason.to_string());
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(
        &self,
        _credentials: &Credentials,
        _sink: EngineSink,
    ) -> EngineResult<Arc<dyn PlayerEngine>> {
        if let Some(reason) = self.fail_next.lock().take() {
            return Err(EngineError::InitFailed(reason));
        }
        let engine = Arc::new(MockEngine::new());
        self.engines.lock().push(Arc::clone(&engine));
        Ok(engine)
    }
}
