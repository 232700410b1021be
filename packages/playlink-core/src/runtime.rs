//! Task spawning abstraction for runtime independence.
//!
//! The session actor and the simulated engine both run as background tasks.
//! They are started through [`TaskSpawner`] so that an embedding application
//! can supply its own executor while the standalone server uses Tokio directly.

use std::future::Future;

/// Abstraction for spawning background tasks.
///
/// Spawned tasks are detached: the caller coordinates with them through
/// channels (the session actor acknowledges shutdown over a oneshot), never
/// through join handles.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a detached background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner for the standalone server and tests.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a spawner bound to the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a spawner bound to the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
