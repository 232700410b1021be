//! Application lifecycle abstraction.
//!
//! This module provides a [`Lifecycle`] trait for the process-level concerns
//! the mediator touches: holding a keepalive while it serves clients and
//! asking the host to shut down once it has nothing left to do. Different
//! implementations handle these operations for their environment.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Trait for application lifecycle operations.
pub trait Lifecycle: Send + Sync {
    /// Acquires the process keepalive (network wake lock or equivalent).
    fn acquire_keepalive(&self);

    /// Releases the process keepalive.
    ///
    /// Called during shutdown, only after the player has been released.
    fn release_keepalive(&self);

    /// Requests a graceful shutdown.
    ///
    /// The application should clean up resources and exit cleanly.
    fn request_shutdown(&self);
}

/// Server lifecycle implementation for standalone deployment.
///
/// Shutdown requests cancel a token the binary selects on alongside OS
/// signals. The keepalive is tracked as a flag; a headless server has no
/// wake lock to hold.
pub struct ServerLifecycle {
    shutdown: CancellationToken,
    keepalive: AtomicBool,
}

impl ServerLifecycle {
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            keepalive: AtomicBool::new(false),
        }
    }

    /// Token cancelled when shutdown is requested.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Whether the keepalive is currently held.
    pub fn keepalive_held(&self) -> bool {
        self.keepalive.load(Ordering::SeqCst)
    }
}

impl Default for ServerLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle for ServerLifecycle {
    fn acquire_keepalive(&self) {
        if !self.keepalive.swap(true, Ordering::SeqCst) {
            log::debug!("[Lifecycle] Keepalive acquired");
        }
    }

    fn release_keepalive(&self) {
        if self.keepalive.swap(false, Ordering::SeqCst) {
            log::debug!("[Lifecycle] Keepalive released");
        }
    }

    fn request_shutdown(&self) {
        tracing::info!("Shutdown requested");
        self.shutdown.cancel();
    }
}

/// No-op lifecycle for testing or embedded use.
///
/// Does nothing on keepalive/shutdown requests. Useful in tests or when
/// embedding the core library in an application that manages its own lifecycle.
pub struct NoopLifecycle;

impl Lifecycle for NoopLifecycle {
    fn acquire_keepalive(&self) {}

    fn release_keepalive(&self) {}

    fn request_shutdown(&self) {
        tracing::debug!("Shutdown requested (no-op)");
    }
}
