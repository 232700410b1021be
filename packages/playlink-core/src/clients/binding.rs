//! The mediator's single bind point.
//!
//! Transports bind before they may talk to the session. A binding names the
//! protocol it speaks; only [`PROTOCOL_ID`] is accepted. Dropping the last
//! binding may end the process when configured to exit when idle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::lifecycle::Lifecycle;
use crate::protocol_constants::PROTOCOL_ID;

pub struct BindPoint {
    bound: AtomicUsize,
    exit_when_idle: bool,
    lifecycle: Arc<dyn Lifecycle>,
}

impl BindPoint {
    pub fn new(lifecycle: Arc<dyn Lifecycle>, exit_when_idle: bool) -> Arc<Self> {
        Arc::new(Self {
            bound: AtomicUsize::new(0),
            exit_when_idle,
            lifecycle,
        })
    }

    /// Binds a client speaking `protocol`.
    ///
    /// Returns `None` for any protocol other than [`PROTOCOL_ID`].
    pub fn bind(self: &Arc<Self>, protocol: &str) -> Option<Binding> {
        if protocol != PROTOCOL_ID {
            log::warn!("[Bind] Rejected unknown protocol {:?}", protocol);
            return None;
        }
        let bound = self.bound.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("[Bind] Client bound ({} active)", bound);
        Some(Binding {
            bind_point: Arc::clone(self),
        })
    }

    /// Number of live bindings.
    pub fn bound_count(&self) -> usize {
        self.bound.load(Ordering::SeqCst)
    }

    fn unbind(&self) {
        let remaining = self.bound.fetch_sub(1, Ordering::SeqCst) - 1;
        log::info!("[Bind] Client unbound ({} active)", remaining);
        if remaining == 0 && self.exit_when_idle {
            log::info!("[Bind] No clients left, requesting shutdown");
            self.lifecycle.request_shutdown();
        }
    }
}

/// A live binding; unbinds when dropped.
pub struct Binding {
    bind_point: Arc<BindPoint>,
}

impl Binding {
    /// Unbinds explicitly.
    pub fn release(self) {}
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.bind_point.unbind();
    }
}
