//! Bookkeeping for open client sockets.
//!
//! Every socket gets a `ws-N` [`ClientId`] and a cancel token derived from the
//! manager's current root token. Cancelling the root ends every socket loop
//! at once, which is how server shutdown disconnects clients. A socket also
//! ends when the registry drops its client, since the same token is handed to
//! the [`ChannelClient`](crate::clients::ChannelClient).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::clients::ClientId;

struct OpenSocket {
    opened_at: Instant,
}

/// Open sockets, keyed by the client id each one speaks for.
pub struct WsConnectionManager {
    sockets: DashMap<ClientId, OpenSocket>,
    next_id: AtomicU64,
    /// Root of the tokens handed to sockets opened since the last `close_all`.
    root: RwLock<CancellationToken>,
}

impl WsConnectionManager {
    pub fn new() -> Self {
        Self {
            sockets: DashMap::new(),
            next_id: AtomicU64::new(1),
            root: RwLock::new(CancellationToken::new()),
        }
    }

    /// Records a new socket. Dropping the returned guard forgets it.
    pub fn register(self: &Arc<Self>) -> ConnectionGuard {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let client_id = ClientId::from(format!("ws-{}", n));
        let cancel_token = self.root.read().child_token();

        self.sockets.insert(
            client_id.clone(),
            OpenSocket {
                opened_at: Instant::now(),
            },
        );
        log::info!(
            "[WS] Socket {} opened ({} open)",
            client_id,
            self.sockets.len()
        );

        ConnectionGuard {
            client_id,
            manager: Arc::clone(self),
            cancel_token,
        }
    }

    fn forget(&self, id: &ClientId) {
        if let Some((_, socket)) = self.sockets.remove(id) {
            log::info!(
                "[WS] Socket {} closed after {:?} ({} open)",
                id,
                socket.opened_at.elapsed(),
                self.sockets.len()
            );
        }
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.sockets.len()
    }

    /// Ends every open socket and returns how many were told to close.
    ///
    /// Sockets opened afterwards hang off a fresh root and are unaffected.
    pub fn close_all(&self) -> usize {
        let open = self.sockets.len();
        if open > 0 {
            log::info!("[WS] Closing {} socket(s)", open);
            let mut root = self.root.write();
            root.cancel();
            *root = CancellationToken::new();
        }
        open
    }
}

impl Default for WsConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Membership of one socket in the manager.
pub struct ConnectionGuard {
    client_id: ClientId,
    manager: Arc<WsConnectionManager>,
    cancel_token: CancellationToken,
}

impl ConnectionGuard {
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.forget(&self.client_id);
    }
}
