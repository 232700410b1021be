//! Client registry and broadcaster.
//!
//! The registry holds every subscribed client and fans each playback event out
//! to all of them. Delivery is queue-based and never blocks, so the fan-out
//! runs under the membership lock and every client observes events in
//! broadcast order. A client whose delivery fails is removed on the spot and
//! told to close its transport; the remaining clients still receive the event.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::events::{EventEmitter, PlaybackEvent};

/// Stable identity of a subscribed client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(format!("client-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why an event could not be handed to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The client's receiving side is gone.
    #[error("client disconnected")]
    Disconnected,

    /// The client stopped draining its queue.
    #[error("client queue full")]
    Backlogged,
}

/// Something events can be delivered to.
pub trait ClientSink: Send + Sync {
    fn id(&self) -> &ClientId;

    /// Hands `event` to the client without blocking.
    ///
    /// Any error marks the client unreachable.
    fn deliver(&self, event: &PlaybackEvent) -> Result<(), DeliveryError>;

    /// Called once the registry has dropped this client.
    ///
    /// A transport that is still open must shut down, so the remote end
    /// learns it no longer receives events.
    fn close(&self) {}
}

/// Client backed by a bounded event queue.
///
/// A client that falls `capacity` events behind is dropped like a dead one;
/// its close token is cancelled so the owning connection winds down instead
/// of idling without events.
pub struct ChannelClient {
    id: ClientId,
    tx: mpsc::Sender<PlaybackEvent>,
    close: CancellationToken,
}

impl ChannelClient {
    /// Creates a client and the receiving end its transport drains.
    pub fn new(id: ClientId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<PlaybackEvent>) {
        Self::with_close_token(id, capacity, CancellationToken::new())
    }

    /// Like [`ChannelClient::new`], cancelling `close` when the registry
    /// drops the client.
    pub fn with_close_token(
        id: ClientId,
        capacity: usize,
        close: CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<PlaybackEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(Self { id, tx, close }), rx)
    }
}

impl ClientSink for ChannelClient {
    fn id(&self) -> &ClientId {
        &self.id
    }

    fn deliver(&self, event: &PlaybackEvent) -> Result<(), DeliveryError> {
        self.tx.try_send(event.clone()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backlogged,
            TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }

    fn close(&self) {
        self.close.cancel();
    }
}

/// The set of subscribed clients.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<Vec<Arc<dyn ClientSink>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client.
    ///
    /// Registration is keyed by [`ClientId`]: registering an id that is
    /// already present is a no-op and returns `false`.
    pub fn register(&self, client: Arc<dyn ClientSink>) -> bool {
        let mut clients = self.clients.lock();
        if clients.iter().any(|c| c.id() == client.id()) {
            log::debug!("[Registry] {} already registered", client.id());
            return false;
        }
        log::info!("[Registry] Registered {}", client.id());
        clients.push(client);
        true
    }

    /// Removes a client. Removing an unknown id is a silent no-op.
    pub fn unregister(&self, id: &ClientId) -> bool {
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|c| c.id() != id);
        let removed = clients.len() != before;
        if removed {
            log::info!("[Registry] Unregistered {}", id);
        }
        removed
    }

    /// Delivers `event` to every client, dropping unreachable ones.
    ///
    /// Returns the number of clients that received the event.
    pub fn broadcast(&self, event: &PlaybackEvent) -> usize {
        let mut clients = self.clients.lock();
        clients.retain(|client| match client.deliver(event) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "[Registry] Dropping {} after failed {} delivery ({}): {}",
                    client.id(),
                    event.name(),
                    e.code(),
                    e
                );
                client.close();
                false
            }
        });
        clients.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.clients.lock().iter().any(|c| c.id() == id)
    }

    /// Drops every client.
    pub fn clear(&self) {
        self.clients.lock().clear();
    }
}

impl EventEmitter for ClientRegistry {
    fn emit(&self, event: PlaybackEvent) {
        self.broadcast(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Sink that counts deliveries and can be switched to failing.
    struct CountingSink {
        id: ClientId,
        delivered: AtomicUsize,
        dead: AtomicBool,
    }

    impl CountingSink {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: ClientId::from(id),
                delivered: AtomicUsize::new(0),
                dead: AtomicBool::new(false),
            })
        }

        fn delivered(&self) -> usize {
            self.delivered.load(Ordering::SeqCst)
        }
    }

    impl ClientSink for CountingSink {
        fn id(&self) -> &ClientId {
            &self.id
        }

        fn deliver(&self, _event: &PlaybackEvent) -> Result<(), DeliveryError> {
            if self.dead.load(Ordering::SeqCst) {
                return Err(DeliveryError::Disconnected);
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn registered_client_receives_each_broadcast_once() {
        let registry = ClientRegistry::new();
        let client = CountingSink::new("a");
        assert!(registry.register(client.clone()));

        registry.broadcast(&PlaybackEvent::EndOfTrack);
        assert_eq!(client.delivered(), 1);
    }

    #[test]
    fn unregistered_client_receives_nothing() {
        let registry = ClientRegistry::new();
        let client = CountingSink::new("a");
        registry.register(client.clone());

        assert!(registry.unregister(&ClientId::from("a")));
        registry.broadcast(&PlaybackEvent::EndOfTrack);

        assert_eq!(client.delivered(), 0);
        assert!(!registry.unregister(&ClientId::from("a")));
    }

    #[test]
    fn duplicate_registration_is_deduplicated() {
        let registry = ClientRegistry::new();
        let client = CountingSink::new("a");
        assert!(registry.register(client.clone()));
        assert!(!registry.register(client.clone()));

        registry.broadcast(&PlaybackEvent::PlaybackStarted);
        assert_eq!(registry.client_count(), 1);
        assert_eq!(client.delivered(), 1);
    }

    #[test]
    fn dead_client_is_removed_and_others_still_receive() {
        let registry = ClientRegistry::new();
        let a = CountingSink::new("a");
        let b = CountingSink::new("b");
        let c = CountingSink::new("c");
        for client in [&a, &b, &c] {
            registry.register(client.clone());
        }
        b.dead.store(true, Ordering::SeqCst);

        let delivered = registry.broadcast(&PlaybackEvent::PlaybackPaused);

        assert_eq!(delivered, 2);
        assert_eq!(a.delivered(), 1);
        assert_eq!(c.delivered(), 1);
        assert!(!registry.contains(&ClientId::from("b")));
        assert_eq!(registry.client_count(), 2);
    }

    #[tokio::test]
    async fn channel_client_preserves_broadcast_order() {
        let registry = ClientRegistry::new();
        let (client, mut rx) = ChannelClient::new(ClientId::new(), 8);
        registry.register(client);

        registry.emit(PlaybackEvent::Prepared {
            uri: "track:1".into(),
        });
        registry.emit(PlaybackEvent::PlaybackStarted);
        registry.emit(PlaybackEvent::EndOfTrack);

        assert_eq!(
            rx.recv().await,
            Some(PlaybackEvent::Prepared {
                uri: "track:1".into()
            })
        );
        assert_eq!(rx.recv().await, Some(PlaybackEvent::PlaybackStarted));
        assert_eq!(rx.recv().await, Some(PlaybackEvent::EndOfTrack));
    }

    #[test]
    fn channel_client_reports_backlog_and_disconnect() {
        let (client, rx) = ChannelClient::new(ClientId::new(), 1);
        assert_eq!(client.deliver(&PlaybackEvent::EndOfTrack), Ok(()));
        assert_eq!(
            client.deliver(&PlaybackEvent::EndOfTrack),
            Err(DeliveryError::Backlogged)
        );

        drop(rx);
        assert_eq!(
            client.deliver(&PlaybackEvent::EndOfTrack),
            Err(DeliveryError::Disconnected)
        );
    }

    #[tokio::test]
    async fn backlogged_client_is_dropped_and_its_transport_closed() {
        let registry = ClientRegistry::new();
        let close = CancellationToken::new();
        let (slow, mut slow_rx) =
            ChannelClient::with_close_token(ClientId::from("slow"), 2, close.clone());
        let (fast, mut fast_rx) = ChannelClient::new(ClientId::from("fast"), 8);
        registry.register(slow);
        registry.register(fast);

        registry.emit(PlaybackEvent::PositionChanged {
            position_ms: 0,
            timestamp_ms: 0,
        });
        registry.emit(PlaybackEvent::Prepared {
            uri: "track:42".into(),
        });
        assert!(!close.is_cancelled());

        registry.emit(PlaybackEvent::PlaybackPaused);

        assert!(close.is_cancelled());
        assert!(!registry.contains(&ClientId::from("slow")));
        assert!(registry.contains(&ClientId::from("fast")));

        // The slow client still drains what it was sent before the cut-off.
        assert!(slow_rx.recv().await.is_some());
        assert!(slow_rx.recv().await.is_some());
        assert!(slow_rx.try_recv().is_err());

        for _ in 0..3 {
            assert!(fast_rx.recv().await.is_some());
        }
    }

    #[test]
    fn disconnected_client_close_is_signalled() {
        let registry = ClientRegistry::new();
        let close = CancellationToken::new();
        let (client, rx) = ChannelClient::with_close_token(ClientId::from("gone"), 4, close.clone());
        registry.register(client);
        drop(rx);

        assert_eq!(registry.broadcast(&PlaybackEvent::EndOfTrack), 0);
        assert!(close.is_cancelled());
    }

    #[test]
    fn client_ids_are_unique() {
        assert_ne!(ClientId::new(), ClientId::new());
        assert!(ClientId::new().as_str().starts_with("client-"));
    }
}
