//! Multi-client broadcast through the full wiring, with a scripted engine.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use playlink_core::{
    bootstrap_services, Bitrate, BootstrappedServices, ChannelClient, ClientId, Command, Config,
    Credentials, EngineFactory, EngineResult, EngineSignal, EngineSink, EngineState,
    NoopLifecycle, PlaybackEvent, PlaybackEventKind, PlayerEngine, StateReply, TokioSpawner,
};
use tokio::sync::mpsc;

/// Engine that only reports what the test tells it to, except state
/// queries, which it answers on its own task.
struct ScriptedEngine {
    playing: Arc<AtomicBool>,
    uri: Mutex<Option<String>>,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
}

impl PlayerEngine for ScriptedEngine {
    fn play(&self, uri: &str) -> EngineResult<()> {
        *self.uri.lock() = Some(uri.to_string());
        Ok(())
    }

    fn pause(&self) -> EngineResult<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&self) -> EngineResult<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn seek_to(&self, _position_ms: u32) -> EngineResult<()> {
        Ok(())
    }

    fn set_bitrate(&self, _bitrate: Bitrate) -> EngineResult<()> {
        Ok(())
    }

    fn query_state(&self, reply: StateReply) -> EngineResult<()> {
        let state = EngineState {
            uri: self.uri.lock().clone(),
            playing: self.playing.load(Ordering::SeqCst),
            position_ms: 0,
        };
        tokio::spawn(reply.deliver(state));
        Ok(())
    }

    fn detach(&self) {}
}

#[derive(Default)]
struct ScriptedFactory {
    created: Mutex<Vec<(Arc<ScriptedEngine>, EngineSink)>>,
}

impl EngineFactory for ScriptedFactory {
    fn create(
        &self,
        _credentials: &Credentials,
        sink: EngineSink,
    ) -> EngineResult<Arc<dyn PlayerEngine>> {
        let engine = Arc::new(ScriptedEngine {
            playing: Arc::new(AtomicBool::new(false)),
            uri: Mutex::new(None),
            pauses: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
        });
        self.created.lock().push((Arc::clone(&engine), sink));
        Ok(engine)
    }
}

impl ScriptedFactory {
    fn latest(&self) -> (Arc<ScriptedEngine>, EngineSink) {
        let created = self.created.lock();
        let (engine, sink) = created.last().expect("no engine created");
        (Arc::clone(engine), sink.clone())
    }
}

fn playback(kind: PlaybackEventKind, uri: &str, playing: bool) -> EngineSignal {
    EngineSignal::Playback {
        kind,
        state: EngineState {
            uri: Some(uri.to_string()),
            playing,
            position_ms: 0,
        },
    }
}

/// Waits until the session has processed everything queued before it,
/// including state replies the scripted engine answers on spawned tasks.
async fn settle(services: &BootstrappedServices) {
    for _ in 0..20 {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        let snapshot = services.session.snapshot().await.unwrap();
        if !snapshot.pause_in_flight && !snapshot.resume_in_flight {
            return;
        }
    }
    panic!("session did not settle");
}

fn drain(rx: &mut mpsc::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

struct Setup {
    services: BootstrappedServices,
    factory: Arc<ScriptedFactory>,
    clients: Vec<mpsc::Receiver<PlaybackEvent>>,
}

async fn prepared_with_two_clients() -> Setup {
    let factory = Arc::new(ScriptedFactory::default());
    let services = bootstrap_services(
        Config::default(),
        Arc::clone(&factory) as Arc<dyn EngineFactory>,
        Arc::new(NoopLifecycle),
        TokioSpawner::current(),
    )
    .unwrap();

    let mut clients = Vec::new();
    for _ in 0..2 {
        let (client, rx) = ChannelClient::new(ClientId::new(), 16);
        services.registry.register(client);
        clients.push(rx);
    }

    services
        .session
        .send(Command::Prepare {
            uri: "track:42".into(),
            credentials: Credentials::new("token", 3600),
        })
        .await
        .unwrap();
    settle(&services).await;

    let (_engine, sink) = factory.latest();
    sink.notify(playback(PlaybackEventKind::TrackStart, "track:42", true))
        .await;
    settle(&services).await;

    Setup {
        services,
        factory,
        clients,
    }
}

#[tokio::test]
async fn both_clients_see_prepared_once() {
    let mut setup = prepared_with_two_clients().await;
    let (engine, _sink) = setup.factory.latest();
    assert_eq!(engine.pauses.load(Ordering::SeqCst), 1);

    for rx in &mut setup.clients {
        let prepared: Vec<_> = drain(rx)
            .into_iter()
            .filter(|e| matches!(e, PlaybackEvent::Prepared { .. }))
            .collect();
        assert_eq!(
            prepared,
            vec![PlaybackEvent::Prepared {
                uri: "track:42".into()
            }]
        );
    }

    setup.services.shutdown().await;
}

#[tokio::test]
async fn pause_while_playing_pauses_once_and_notifies_both_clients() {
    let mut setup = prepared_with_two_clients().await;
    let (engine, sink) = setup.factory.latest();
    for rx in &mut setup.clients {
        drain(rx);
    }

    // The engine still reports playing.
    engine.playing.store(true, Ordering::SeqCst);
    let pauses_before = engine.pauses.load(Ordering::SeqCst);

    setup.services.session.send(Command::Pause).await.unwrap();
    setup.services.session.send(Command::Pause).await.unwrap();
    settle(&setup.services).await;
    assert_eq!(engine.pauses.load(Ordering::SeqCst), pauses_before + 1);

    engine.playing.store(false, Ordering::SeqCst);
    sink.notify(playback(PlaybackEventKind::Pause, "track:42", false))
        .await;
    settle(&setup.services).await;

    for rx in &mut setup.clients {
        assert_eq!(drain(rx), vec![PlaybackEvent::PlaybackPaused]);
    }

    setup.services.shutdown().await;
}

#[tokio::test]
async fn dead_client_is_pruned_without_affecting_others() {
    let mut setup = prepared_with_two_clients().await;
    let (_engine, sink) = setup.factory.latest();
    let dead = setup.clients.remove(0);
    drop(dead);
    assert_eq!(setup.services.registry.client_count(), 2);

    sink.notify(playback(PlaybackEventKind::TrackEnd, "track:42", false))
        .await;
    settle(&setup.services).await;

    assert_eq!(setup.services.registry.client_count(), 1);
    let events = drain(&mut setup.clients[0]);
    assert_eq!(events.last(), Some(&PlaybackEvent::EndOfTrack));

    setup.services.shutdown().await;
}

#[tokio::test]
async fn errors_reach_clients_for_any_track() {
    let mut setup = prepared_with_two_clients().await;
    let (_engine, sink) = setup.factory.latest();
    for rx in &mut setup.clients {
        drain(rx);
    }

    sink.notify(playback(PlaybackEventKind::TrackEnd, "track:other", false))
        .await;
    sink.notify(EngineSignal::PlaybackError {
        kind: "decoder".into(),
        details: "corrupt frame".into(),
    })
    .await;
    settle(&setup.services).await;

    for rx in &mut setup.clients {
        assert_eq!(
            drain(rx),
            vec![PlaybackEvent::Error {
                message: "decoder: corrupt frame".into()
            }]
        );
    }

    setup.services.shutdown().await;
}
