//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. This pattern provides:
//!
//! - **Clarity**: All dependency relationships are visible in one place
//! - **Testability**: Easy to swap implementations for testing
//! - **Maintainability**: Service creation logic is isolated from usage

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::{AppState, WsConnectionManager};
use crate::clients::{BindPoint, ClientRegistry};
use crate::dispatcher::CommandDispatcher;
use crate::engine::{EngineFactory, SimulatedEngineFactory};
use crate::error::{PlaylinkError, PlaylinkResult};
use crate::events::EventEmitter;
use crate::lifecycle::Lifecycle;
use crate::runtime::TokioSpawner;
use crate::session::{SessionActor, SessionHandle};
use crate::state::Config;

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Handle to the running session actor.
    pub session: SessionHandle,
    /// Entry point for client messages.
    pub dispatcher: Arc<CommandDispatcher>,
    /// Subscribed clients; the session's event sink.
    pub registry: Arc<ClientRegistry>,
    /// Protocol-checked bind point.
    pub bind_point: Arc<BindPoint>,
    /// Manages WebSocket connections.
    pub ws_manager: Arc<WsConnectionManager>,
    /// Host lifecycle (keepalive, shutdown requests).
    pub lifecycle: Arc<dyn Lifecycle>,
    pub config: Arc<Config>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    shut_down: Arc<AtomicBool>,
}

impl BootstrappedServices {
    /// Builds the API state over these services.
    pub fn app_state(&self) -> AppState {
        AppState {
            session: self.session.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
            registry: Arc::clone(&self.registry),
            bind_point: Arc::clone(&self.bind_point),
            ws_manager: Arc::clone(&self.ws_manager),
            config: Arc::clone(&self.config),
        }
    }

    /// Gracefully shuts down all services.
    ///
    /// The player is released before client connections are closed, and the
    /// keepalive goes last. Repeated calls return immediately.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.session.shutdown().await;

        let connections_closed = self.ws_manager.close_all();
        if connections_closed > 0 {
            log::info!(
                "[Bootstrap] Closed {} WebSocket connection(s)",
                connections_closed
            );
        }
        self.registry.clear();

        self.lifecycle.release_keepalive();
        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Wires every service around `factory` and starts the session actor.
///
/// Must be called from within a Tokio runtime.
pub fn bootstrap_services(
    config: Config,
    factory: Arc<dyn EngineFactory>,
    lifecycle: Arc<dyn Lifecycle>,
    spawner: TokioSpawner,
) -> PlaylinkResult<BootstrappedServices> {
    config.validate().map_err(PlaylinkError::Configuration)?;

    lifecycle.acquire_keepalive();

    let registry = Arc::new(ClientRegistry::new());
    let (actor, session) = SessionActor::new(
        factory,
        Arc::clone(&registry) as Arc<dyn EventEmitter>,
        config.command_channel_capacity,
    );
    actor.spawn(&spawner);

    let dispatcher = Arc::new(CommandDispatcher::new(
        session.clone(),
        Arc::clone(&registry),
    ));
    let bind_point = BindPoint::new(Arc::clone(&lifecycle), config.exit_when_idle);

    Ok(BootstrappedServices {
        session,
        dispatcher,
        registry,
        bind_point,
        ws_manager: Arc::new(WsConnectionManager::new()),
        lifecycle,
        config: Arc::new(config),
        spawner,
        shut_down: Arc::new(AtomicBool::new(false)),
    })
}

/// Bootstraps against the in-process simulated engine.
pub fn bootstrap_simulated(
    config: Config,
    lifecycle: Arc<dyn Lifecycle>,
) -> PlaylinkResult<BootstrappedServices> {
    let spawner = TokioSpawner::current();
    let factory = Arc::new(SimulatedEngineFactory::new(
        config.engine.clone(),
        spawner.clone(),
    ));
    bootstrap_services(config, factory, lifecycle, spawner)
}
