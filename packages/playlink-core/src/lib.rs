//! Playlink Core - playback-control mediator.
//!
//! This crate sits between any number of remote clients and a single
//! streaming player engine. Client commands (prepare, play, pause, seek,
//! set bitrate) become engine calls; asynchronous engine callbacks become
//! events broadcast to every registered client.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`engine`]: The engine boundary and the adapter owning the live instance
//! - [`session`]: The actor that owns session state and serializes all input
//! - [`clients`]: Client registry, broadcast and the protocol bind point
//! - [`dispatcher`]: Parsing and routing of inbound client messages
//! - [`api`]: HTTP/WebSocket transport
//! - [`state`]: Configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`PlayerEngine`](engine::PlayerEngine) / [`EngineFactory`](engine::EngineFactory):
//!   The external player
//! - [`EventEmitter`](events::EventEmitter): Publishing playback events
//! - [`ClientSink`](clients::ClientSink): Delivering events to one client
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`Lifecycle`](lifecycle::Lifecycle): Keepalive and shutdown requests
//!
//! Each trait has an implementation suitable for the standalone server.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod clients;
pub mod command;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod protocol_constants;
pub mod runtime;
pub mod session;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use clients::{BindPoint, Binding, ChannelClient, ClientId, ClientRegistry, ClientSink};
pub use command::{BitrateLevel, Command};
pub use dispatcher::{ClientMessage, CommandDispatcher, DispatchError, Reply};
pub use engine::{
    Bitrate, Credentials, EngineError, EngineFactory, EngineResult, EngineSignal, EngineSink,
    EngineState, PlaybackEventKind, PlayerEngine, SimulatedEngineFactory, StateReply,
};
pub use error::{ErrorCode, PlaylinkError, PlaylinkResult};
pub use events::{EventEmitter, PlaybackEvent};
pub use lifecycle::{Lifecycle, NoopLifecycle, ServerLifecycle};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use session::{SessionActor, SessionHandle, SessionPhase, SessionSnapshot};
pub use state::{Config, SimulatedEngineConfig};
pub use utils::now_millis;

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, bootstrap_simulated, BootstrappedServices};

// Re-export API types
pub use api::{bind_listener, serve, AppState, ServerError, WsConnectionManager};
