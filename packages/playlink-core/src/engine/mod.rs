//! Player engine boundary and the adapter that owns engine instances.

mod adapter;
mod simulated;
mod traits;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapter::PlayerAdapter;
pub use simulated::{SimulatedEngine, SimulatedEngineFactory};
pub use traits::{EngineFactory, EngineSink, PlayerEngine, StateReply};
pub use types::{
    Bitrate, ConnectionEvent, Credentials, EngineError, EngineResult, EngineSignal, EngineState,
    PlaybackEventKind, StateQuery,
};
