//! Subscribed clients: registry, broadcast and the bind point.

mod binding;
mod registry;

pub use binding::{BindPoint, Binding};
pub use registry::{ChannelClient, ClientId, ClientRegistry, ClientSink, DeliveryError};
