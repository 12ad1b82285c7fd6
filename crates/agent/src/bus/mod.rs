mod client;
mod error;
mod filter;
mod in_memory;
mod nats;

pub use client::{BusClient, Incoming};
pub use error::BusError;
pub use in_memory::{BusState, InMemoryBus, InMemoryPeer, Outgoing};
pub use nats::NatsBus;
