//! Partitioned, append-only message bus: wire types, client capability
//! traits, partition routing, and an in-process loopback implementation.

pub mod client;
pub mod memory;
pub mod message;
pub mod routing;

pub use client::{BusClient, BusConsumer, BusProducer};
pub use memory::InMemoryBus;
pub use message::{BusMessage, ConsumerMessageId, MessageId, WireMessage};
