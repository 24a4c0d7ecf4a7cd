//! Capability traits for the message bus client.
//!
//! The pipeline consumes the bus through these interfaces only; test doubles
//! implement the full trait rather than partially overriding a concrete
//! client type.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::message::{BusMessage, MessageId, WireMessage};
use crate::error::Result;

#[async_trait]
pub trait BusClient: Send + Sync {
    /// Partition indexes of `topic`.
    async fn topic_partitions(&self, topic: &str) -> Result<Vec<i32>>;

    /// Create a producer handle for `topic`. The handle is exclusively owned
    /// by its publisher but safe for concurrent in-flight sends.
    async fn create_producer(&self, topic: &str) -> Result<Arc<dyn BusProducer>>;
}

#[async_trait]
pub trait BusProducer: Send + Sync {
    /// Send one message; the returned future resolves once the bus has
    /// accepted it. Await sends one at a time for a synchronous barrier path,
    /// or join many futures under a timeout for the pipelined bulk path.
    async fn send(&self, msg: WireMessage) -> Result<MessageId>;
}

#[async_trait]
pub trait BusConsumer: Send + Sync {
    /// Block until the next message arrives. Callers bound the wait
    /// externally; a dropped receive future must leave the cursor untouched.
    async fn receive(&self) -> Result<BusMessage>;

    /// Acknowledge `id` and, cumulatively, all earlier messages on its
    /// partition.
    async fn ack(&self, id: MessageId) -> Result<()>;
}
