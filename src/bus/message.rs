use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// Property distinguishing control messages from data messages.
pub const MESSAGE_TYPE_PROPERTY: &str = "schedbus_msg_type";
/// Value of [`MESSAGE_TYPE_PROPERTY`] for scheduler control messages.
pub const CONTROL_MESSAGE: &str = "control";
/// Property holding a base-10 non-negative partition index. When present the
/// router bypasses key hashing and sends to exactly that partition.
pub const EXPLICIT_PARTITION_PROPERTY: &str = "schedbus_partition";

/// Immutable outbound envelope: payload, routing key, and a property map.
/// Constructed once per sequence fragment; never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    payload: Vec<u8>,
    key: String,
    properties: HashMap<String, String>,
}

impl WireMessage {
    pub fn new(payload: Vec<u8>, key: impl Into<String>) -> Self {
        Self {
            payload,
            key: key.into(),
            properties: HashMap::new(),
        }
    }

    /// A message tagged as a scheduler control message.
    pub fn control(payload: Vec<u8>, key: impl Into<String>) -> Self {
        Self::new(payload, key).with_property(MESSAGE_TYPE_PROPERTY, CONTROL_MESSAGE)
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }
}

/// Bus-assigned identifier of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId {
    pub partition: i32,
    pub offset: u64,
}

impl MessageId {
    pub fn new(partition: i32, offset: u64) -> Self {
        Self { partition, offset }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partition, self.offset)
    }
}

/// A message as read off the bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub id: MessageId,
    pub payload: Vec<u8>,
    pub key: String,
    pub properties: HashMap<String, String>,
    pub publish_time: DateTime<Utc>,
}

/// Identifies a received message together with the consumer replica that must
/// acknowledge it. Produced by the receive side, consumed exactly once by the
/// ack dispatcher; ownership transfers, it is never shared concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerMessageId {
    pub id: MessageId,
    /// Index of the consumer replica that owns the message.
    pub consumer_id: usize,
    /// Partition the message was read from. Carried for downstream
    /// bookkeeping; ack dispatch selects by `consumer_id` alone.
    pub partition: i32,
}

impl ConsumerMessageId {
    pub fn new(id: MessageId, consumer_id: usize, partition: i32) -> Self {
        Self {
            id,
            consumer_id,
            partition,
        }
    }
}
