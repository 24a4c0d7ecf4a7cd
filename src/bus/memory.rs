//! In-process loopback bus.
//!
//! One append-only log per partition, a producer that routes through
//! [`route_message`], and per-partition consumers with cumulative ack
//! watermarks. Backs single-process deployments and the integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};

use crate::bus::client::{BusClient, BusConsumer, BusProducer};
use crate::bus::message::{BusMessage, MessageId, WireMessage};
use crate::bus::routing::route_message;
use crate::error::{BusError, Result};

struct PartitionLog {
    index: i32,
    entries: Mutex<Vec<BusMessage>>,
    notify: Notify,
    /// Highest offset acknowledged on this partition, if any.
    acked_through: Mutex<Option<u64>>,
}

pub struct InMemoryBus {
    partitions: Vec<Arc<PartitionLog>>,
}

impl InMemoryBus {
    /// A bus with `num_partitions` partitions (at least one).
    pub fn new(num_partitions: usize) -> Self {
        let partitions = (0..num_partitions.max(1) as i32)
            .map(|index| {
                Arc::new(PartitionLog {
                    index,
                    entries: Mutex::new(Vec::new()),
                    notify: Notify::new(),
                    acked_through: Mutex::new(None),
                })
            })
            .collect();
        Self { partitions }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Consumer handle reading one partition from the start of the log.
    pub fn subscribe(&self, partition: i32) -> Result<InMemoryConsumer> {
        let log = self
            .partitions
            .get(usize::try_from(partition).unwrap_or(usize::MAX))
            .ok_or_else(|| BusError::Bus(format!("no partition {partition}")))?;
        Ok(InMemoryConsumer {
            log: log.clone(),
            cursor: Mutex::new(0),
        })
    }

    /// Number of messages stored on `partition`.
    pub async fn partition_len(&self, partition: i32) -> usize {
        match self.partitions.get(partition as usize) {
            Some(log) => log.entries.lock().await.len(),
            None => 0,
        }
    }

    /// Cumulative ack watermark of `partition`.
    pub async fn acked_through(&self, partition: i32) -> Option<u64> {
        match self.partitions.get(partition as usize) {
            Some(log) => *log.acked_through.lock().await,
            None => None,
        }
    }
}

#[async_trait]
impl BusClient for InMemoryBus {
    async fn topic_partitions(&self, _topic: &str) -> Result<Vec<i32>> {
        Ok((0..self.partitions.len() as i32).collect())
    }

    async fn create_producer(&self, _topic: &str) -> Result<Arc<dyn BusProducer>> {
        Ok(Arc::new(InMemoryProducer {
            partitions: self.partitions.clone(),
        }))
    }
}

pub struct InMemoryProducer {
    partitions: Vec<Arc<PartitionLog>>,
}

#[async_trait]
impl BusProducer for InMemoryProducer {
    async fn send(&self, msg: WireMessage) -> Result<MessageId> {
        let partition = route_message(&msg, self.partitions.len() as i32)?;
        let log = &self.partitions[partition as usize];
        let mut entries = log.entries.lock().await;
        let id = MessageId::new(partition, entries.len() as u64);
        entries.push(BusMessage {
            id,
            payload: msg.payload().to_vec(),
            key: msg.key().to_string(),
            properties: msg.properties().clone(),
            publish_time: Utc::now(),
        });
        drop(entries);
        log.notify.notify_one();
        Ok(id)
    }
}

pub struct InMemoryConsumer {
    log: Arc<PartitionLog>,
    cursor: Mutex<usize>,
}

#[async_trait]
impl BusConsumer for InMemoryConsumer {
    async fn receive(&self) -> Result<BusMessage> {
        loop {
            {
                let entries = self.log.entries.lock().await;
                let mut cursor = self.cursor.lock().await;
                if *cursor < entries.len() {
                    let msg = entries[*cursor].clone();
                    *cursor += 1;
                    return Ok(msg);
                }
            }
            // notify_one leaves a permit behind if a send lands between the
            // emptiness check and this await, so no wakeup is lost.
            self.log.notify.notified().await;
        }
    }

    async fn ack(&self, id: MessageId) -> Result<()> {
        if id.partition != self.log.index {
            return Err(BusError::Bus(format!(
                "ack for partition {} issued on a consumer of partition {}",
                id.partition, self.log.index
            )));
        }
        let mut acked = self.log.acked_through.lock().await;
        *acked = Some(acked.map_or(id.offset, |current| current.max(id.offset)));
        Ok(())
    }
}
