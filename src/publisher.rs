//! Leader-gated publishing of event sequences and partition markers.
//!
//! The bulk path compacts and size-limits outbound sequences, then fans out
//! every send concurrently and joins them under one bounded timeout. The
//! marker path sends one control message per partition, synchronously and
//! sequentially: it is a rare barrier operation, so fail-fast simplicity wins
//! over throughput there.
//!
//! Leadership is validated once per call. Losing leadership mid-publish, or
//! an error after some sends have landed, can leave a partial publish on the
//! bus; callers must treat any returned error as "some subset of messages may
//! have already been sent", and rely on at-least-once downstream handling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use prost::Message;
use tokio::time::timeout;
use uuid::Uuid;

use crate::bus::client::{BusClient, BusProducer};
use crate::bus::message::{WireMessage, EXPLICIT_PARTITION_PROPERTY};
use crate::config::PublisherConfig;
use crate::error::{BusError, Result};
use crate::events::{EventSequence, PartitionMarker};
use crate::leader::{LeaderController, LeaderToken};
use crate::metrics::PipelineMetrics;
use crate::preprocess::SequencePreprocessor;

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish all event sequences. A no-op success when `token` is no longer
    /// valid: a non-leader replica silently skips publishing.
    async fn publish_messages(
        &self,
        sequences: Vec<EventSequence>,
        token: &LeaderToken,
    ) -> Result<()>;

    /// Send one marker carrying `group_id` to every partition of the topic.
    /// Returns the number of partitions reached on full success; the first
    /// failed send aborts the broadcast.
    async fn publish_markers(&self, group_id: Uuid) -> Result<u32>;
}

/// Default [`Publisher`] over a bus producer handle.
pub struct BusPublisher<L, S> {
    producer: Arc<dyn BusProducer>,
    num_partitions: usize,
    leader: L,
    preprocessor: S,
    send_timeout: Duration,
    max_message_bytes: usize,
    metrics: PipelineMetrics,
}

impl<L, S> BusPublisher<L, S>
where
    L: LeaderController,
    S: SequencePreprocessor,
{
    /// Resolve the topic's partitions and create a producer on `client`.
    pub async fn connect(
        client: &dyn BusClient,
        config: PublisherConfig,
        leader: L,
        preprocessor: S,
        metrics: PipelineMetrics,
    ) -> Result<Self> {
        let partitions = client.topic_partitions(&config.topic).await?;
        let producer = client.create_producer(&config.topic).await?;
        Ok(Self::new(
            producer,
            partitions.len(),
            config,
            leader,
            preprocessor,
            metrics,
        ))
    }

    pub fn new(
        producer: Arc<dyn BusProducer>,
        num_partitions: usize,
        config: PublisherConfig,
        leader: L,
        preprocessor: S,
        metrics: PipelineMetrics,
    ) -> Self {
        Self {
            producer,
            num_partitions,
            leader,
            preprocessor,
            send_timeout: config.send_timeout,
            max_message_bytes: config.max_message_bytes,
            metrics,
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }
}

#[async_trait]
impl<L, S> Publisher for BusPublisher<L, S>
where
    L: LeaderController,
    S: SequencePreprocessor,
{
    async fn publish_messages(
        &self,
        sequences: Vec<EventSequence>,
        token: &LeaderToken,
    ) -> Result<()> {
        if sequences.is_empty() {
            return Ok(());
        }

        let sequences = self.preprocessor.compact(sequences);
        let sequences =
            self.preprocessor
                .limit_byte_size(sequences, self.max_message_bytes, true)?;
        let msgs: Vec<WireMessage> = sequences
            .iter()
            .map(|sequence| {
                WireMessage::control(sequence.encode_to_vec(), sequence.job_set_name.clone())
            })
            .collect();

        if !self.leader.validate_token(token) {
            tracing::debug!("no longer leader so not publishing");
            return Ok(());
        }
        tracing::debug!(messages = msgs.len(), "leader, publishing");

        let total = msgs.len();
        let sends = msgs.into_iter().map(|msg| self.producer.send(msg));
        let results = timeout(self.send_timeout, join_all(sends))
            .await
            .map_err(|_| {
                self.metrics.publish_errors.inc();
                BusError::SendTimeout(self.send_timeout)
            })?;

        let mut failed = 0;
        for result in &results {
            if let Err(err) = result {
                tracing::error!(error = %err, "error sending message to the bus");
                failed += 1;
            }
        }
        if failed > 0 {
            self.metrics.publish_errors.inc_by(failed as u64);
            return Err(BusError::PublishFailed { failed, total });
        }
        self.metrics.messages_published.inc_by(total as u64);
        Ok(())
    }

    async fn publish_markers(&self, group_id: Uuid) -> Result<u32> {
        for partition in 0..self.num_partitions {
            let marker = PartitionMarker {
                group_id: group_id.to_string(),
                partition: partition as u32,
            };
            let msg = WireMessage::control(marker.encode_to_vec(), String::new())
                .with_property(EXPLICIT_PARTITION_PROPERTY, partition.to_string());
            self.producer.send(msg).await?;
            self.metrics.markers_published.inc();
        }
        Ok(self.num_partitions as u32)
    }
}
