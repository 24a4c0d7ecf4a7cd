//! Ack dispatcher: a single worker draining acknowledgment batches.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::bus::client::BusConsumer;
use crate::bus::message::ConsumerMessageId;
use crate::metrics::PipelineMetrics;

/// Drain `batches` and forward every acknowledgment to the consumer replica
/// named by its entry's consumer index.
///
/// Batches are processed strictly in arrival order and entries strictly in
/// list order; acks are cumulative per partition, so reordering here could
/// under- or over-acknowledge. The loop finishes when the input stream
/// closes, after the last enqueued batch has been fully applied; awaiting
/// the task running this future is the completion barrier. There is no
/// separate cancellation signal: the input stream's lifetime is the
/// dispatcher's lifetime, so committed work is always drained.
pub async fn ack_loop(
    consumers: Vec<Arc<dyn BusConsumer>>,
    mut batches: mpsc::Receiver<Vec<ConsumerMessageId>>,
    metrics: PipelineMetrics,
) {
    while let Some(batch) = batches.recv().await {
        for entry in batch {
            let Some(consumer) = consumers.get(entry.consumer_id) else {
                tracing::error!(
                    consumer_id = entry.consumer_id,
                    replicas = consumers.len(),
                    "ack references an unknown consumer replica"
                );
                continue;
            };
            if let Err(err) = consumer.ack(entry.id).await {
                tracing::warn!(error = %err, id = %entry.id, "failed to ack message");
                continue;
            }
            metrics.acks_issued.inc();
        }
    }
    tracing::debug!("ack input stream closed, dispatcher finished");
}
