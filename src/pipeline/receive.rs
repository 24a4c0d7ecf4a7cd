//! Receive loop: one dedicated worker per consumer handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::bus::client::BusConsumer;
use crate::bus::message::BusMessage;
use crate::config::ReceiveConfig;
use crate::metrics::PipelineMetrics;

const RECEIVE_BUFFER: usize = 100;

/// Spawn a worker that pulls messages off `consumer` one at a time and
/// forwards them, in arrival order, to the returned stream.
///
/// Each iteration is a receive bounded by `poll_timeout`; an empty poll or a
/// transient receive error waits `poll_backoff` before retrying so the loop
/// never spins against an idle bus. Cancelling `token` stops the loop and
/// closes the output stream exactly once; nothing is produced after closure.
pub fn receive(
    token: CancellationToken,
    consumer: Arc<dyn BusConsumer>,
    config: ReceiveConfig,
    metrics: PipelineMetrics,
) -> mpsc::Receiver<BusMessage> {
    let (tx, rx) = mpsc::channel(RECEIVE_BUFFER);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                polled = timeout(config.poll_timeout, consumer.receive()) => {
                    match polled {
                        Ok(Ok(msg)) => {
                            metrics.messages_received.inc();
                            if tx.send(msg).await.is_err() {
                                // Downstream dropped the stream, nothing left to feed.
                                break;
                            }
                        }
                        Ok(Err(err)) => {
                            tracing::warn!(error = %err, "error receiving message from the bus");
                            metrics.receive_errors.inc();
                            if backoff(&token, config.poll_backoff).await {
                                break;
                            }
                        }
                        Err(_) => {
                            metrics.receive_timeouts.inc();
                            if backoff(&token, config.poll_backoff).await {
                                break;
                            }
                        }
                    }
                }
            }
        }
        tracing::debug!("receive loop stopped, closing output stream");
        // tx drops here, closing the stream exactly once.
    });

    rx
}

/// Wait out the backoff interval. Returns true if cancelled while waiting.
async fn backoff(token: &CancellationToken, wait: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = tokio::time::sleep(wait) => false,
    }
}
