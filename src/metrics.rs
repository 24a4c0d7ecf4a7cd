//! Pipeline counters over an explicit Prometheus registry.
//!
//! The registry is passed in by the process wiring and the metrics struct is
//! handed to each worker as a constructor argument; nothing here is global.

use prometheus::{IntCounter, Opts, Registry};

use crate::error::Result;

#[derive(Clone)]
pub struct PipelineMetrics {
    pub messages_received: IntCounter,
    pub receive_timeouts: IntCounter,
    pub receive_errors: IntCounter,
    pub messages_published: IntCounter,
    pub publish_errors: IntCounter,
    pub markers_published: IntCounter,
    pub acks_issued: IntCounter,
}

impl PipelineMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let metrics = Self {
            messages_received: counter(
                "schedbus_messages_received_total",
                "Messages pulled off the bus by the receive loop",
            )?,
            receive_timeouts: counter(
                "schedbus_receive_timeouts_total",
                "Bounded receives that returned no message",
            )?,
            receive_errors: counter(
                "schedbus_receive_errors_total",
                "Receives that failed with a transient error",
            )?,
            messages_published: counter(
                "schedbus_messages_published_total",
                "Event sequence messages successfully sent to the bus",
            )?,
            publish_errors: counter(
                "schedbus_publish_errors_total",
                "Event sequence messages that failed to send",
            )?,
            markers_published: counter(
                "schedbus_markers_published_total",
                "Partition markers successfully sent to the bus",
            )?,
            acks_issued: counter(
                "schedbus_acks_issued_total",
                "Acknowledgments forwarded to consumer replicas",
            )?,
        };
        registry.register(Box::new(metrics.messages_received.clone()))?;
        registry.register(Box::new(metrics.receive_timeouts.clone()))?;
        registry.register(Box::new(metrics.receive_errors.clone()))?;
        registry.register(Box::new(metrics.messages_published.clone()))?;
        registry.register(Box::new(metrics.publish_errors.clone()))?;
        registry.register(Box::new(metrics.markers_published.clone()))?;
        registry.register(Box::new(metrics.acks_issued.clone()))?;
        Ok(metrics)
    }
}

fn counter(name: &str, help: &str) -> Result<IntCounter> {
    Ok(IntCounter::with_opts(Opts::new(name, help))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_increment() {
        let registry = Registry::new();
        let metrics = PipelineMetrics::new(&registry).unwrap();
        metrics.messages_received.inc();
        metrics.acks_issued.inc_by(3);
        assert_eq!(metrics.messages_received.get(), 1);
        assert_eq!(metrics.acks_issued.get(), 3);
        assert_eq!(registry.gather().len(), 7);
    }

    #[test]
    fn double_registration_is_rejected() {
        let registry = Registry::new();
        PipelineMetrics::new(&registry).unwrap();
        assert!(PipelineMetrics::new(&registry).is_err());
    }
}
