use std::time::Duration;

/// The bus caps individual messages at 4MB; stay well below it so batching
/// headroom is never an issue.
const DEFAULT_MAX_MESSAGE_BYTES: usize = 2 * 1024 * 1024;

/// Configuration for the publishing side of the pipeline.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Topic all event sequences and markers are published to.
    pub topic: String,
    /// Timeout after which outstanding asynchronous sends are considered failed.
    pub send_timeout: Duration,
    /// Maximum size (in bytes) of a produced message payload.
    pub max_message_bytes: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic: "scheduler-events".to_string(),
            send_timeout: Duration::from_secs(5),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl PublisherConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_max_message_bytes(mut self, max_bytes: usize) -> Self {
        self.max_message_bytes = max_bytes;
        self
    }
}

/// Configuration for the receive loop.
#[derive(Debug, Clone)]
pub struct ReceiveConfig {
    /// Upper bound on a single blocking receive call.
    pub poll_timeout: Duration,
    /// How long to wait before retrying after an empty or failed receive.
    pub poll_backoff: Duration,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            poll_backoff: Duration::from_millis(100),
        }
    }
}

impl ReceiveConfig {
    pub fn new(poll_timeout: Duration, poll_backoff: Duration) -> Self {
        Self {
            poll_timeout,
            poll_backoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publisher_config_default() {
        let cfg = PublisherConfig::default();
        assert_eq!(cfg.topic, "scheduler-events");
        assert_eq!(cfg.send_timeout, Duration::from_secs(5));
        assert_eq!(cfg.max_message_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn publisher_config_builders() {
        let cfg = PublisherConfig::new("control-plane")
            .with_send_timeout(Duration::from_millis(250))
            .with_max_message_bytes(1024);
        assert_eq!(cfg.topic, "control-plane");
        assert_eq!(cfg.send_timeout, Duration::from_millis(250));
        assert_eq!(cfg.max_message_bytes, 1024);
    }

    #[test]
    fn receive_config_default() {
        let cfg = ReceiveConfig::default();
        assert_eq!(cfg.poll_timeout, Duration::from_secs(1));
        assert_eq!(cfg.poll_backoff, Duration::from_millis(100));
    }
}
