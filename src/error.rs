use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("cannot parse {0:?} as a partition index")]
    InvalidPartitionProperty(String),

    #[error("requested partition {partition} is not in the range 0-{max}")]
    PartitionOutOfRange { partition: i64, max: i32 },

    #[error("one or more messages failed to send: {failed} of {total}")]
    PublishFailed { failed: usize, total: usize },

    #[error("sends still outstanding after {0:?}")]
    SendTimeout(Duration),

    #[error("event of {size} bytes exceeds the {limit} byte message limit")]
    EventTooLarge { size: usize, limit: usize },

    #[error("encode error: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("bus error: {0}")]
    Bus(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BusError {
    /// True for invariant violations that signal a programming error in the
    /// caller. These are never retried or swallowed; callers are expected to
    /// propagate them and terminate the offending call path.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BusError::InvalidPartitionProperty(_) | BusError::PartitionOutOfRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_are_flagged() {
        assert!(BusError::InvalidPartitionProperty("abc".to_string()).is_fatal());
        assert!(BusError::PartitionOutOfRange { partition: 7, max: 3 }.is_fatal());
        assert!(!BusError::PublishFailed { failed: 1, total: 3 }.is_fatal());
        assert!(!BusError::SendTimeout(Duration::from_secs(5)).is_fatal());
    }
}
