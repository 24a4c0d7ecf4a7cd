//! Domain events exchanged over the control-plane bus.
//!
//! An [`EventSequence`] is the unit of input to the publisher: an ordered run
//! of job-state events belonging to one (queue, job set) pair. The job-set
//! name is the routing and ordering key; no pipeline stage may reorder events
//! within a job set.

use chrono::Utc;

/// Ordered list of events for one (queue, job set) pair.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventSequence {
    #[prost(string, tag = "1")]
    pub queue: String,
    #[prost(string, tag = "2")]
    pub job_set_name: String,
    #[prost(message, repeated, tag = "3")]
    pub events: Vec<JobEvent>,
}

impl EventSequence {
    pub fn new(queue: impl Into<String>, job_set_name: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            job_set_name: job_set_name.into(),
            events: Vec::new(),
        }
    }

    pub fn with_events(mut self, events: Vec<JobEvent>) -> Self {
        self.events = events;
        self
    }

    /// True if `other` belongs to the same (queue, job set) pair.
    pub fn same_job_set(&self, other: &EventSequence) -> bool {
        self.queue == other.queue && self.job_set_name == other.job_set_name
    }
}

/// A single job-state transition.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobEvent {
    #[prost(string, tag = "1")]
    pub job_id: String,
    #[prost(enumeration = "JobEventKind", tag = "2")]
    pub kind: i32,
    /// Unix epoch milliseconds at which the event was created.
    #[prost(int64, tag = "3")]
    pub created_at: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub payload: Vec<u8>,
}

impl JobEvent {
    pub fn new(job_id: impl Into<String>, kind: JobEventKind) -> Self {
        Self {
            job_id: job_id.into(),
            kind: kind as i32,
            created_at: Utc::now().timestamp_millis(),
            payload: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum JobEventKind {
    Submitted = 0,
    Leased = 1,
    Running = 2,
    Succeeded = 3,
    Failed = 4,
    Cancelled = 5,
    Reprioritised = 6,
}

/// Control message used to confirm that a publish checkpoint has been
/// observed on every partition of the topic. A fence, not a data record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PartitionMarker {
    /// Caller-supplied identifier shared by all markers of one broadcast.
    #[prost(string, tag = "1")]
    pub group_id: String,
    #[prost(uint32, tag = "2")]
    pub partition: u32,
}
