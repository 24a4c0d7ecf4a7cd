//! Peripheral event store backing the query-facing event API.
//!
//! Not part of the publish/consume core: consumers hand batches of raw event
//! payloads to an [`EventStore`], which appends each payload to a
//! per-(queue, job set) append-only stream. Retention, when enabled, is
//! applied to every stream touched by the batch.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::Result;

const EVENT_STREAM_PREFIX: &str = "events:";

/// One event payload destined for a job-set stream.
#[derive(Debug, Clone)]
pub struct EventRow {
    pub queue: String,
    pub job_set: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EventRetention {
    pub expiry_enabled: bool,
    pub retention: Duration,
}

impl Default for EventRetention {
    fn default() -> Self {
        Self {
            expiry_enabled: false,
            retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append every payload in `batch` to its job-set stream. The whole batch
    /// is applied under one lock so retention updates land with the appends.
    async fn report_events(&self, batch: Vec<EventRow>) -> Result<()>;
}

fn job_set_events_key(queue: &str, job_set: &str) -> String {
    format!("{EVENT_STREAM_PREFIX}{queue}:{job_set}")
}

struct EventStream {
    entries: Vec<Vec<u8>>,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process store for loopback deployments and tests.
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<String, EventStream>>,
    retention: EventRetention,
}

impl InMemoryEventStore {
    pub fn new(retention: EventRetention) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Entries currently readable from one job-set stream. An expired stream
    /// reads as empty.
    pub async fn entries(&self, queue: &str, job_set: &str) -> Vec<Vec<u8>> {
        let streams = self.streams.read().await;
        match streams.get(&job_set_events_key(queue, job_set)) {
            Some(stream) if stream.expires_at.map_or(true, |at| at > Utc::now()) => {
                stream.entries.clone()
            }
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn report_events(&self, batch: Vec<EventRow>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut touched = HashSet::new();
        let mut streams = self.streams.write().await;
        for row in batch {
            let key = job_set_events_key(&row.queue, &row.job_set);
            streams
                .entry(key.clone())
                .or_insert_with(|| EventStream {
                    entries: Vec::new(),
                    expires_at: None,
                })
                .entries
                .push(row.payload);
            touched.insert(key);
        }

        if self.retention.expiry_enabled {
            let expires_at =
                Utc::now() + chrono::Duration::milliseconds(self.retention.retention.as_millis() as i64);
            for key in touched {
                if let Some(stream) = streams.get_mut(&key) {
                    stream.expires_at = Some(expires_at);
                }
            }
        }
        Ok(())
    }
}
