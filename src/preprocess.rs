//! Outbound sequence preprocessing: compaction and byte-size limiting.
//!
//! The publisher consumes this as a black-box transform. Both operations must
//! preserve event order within a job set; size limiting may only split a
//! sequence across more messages, never drop or reorder events.

use prost::Message;

use crate::error::{BusError, Result};
use crate::events::{EventSequence, JobEvent};

pub trait SequencePreprocessor: Send + Sync {
    /// Merge consecutive sequences sharing a (queue, job set) pair. Reduces
    /// the per-job-set message count without changing event order.
    fn compact(&self, sequences: Vec<EventSequence>) -> Vec<EventSequence>;

    /// Split sequences so every resulting payload encodes to at most
    /// `max_bytes`. Fails if a sequence is over the limit and either
    /// splitting is not allowed or a single event alone exceeds it.
    fn limit_byte_size(
        &self,
        sequences: Vec<EventSequence>,
        max_bytes: usize,
        split_allowed: bool,
    ) -> Result<Vec<EventSequence>>;
}

/// Default preprocessor: adjacency-based compaction and greedy first-fit
/// splitting by encoded size.
pub struct GreedyPreprocessor;

impl SequencePreprocessor for GreedyPreprocessor {
    fn compact(&self, sequences: Vec<EventSequence>) -> Vec<EventSequence> {
        let mut out: Vec<EventSequence> = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            match out.last_mut() {
                Some(prev) if prev.same_job_set(&sequence) => {
                    prev.events.extend(sequence.events);
                }
                _ => out.push(sequence),
            }
        }
        out
    }

    fn limit_byte_size(
        &self,
        sequences: Vec<EventSequence>,
        max_bytes: usize,
        split_allowed: bool,
    ) -> Result<Vec<EventSequence>> {
        let mut out = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            let size = sequence.encoded_len();
            if size <= max_bytes {
                out.push(sequence);
                continue;
            }
            if !split_allowed {
                return Err(BusError::EventTooLarge {
                    size,
                    limit: max_bytes,
                });
            }
            split_sequence(sequence, max_bytes, &mut out)?;
        }
        Ok(out)
    }
}

/// Greedily pack events into fragments that each encode to at most
/// `max_bytes`, preserving event order.
fn split_sequence(
    sequence: EventSequence,
    max_bytes: usize,
    out: &mut Vec<EventSequence>,
) -> Result<()> {
    let header = EventSequence::new(sequence.queue.clone(), sequence.job_set_name.clone());
    let header_len = header.encoded_len();

    let mut current = header.clone();
    let mut current_len = header_len;
    for event in sequence.events {
        let event_len = embedded_len(&event);
        if header_len + event_len > max_bytes {
            // A lone event that does not fit can never be sent.
            return Err(BusError::EventTooLarge {
                size: header_len + event_len,
                limit: max_bytes,
            });
        }
        if current_len + event_len > max_bytes && !current.events.is_empty() {
            out.push(std::mem::replace(&mut current, header.clone()));
            current_len = header_len;
        }
        current_len += event_len;
        current.events.push(event);
    }
    if !current.events.is_empty() {
        out.push(current);
    }
    Ok(())
}

/// Wire size of `event` as a repeated embedded field: tag byte, length
/// delimiter, then the message itself.
fn embedded_len(event: &JobEvent) -> usize {
    let len = event.encoded_len();
    1 + prost::length_delimiter_len(len) + len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::JobEventKind;

    fn sequence(queue: &str, job_set: &str, n_events: usize) -> EventSequence {
        let events = (0..n_events)
            .map(|i| JobEvent::new(format!("job-{i}"), JobEventKind::Running))
            .collect();
        EventSequence::new(queue, job_set).with_events(events)
    }

    #[test]
    fn compact_merges_consecutive_sequences_only() {
        let p = GreedyPreprocessor;
        let compacted = p.compact(vec![
            sequence("q", "a", 1),
            sequence("q", "a", 2),
            sequence("q", "b", 1),
            sequence("q", "a", 1),
        ]);
        assert_eq!(compacted.len(), 3);
        assert_eq!(compacted[0].events.len(), 3);
        assert_eq!(compacted[1].job_set_name, "b");
        assert_eq!(compacted[2].job_set_name, "a");
    }

    #[test]
    fn compact_preserves_event_order() {
        let p = GreedyPreprocessor;
        let first = EventSequence::new("q", "a")
            .with_events(vec![JobEvent::new("job-1", JobEventKind::Submitted)]);
        let second = EventSequence::new("q", "a")
            .with_events(vec![JobEvent::new("job-1", JobEventKind::Succeeded)]);
        let compacted = p.compact(vec![first, second]);
        assert_eq!(compacted.len(), 1);
        assert_eq!(compacted[0].events[0].kind(), JobEventKind::Submitted);
        assert_eq!(compacted[0].events[1].kind(), JobEventKind::Succeeded);
    }

    #[test]
    fn limit_leaves_small_sequences_alone() {
        let p = GreedyPreprocessor;
        let limited = p
            .limit_byte_size(vec![sequence("q", "a", 3)], 1024 * 1024, true)
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].events.len(), 3);
    }

    #[test]
    fn limit_splits_without_dropping_or_reordering() {
        let p = GreedyPreprocessor;
        let input = sequence("q", "a", 20);
        let expected: Vec<String> = input.events.iter().map(|e| e.job_id.clone()).collect();
        let max_bytes = input.encoded_len() / 3;

        let limited = p.limit_byte_size(vec![input], max_bytes, true).unwrap();
        assert!(limited.len() > 1);
        for fragment in &limited {
            assert!(fragment.encoded_len() <= max_bytes);
            assert_eq!(fragment.queue, "q");
            assert_eq!(fragment.job_set_name, "a");
        }
        let got: Vec<String> = limited
            .iter()
            .flat_map(|s| s.events.iter().map(|e| e.job_id.clone()))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn limit_rejects_oversized_sequence_when_splitting_disallowed() {
        let p = GreedyPreprocessor;
        let input = sequence("q", "a", 20);
        let max_bytes = input.encoded_len() - 1;
        let err = p.limit_byte_size(vec![input], max_bytes, false).unwrap_err();
        assert!(matches!(err, BusError::EventTooLarge { .. }));
    }

    #[test]
    fn limit_rejects_single_event_over_the_limit() {
        let p = GreedyPreprocessor;
        let event = JobEvent::new("job-0", JobEventKind::Running).with_payload(vec![0u8; 256]);
        let input = EventSequence::new("q", "a").with_events(vec![event]);
        let err = p.limit_byte_size(vec![input], 64, true).unwrap_err();
        assert!(matches!(err, BusError::EventTooLarge { .. }));
    }
}
