//! Partition routing: a pure function from outbound message to partition
//! index.
//!
//! Messages carrying the explicit-partition property go to exactly that
//! partition; a malformed or out-of-range value is a fatal invariant
//! violation, never silently rerouted. All other messages are routed by a
//! hash of the routing key, so every message of a job set lands on the same
//! partition and per-job-set ordering survives as long as the bus preserves
//! intra-partition order.

use crate::bus::message::{WireMessage, EXPLICIT_PARTITION_PROPERTY};
use crate::error::{BusError, Result};

/// 31-base polynomial rolling hash, bit-exact with the hash the bus's own
/// default router applies to routing keys.
pub fn java_string_hash(s: &str) -> u32 {
    let mut h: u32 = 0;
    for b in s.bytes() {
        h = h.wrapping_mul(31).wrapping_add(u32::from(b));
    }
    h
}

/// Destination partition for `msg` on a topic with `num_partitions`
/// partitions.
pub fn route_message(msg: &WireMessage, num_partitions: i32) -> Result<i32> {
    debug_assert!(num_partitions > 0);
    if let Some(explicit) = msg.property(EXPLICIT_PARTITION_PROPERTY) {
        let partition: i64 = explicit
            .parse()
            .map_err(|_| BusError::InvalidPartitionProperty(explicit.to_string()))?;
        if partition < 0 || partition >= i64::from(num_partitions) {
            return Err(BusError::PartitionOutOfRange {
                partition,
                max: num_partitions - 1,
            });
        }
        return Ok(partition as i32);
    }
    Ok((java_string_hash(msg.key()) % num_partitions as u32) as i32)
}
