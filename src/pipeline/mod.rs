//! Long-lived pipeline workers: the receive loop pulling messages off the
//! bus and the ack dispatcher applying acknowledgment batches back to it.

pub mod ack;
pub mod receive;

pub use ack::ack_loop;
pub use receive::receive;
