//! Per-session output streaming: bounded queues and datagram batching.

pub mod multiplexer;
pub mod types;

pub use multiplexer::{spawn_sender, OutboundQueue, TRUNCATION_MARKER};
pub use types::{BatchLimits, StreamCounters};
