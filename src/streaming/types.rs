use std::sync::atomic::AtomicU64;

/// Counters shared between a stream's sender task and the owning session.
///
/// Updated with relaxed ordering; the values are monotonic bookkeeping,
/// not synchronization.
#[derive(Debug, Default)]
pub struct StreamCounters {
    /// Lines actually handed to the socket for this stream.
    pub lines: AtomicU64,
    /// Payload bytes actually handed to the socket for this stream.
    pub bytes: AtomicU64,
}

/// Datagram batching limits applied by the per-session sender task.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    /// Upper bound on one outbound datagram's payload size.
    pub max_datagram_bytes: usize,
    /// Upper bound on the number of record lines packed into one datagram.
    pub max_batch_lines: usize,
}
