use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use tokio::process::Child;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Outcome of validating a client-supplied `hackrf_sweep` argument list.
///
/// Validation is all-or-nothing: either the whole list is accepted as-is, or
/// the first offending token is reported and nothing is spawned.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// The full argument list, confirmed safe to pass to the process spawn.
    Accepted(Vec<String>),
    /// The first failure encountered in a left-to-right scan.
    Rejected(ArgumentError),
}

/// Structured description of a rejected argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentError {
    /// The offending option token, e.g. `-g`. `None` when the list as a whole
    /// is unusable (empty request).
    pub option: Option<String>,
    /// The value supplied for the option, when one was present.
    pub value: Option<String>,
    /// Human-readable reason, suitable for sending back to the client.
    pub reason: String,
}

/// Events emitted by the per-stream reader tasks back to the dispatcher.
#[derive(Debug)]
pub enum SweepEvent {
    /// The capture process closed its stdout (exited or was killed).
    Ended {
        /// Endpoint of the session that owned the stream.
        addr: SocketAddr,
        /// Identifies which stream ended, so a stale event for a stream that
        /// was already replaced or stopped can be ignored.
        stream_id: Uuid,
    },
}

/// A freshly spawned capture process together with its I/O tasks.
#[derive(Debug)]
pub struct SpawnedSweep {
    /// Handle to the OS process. Kept by the owning session until stop/exit.
    pub child: Child,
    /// Task draining stdout line-by-line into the session's outbound queue.
    pub reader_task: JoinHandle<()>,
    /// Task draining stderr into the debug log, if the pipe could be taken.
    pub stderr_task: Option<JoinHandle<()>>,
}

/// Record of the most recent stream termination for a session.
#[derive(Debug, Clone)]
pub struct StreamExit {
    pub stream_id: Uuid,
    /// Exit code reported by the OS, if the process exited normally and the
    /// status was available at the time the exit was observed.
    pub exit_code: Option<i32>,
    pub at: DateTime<Utc>,
}
