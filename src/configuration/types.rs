use serde::Deserialize;

/// Session limits and reaper cadence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of concurrent sessions; connects beyond it are refused.
    pub max_sessions: usize,
    /// Seconds of client silence before a session is reaped. Zero disables
    /// idle expiry.
    pub session_timeout_secs: u64,
    /// How often the reaper scans for idle sessions, in seconds.
    pub reap_interval_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: 64,
            session_timeout_secs: 300,
            reap_interval_secs: 60,
        }
    }
}

/// Capture process settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Executable spawned for each stream; resolved through PATH unless
    /// absolute.
    pub command: String,
    /// Seconds to wait after SIGTERM before the process is killed outright.
    pub stop_grace_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            command: "hackrf_sweep".to_string(),
            stop_grace_secs: 5,
        }
    }
}

/// Output batching and backpressure settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Upper bound for a single outbound datagram, in bytes.
    pub max_datagram_bytes: usize,
    /// Maximum record lines packed into one datagram.
    pub max_batch_lines: usize,
    /// Per-stream backlog of record lines; the oldest are dropped beyond it.
    pub outbound_queue_lines: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_datagram_bytes: 1400,
            max_batch_lines: 8,
            outbound_queue_lines: 1024,
        }
    }
}
