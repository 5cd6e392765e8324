use serde::Serialize;

/// Point-in-time view of the server, serialized verbatim as the STATS reply.
#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub total_clients: usize,
    /// Sessions with a live capture process right now.
    pub active_processes: usize,
    pub server_running: bool,
    pub uptime_secs: u64,
    /// Sessions ever created since the server started.
    pub total_sessions: u64,
    /// Record lines dropped to backpressure across all current sessions.
    pub lines_dropped: u64,
    pub clients: Vec<ClientSummary>,
}

#[derive(Debug, Serialize)]
pub struct ClientSummary {
    pub address: String,
    pub connected_at: String,
    pub last_seen: String,
    /// Seconds since the session connected.
    pub duration: f64,
    pub active_stream: bool,
    pub lines_streamed: u64,
    pub bytes_streamed: u64,
    pub lines_dropped: u64,
}
