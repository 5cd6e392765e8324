use std::time::Instant;

use chrono::Utc;

use crate::session_management::registry::SessionRegistry;

use super::types::{ClientSummary, StatsSnapshot};

/// Builds a statistics snapshot from the registry.
///
/// Runs inside the dispatcher task, which owns the registry, so the read is
/// consistent by construction and never contends with session mutation.
pub fn snapshot(registry: &SessionRegistry, started_at: Instant) -> StatsSnapshot {
    let now = Utc::now();

    let clients: Vec<ClientSummary> = registry
        .iter()
        .map(|session| ClientSummary {
            address: session.client_addr.to_string(),
            connected_at: session.connected_at.to_rfc3339(),
            last_seen: session.last_seen.to_rfc3339(),
            duration: (now - session.connected_at).num_milliseconds() as f64 / 1000.0,
            active_stream: session.is_streaming(),
            lines_streamed: session.lines_streamed_total(),
            bytes_streamed: session.bytes_streamed_total(),
            lines_dropped: session.lines_dropped_total(),
        })
        .collect();

    StatsSnapshot {
        total_clients: registry.len(),
        active_processes: registry.streaming_count(),
        // Answered from the live dispatcher; kept for wire compatibility.
        server_running: true,
        uptime_secs: started_at.elapsed().as_secs(),
        total_sessions: registry.total_created(),
        lines_dropped: registry.iter().map(|s| s.lines_dropped_total()).sum(),
        clients,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_sessions_and_keeps_contract_keys() {
        let mut registry = SessionRegistry::new(8);
        registry.connect("127.0.0.1:4000".parse().unwrap()).unwrap();
        registry.connect("127.0.0.1:4001".parse().unwrap()).unwrap();

        let snap = snapshot(&registry, Instant::now());
        assert_eq!(snap.total_clients, 2);
        assert_eq!(snap.active_processes, 0);
        assert!(snap.server_running);
        assert_eq!(snap.total_sessions, 2);
        assert_eq!(snap.clients.len(), 2);

        let value = serde_json::to_value(&snap).unwrap();
        for key in ["total_clients", "active_processes", "server_running", "clients"] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        let clients = value["clients"].as_array().unwrap();
        assert!(clients[0].get("address").is_some());
        assert!(clients[0].get("duration").is_some());
        assert!(clients[0].get("active_stream").is_some());
    }

    #[test]
    fn snapshot_of_an_empty_registry_is_well_formed() {
        let registry = SessionRegistry::new(8);
        let snap = snapshot(&registry, Instant::now());

        assert_eq!(snap.total_clients, 0);
        assert_eq!(snap.total_sessions, 0);
        assert_eq!(snap.lines_dropped, 0);
        assert!(snap.clients.is_empty());
    }
}
