use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::SocketAddr;

use chrono::Utc;
use log::{debug, warn};

use crate::error_handling::types::SessionError;

use super::session::Session;

/// The structure owning every client session, keyed by endpoint.
///
/// All session lookups, transitions and expiry go through this registry; the
/// dispatcher task owns it exclusively, so none of the methods need internal
/// locking.
///
/// # Fields Overview
///
/// - `sessions`: every live session, keyed by the client's address and port
/// - `max_sessions`: the cap on concurrent sessions; new endpoints beyond it
///   are rejected with a capacity error
/// - `total_created`: count of sessions ever created, for statistics
pub struct SessionRegistry {
    // Fields for the SessionRegistry struct
    sessions: HashMap<SocketAddr, Session>,
    max_sessions: usize,
    total_created: u64,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        SessionRegistry {
            sessions: HashMap::new(),
            max_sessions,
            total_created: 0,
        }
    }

    /// Creates a session for `addr`, or refreshes the existing one.
    ///
    /// Repeated CONNECTs from the same endpoint are idempotent and never
    /// lose session state. A new endpoint is only admitted while the
    /// registry is below `max_sessions`.
    pub fn connect(&mut self, addr: SocketAddr) -> Result<&mut Session, SessionError> {
        let occupied = self.sessions.len();
        match self.sessions.entry(addr) {
            Entry::Occupied(entry) => {
                let session = entry.into_mut();
                session.touch();
                Ok(session)
            }
            Entry::Vacant(entry) => {
                if occupied >= self.max_sessions {
                    return Err(SessionError::LimitReached(self.max_sessions));
                }
                self.total_created += 1;
                Ok(entry.insert(Session::new(addr)))
            }
        }
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&Session> {
        self.sessions.get(addr)
    }

    pub fn get_mut(&mut self, addr: &SocketAddr) -> Option<&mut Session> {
        self.sessions.get_mut(addr)
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.sessions.contains_key(addr)
    }

    /// Removes and returns the session for `addr`, if one exists. The caller
    /// is responsible for tearing down any stream still attached to it.
    pub fn remove(&mut self, addr: &SocketAddr) -> Option<Session> {
        self.sessions.remove(addr)
    }

    /// Refreshes the activity timestamp for `addr`. No-op for unknown
    /// endpoints; touching never creates a session.
    pub fn touch(&mut self, addr: &SocketAddr) {
        if let Some(session) = self.sessions.get_mut(addr) {
            session.touch();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions with a live capture stream attached.
    pub fn streaming_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_streaming()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.sessions.keys().copied().collect()
    }

    /// Sessions ever created since the server started.
    pub fn total_created(&self) -> u64 {
        self.total_created
    }

    /// Removes and returns every session idle for longer than `max_idle`.
    /// The caller tears down whatever streams the returned sessions carry.
    pub fn take_expired(&mut self, max_idle: chrono::Duration) -> Vec<Session> {
        let now = Utc::now();
        let expired: Vec<SocketAddr> = self
            .sessions
            .iter()
            .filter(|(_, session)| now - session.last_seen > max_idle)
            .map(|(addr, _)| *addr)
            .collect();

        expired
            .into_iter()
            .filter_map(|addr| self.sessions.remove(&addr))
            .collect()
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        if !self.sessions.is_empty() {
            warn!(
                "SessionRegistry dropped with {} active sessions - this may indicate a resource leak",
                self.sessions.len()
            );

            let remaining: Vec<_> = self.sessions.keys().collect();
            warn!("Remaining session endpoints: {:?}", remaining);
        } else {
            debug!("SessionRegistry dropped cleanly with no active sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    #[test]
    fn connect_creates_then_reuses_the_session() {
        let mut registry = SessionRegistry::new(8);

        let first_id = registry.connect(addr(4000)).unwrap().id;
        let second_id = registry.connect(addr(4000)).unwrap().id;

        assert_eq!(first_id, second_id);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.total_created(), 1);
    }

    #[test]
    fn connect_rejects_new_endpoints_at_capacity() {
        let mut registry = SessionRegistry::new(1);
        registry.connect(addr(4000)).unwrap();

        let err = registry.connect(addr(4001)).unwrap_err();
        assert!(matches!(err, SessionError::LimitReached(1)));

        // The existing endpoint can still reconnect.
        assert!(registry.connect(addr(4000)).is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn touch_refreshes_only_known_endpoints() {
        let mut registry = SessionRegistry::new(8);
        registry.connect(addr(4000)).unwrap();
        let stale = Utc::now() - chrono::Duration::seconds(600);
        registry.get_mut(&addr(4000)).unwrap().last_seen = stale;

        registry.touch(&addr(4000));
        assert!(registry.get(&addr(4000)).unwrap().last_seen > stale);

        registry.touch(&addr(5000));
        assert!(!registry.contains(&addr(5000)));
    }

    #[test]
    fn take_expired_removes_only_idle_sessions() {
        let mut registry = SessionRegistry::new(8);
        registry.connect(addr(4000)).unwrap();
        registry.connect(addr(4001)).unwrap();
        registry.get_mut(&addr(4000)).unwrap().last_seen =
            Utc::now() - chrono::Duration::seconds(600);

        let expired = registry.take_expired(chrono::Duration::seconds(300));

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].client_addr, addr(4000));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&addr(4001)));
    }

    #[test]
    fn remove_returns_the_session() {
        let mut registry = SessionRegistry::new(8);
        let id = registry.connect(addr(4000)).unwrap().id;

        let removed = registry.remove(&addr(4000)).expect("session should exist");
        assert_eq!(removed.id, id);
        assert!(registry.is_empty());
        assert!(registry.remove(&addr(4000)).is_none());
    }
}
