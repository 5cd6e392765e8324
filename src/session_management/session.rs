use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::process::Child;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::streaming::multiplexer::OutboundQueue;
use crate::streaming::types::StreamCounters;
use crate::sweep::types::StreamExit;

use super::SessionState;

/// Everything belonging to one live capture stream.
///
/// Bundled so that attach/detach moves the process handle, the queue and the
/// I/O tasks as a unit; a session can never end up holding half a stream.
#[derive(Debug)]
pub struct ActiveStream {
    /// Distinguishes this stream from any later stream of the same session,
    /// so late exit events for a stopped stream can be discarded.
    pub stream_id: Uuid,
    /// The validated argument list the process was spawned with.
    pub args: Vec<String>,
    pub started_at: DateTime<Utc>,
    /// Handle to the capture process. Termination and reaping happen through
    /// this handle exactly once, on whichever path ends the stream.
    pub child: Child,
    /// Line buffer between the stdout reader and the sender task.
    pub queue: Arc<OutboundQueue>,
    /// Delivery counters updated by the sender task.
    pub counters: Arc<StreamCounters>,
    /// Task draining process stdout into `queue`.
    pub reader_task: JoinHandle<()>,
    /// Task draining `queue` into outbound datagrams.
    pub sender_task: JoinHandle<()>,
    /// Task draining process stderr into the debug log.
    pub stderr_task: Option<JoinHandle<()>>,
}

/// Server-side state for one client endpoint, from CONNECT until
/// DISCONNECT, idle expiry or shutdown.
#[derive(Debug)]
pub struct Session {
    // Fields for the Session struct
    pub id: Uuid,
    pub client_addr: SocketAddr,
    pub state: SessionState,
    pub connected_at: DateTime<Utc>,
    /// Refreshed by every datagram from the endpoint; the reaper compares
    /// this against the idle threshold.
    pub last_seen: DateTime<Utc>,
    /// At most one live capture stream per session.
    pub active_stream: Option<ActiveStream>,
    /// Lines delivered over all finished streams of this session.
    pub lines_streamed: u64,
    /// Bytes delivered over all finished streams of this session.
    pub bytes_streamed: u64,
    /// Lines dropped to backpressure over all finished streams.
    pub lines_dropped: u64,
    /// How the most recent stream ended, if any has ended.
    pub last_exit: Option<StreamExit>,
}

impl Session {
    pub fn new(client_addr: SocketAddr) -> Self {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            client_addr,
            state: SessionState::Connected,
            connected_at: now,
            last_seen: now,
            active_stream: None,
            lines_streamed: 0,
            bytes_streamed: 0,
            lines_dropped: 0,
            last_exit: None,
        }
    }

    /// Refreshes the activity timestamp.
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    pub fn is_streaming(&self) -> bool {
        self.active_stream.is_some()
    }

    /// Binds a freshly started stream to this session and moves it to
    /// [`SessionState::Streaming`]. The caller must have checked that no
    /// stream is currently attached.
    pub fn attach_stream(&mut self, stream: ActiveStream) {
        self.active_stream = Some(stream);
        self.state = SessionState::Streaming;
    }

    /// Takes the active stream out of the session, folding its delivery
    /// counters into the session totals and demoting the session back to
    /// [`SessionState::Connected`]. Returns `None` when nothing is attached.
    pub fn detach_stream(&mut self) -> Option<ActiveStream> {
        let stream = self.active_stream.take()?;
        self.state = SessionState::Connected;
        self.lines_streamed += stream.counters.lines.load(Ordering::Relaxed);
        self.bytes_streamed += stream.counters.bytes.load(Ordering::Relaxed);
        self.lines_dropped += stream.queue.dropped();
        Some(stream)
    }

    /// Lines delivered so far, including the stream still in flight.
    pub fn lines_streamed_total(&self) -> u64 {
        let live = self
            .active_stream
            .as_ref()
            .map_or(0, |s| s.counters.lines.load(Ordering::Relaxed));
        self.lines_streamed + live
    }

    /// Bytes delivered so far, including the stream still in flight.
    pub fn bytes_streamed_total(&self) -> u64 {
        let live = self
            .active_stream
            .as_ref()
            .map_or(0, |s| s.counters.bytes.load(Ordering::Relaxed));
        self.bytes_streamed + live
    }

    /// Lines dropped so far, including the stream still in flight.
    pub fn lines_dropped_total(&self) -> u64 {
        let live = self.active_stream.as_ref().map_or(0, |s| s.queue.dropped());
        self.lines_dropped + live
    }
}
