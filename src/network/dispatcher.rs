use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use crate::configuration::config::Config;
use crate::error_handling::types::{NetworkError, ProtocolError};
use crate::session_management::registry::SessionRegistry;
use crate::session_management::session::ActiveStream;
use crate::stats::collector;
use crate::streaming::multiplexer::{spawn_sender, OutboundQueue};
use crate::streaming::types::{BatchLimits, StreamCounters};
use crate::sweep::process::{spawn_sweep, terminate};
use crate::sweep::types::{StreamExit, SweepEvent, ValidationResult};
use crate::sweep::validator::validate_args;

use super::command::{CaptureRequest, Command};
use super::types::*;

/// The protocol dispatcher: one task that owns the socket's receive side and
/// the whole session registry.
///
/// Every registry mutation happens on this task, one event at a time, so no
/// lock is ever held and no lock is ever held across an await. The only
/// concurrent units are per-stream tasks (stdout reader, datagram sender,
/// stderr drain) and detached teardown tasks, all of which communicate back
/// through the event channel or shared atomics.
pub struct Dispatcher {
    /// Shared with every stream's sender task; receives happen only here.
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    /// Owned exclusively by the dispatch loop.
    registry: SessionRegistry,
    config: Config,
    /// Cloned into each stream's stdout reader so it can report process exit.
    event_tx: mpsc::Sender<SweepEvent>,
    event_rx: mpsc::Receiver<SweepEvent>,
    shutdown_rx: mpsc::Receiver<()>,
    started_at: Instant,
}

impl Dispatcher {
    /// Binds the UDP socket and assembles a dispatcher around it.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to bind; port 0 picks an ephemeral port
    /// * `config` - Validated runtime configuration
    /// * `shutdown_rx` - Channel the controller signals to stop the loop
    ///
    /// # Returns
    ///
    /// A dispatcher ready for [`Dispatcher::run`], or
    /// [`NetworkError::BindFailed`] when the endpoint is unavailable.
    pub async fn bind(
        addr: SocketAddr,
        config: Config,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<Self, NetworkError> {
        let socket = UdpSocket::bind(addr).await.map_err(|e| {
            error!("[!] Failed to bind UDP socket on {}: {}", addr, e);
            NetworkError::BindFailed(e)
        })?;
        let local_addr = socket.local_addr().map_err(NetworkError::BindFailed)?;
        info!("Listening on udp://{}", local_addr);

        let (event_tx, event_rx) = mpsc::channel(64);

        Ok(Dispatcher {
            socket: Arc::new(socket),
            local_addr,
            registry: SessionRegistry::new(config.limits.max_sessions),
            config,
            event_tx,
            event_rx,
            shutdown_rx,
            started_at: Instant::now(),
        })
    }

    /// The address the socket actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the dispatch loop until a shutdown signal arrives.
    ///
    /// The loop multiplexes inbound datagrams, process-exit events from
    /// reader tasks and the periodic reaper tick. Handlers run to completion
    /// before the next event is taken, which is what makes the registry safe
    /// to own without locks.
    pub async fn run(mut self) {
        let mut reap_timer = interval(Duration::from_secs(self.config.limits.reap_interval_secs));
        reap_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut buf = vec![0u8; 4096];

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, addr)) => {
                            let text = String::from_utf8_lossy(&buf[..len]).into_owned();
                            self.handle_datagram(addr, &text).await;
                        }
                        Err(e) => {
                            // Some platforms surface ICMP failures from earlier
                            // sends here; never fatal for a shared socket.
                            debug!("recv_from error: {}", e);
                        }
                    }
                }
                Some(event) = self.event_rx.recv() => {
                    self.handle_sweep_event(event).await;
                }
                _ = reap_timer.tick() => {
                    self.reap_idle_sessions();
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping dispatcher");
                    self.shutdown_all().await;
                    break;
                }
            }
        }
    }

    async fn handle_datagram(&mut self, addr: SocketAddr, text: &str) {
        // Any datagram from a known endpoint counts as activity.
        self.registry.touch(&addr);

        let command = Command::parse(text);
        trace!("[{}] {:?}", addr, command);

        match command {
            Command::Connect => self.handle_connect(addr).await,
            Command::StartStream(payload) => self.handle_start_stream(addr, &payload).await,
            Command::StopStream => self.handle_stop_stream(addr).await,
            Command::Stats => self.handle_stats(addr).await,
            Command::Ping => self.handle_ping(addr).await,
            Command::Disconnect => self.handle_disconnect(addr).await,
            Command::Unknown(raw) => self.handle_unknown(addr, &raw).await,
        }
    }

    async fn handle_connect(&mut self, addr: SocketAddr) {
        let reconnect = self.registry.contains(&addr);
        match self.registry.connect(addr) {
            Ok(session) => {
                if reconnect {
                    debug!("[{}] reconnected (session {})", addr, session.id);
                } else {
                    info!("[{}] new client connected (session {})", addr, session.id);
                }
            }
            Err(e) => {
                warn!("[{}] connect rejected: {}", addr, e);
                self.send_json(addr, &ServerFullResponse::new(self.config.limits.max_sessions))
                    .await;
                return;
            }
        }

        let clients = self.registry.len();
        info!("Total clients: {}", clients);
        self.send_json(addr, &ConnectResponse::new(clients)).await;
    }

    async fn handle_start_stream(&mut self, addr: SocketAddr, payload: &str) {
        if !self.registry.contains(&addr) {
            self.send_error(addr, ProtocolError::NotConnected).await;
            return;
        }
        if self.registry.get(&addr).is_some_and(|s| s.is_streaming()) {
            debug!("[{}] START_STREAM while already streaming", addr);
            self.send_error(addr, ProtocolError::AlreadyStreaming).await;
            return;
        }

        let request: CaptureRequest = match serde_json::from_str(payload) {
            Ok(request) => request,
            Err(e) => {
                debug!("[{}] bad START_STREAM payload: {}", addr, e);
                self.send_error(addr, ProtocolError::InvalidPayload(e.to_string()))
                    .await;
                return;
            }
        };

        let args = match validate_args(&request.args) {
            ValidationResult::Accepted(args) => args,
            ValidationResult::Rejected(rejection) => {
                info!(
                    "[{}] rejected hackrf_sweep arguments ({}): {:?}",
                    addr, rejection.reason, request.args
                );
                self.send_json(addr, &RejectionResponse::new(rejection, request.args))
                    .await;
                return;
            }
        };

        let stream_id = Uuid::new_v4();
        let queue = Arc::new(OutboundQueue::new(self.config.streaming.outbound_queue_lines));
        let counters = Arc::new(StreamCounters::default());
        let limits = BatchLimits {
            max_datagram_bytes: self.config.streaming.max_datagram_bytes,
            max_batch_lines: self.config.streaming.max_batch_lines,
        };
        // The sender must exist before the process: output can start flowing
        // the moment the spawn returns.
        let sender_task = spawn_sender(
            self.socket.clone(),
            addr,
            queue.clone(),
            counters.clone(),
            limits,
        );

        let spawned = match spawn_sweep(
            &self.config.sweep.command,
            &args,
            addr,
            stream_id,
            queue.clone(),
            self.event_tx.clone(),
        ) {
            Ok(spawned) => spawned,
            Err(e) => {
                error!("[{}] {}", addr, e);
                sender_task.abort();
                self.send_json(
                    addr,
                    &ErrorResponse::new(format!("Failed to start stream: {}", e)),
                )
                .await;
                return;
            }
        };

        info!(
            "[{}] started capture process (stream {}): {:?}",
            addr, stream_id, args
        );

        let stream = ActiveStream {
            stream_id,
            args: args.clone(),
            started_at: Utc::now(),
            child: spawned.child,
            queue,
            counters,
            reader_task: spawned.reader_task,
            sender_task,
            stderr_task: spawned.stderr_task,
        };
        if let Some(session) = self.registry.get_mut(&addr) {
            session.attach_stream(stream);
        }

        self.send_json(addr, &StreamStartedResponse::new(args)).await;
    }

    async fn handle_stop_stream(&mut self, addr: SocketAddr) {
        let detached = match self.registry.get_mut(&addr) {
            Some(session) => session.detach_stream(),
            None => {
                self.send_error(addr, ProtocolError::NotConnected).await;
                return;
            }
        };

        match detached {
            Some(stream) => {
                let stream_id = stream.stream_id;
                self.spawn_teardown(stream);
                info!("[{}] stream {} stopped by client", addr, stream_id);
                self.send_json(addr, &StreamStoppedResponse::stopped()).await;
            }
            None => {
                debug!("[{}] STOP_STREAM with no active stream", addr);
                self.send_json(addr, &StreamStoppedResponse::no_active_stream())
                    .await;
            }
        }
    }

    /// STATS is answered for any endpoint, connected or not; it reads the
    /// registry without creating or touching sessions for strangers.
    async fn handle_stats(&self, addr: SocketAddr) {
        let snapshot = collector::snapshot(&self.registry, self.started_at);
        self.send_json(addr, &snapshot).await;
    }

    /// PING never creates a session; the activity refresh for known
    /// endpoints already happened on datagram entry.
    async fn handle_ping(&self, addr: SocketAddr) {
        self.send_raw(addr, PONG_REPLY).await;
    }

    async fn handle_disconnect(&mut self, addr: SocketAddr) {
        let Some(mut session) = self.registry.remove(&addr) else {
            self.send_error(addr, ProtocolError::NotConnected).await;
            return;
        };

        if let Some(stream) = session.detach_stream() {
            self.spawn_teardown(stream);
        }
        info!("[{}] client disconnected (session {})", addr, session.id);
        info!("Total clients: {}", self.registry.len());
        self.send_raw(addr, DISCONNECTED_REPLY).await;
    }

    async fn handle_unknown(&self, addr: SocketAddr, raw: &str) {
        debug!("[{}] unknown command ({} bytes)", addr, raw.len());
        self.send_json(addr, &UnknownCommandResponse::new()).await;
    }

    async fn handle_sweep_event(&mut self, event: SweepEvent) {
        match event {
            SweepEvent::Ended { addr, stream_id } => {
                self.handle_stream_ended(addr, stream_id).await;
            }
        }
    }

    /// Handles a capture process closing its stdout on its own (finished
    /// sweep count, device unplugged, crash). The session is demoted to
    /// connected, never removed.
    async fn handle_stream_ended(&mut self, addr: SocketAddr, stream_id: Uuid) {
        // Events may arrive after the stream was stopped or replaced; only
        // the stream currently attached under the same id is acted on.
        let current = self
            .registry
            .get(&addr)
            .and_then(|s| s.active_stream.as_ref())
            .map(|s| s.stream_id);
        if current != Some(stream_id) {
            trace!("[{}] stale exit event for stream {}", addr, stream_id);
            return;
        }

        let Some(session) = self.registry.get_mut(&addr) else {
            return;
        };
        let Some(stream) = session.detach_stream() else {
            return;
        };

        // Let the sender drain whatever the process managed to emit.
        stream.queue.close();
        let ActiveStream { mut child, .. } = stream;

        let exit_code = match child.try_wait() {
            Ok(Some(status)) => status.code(),
            Ok(None) => {
                // Stdout closed before the exit status became available;
                // reap off the hot path.
                let grace = Duration::from_secs(self.config.sweep.stop_grace_secs);
                tokio::spawn(async move {
                    if let Err(e) = terminate(&mut child, grace).await {
                        warn!("failed to reap exited capture process: {}", e);
                    }
                });
                None
            }
            Err(e) => {
                warn!("[{}] failed to read exit status: {}", addr, e);
                None
            }
        };

        session.last_exit = Some(StreamExit {
            stream_id,
            exit_code,
            at: Utc::now(),
        });
        info!(
            "[{}] capture process ended on its own (stream {}, exit code {:?})",
            addr, stream_id, exit_code
        );
        self.send_json(addr, &StreamEndedResponse::new(exit_code))
            .await;
    }

    /// Stops a detached stream without blocking the dispatch loop: the I/O
    /// tasks are cancelled immediately, the process is terminated and reaped
    /// by a detached task bounded by the grace period.
    fn spawn_teardown(&self, mut stream: ActiveStream) -> JoinHandle<()> {
        stream.reader_task.abort();
        stream.sender_task.abort();

        let grace = Duration::from_secs(self.config.sweep.stop_grace_secs);
        tokio::spawn(async move {
            match terminate(&mut stream.child, grace).await {
                Ok(status) => debug!(
                    "capture process for stream {} reaped ({})",
                    stream.stream_id, status
                ),
                Err(e) => warn!(
                    "failed to stop capture process for stream {}: {}",
                    stream.stream_id, e
                ),
            }
        })
    }

    fn reap_idle_sessions(&mut self) {
        // A timeout of zero disables idle expiry.
        if self.config.limits.session_timeout_secs == 0 {
            return;
        }

        let max_idle = chrono::Duration::seconds(self.config.limits.session_timeout_secs as i64);
        for mut session in self.registry.take_expired(max_idle) {
            warn!(
                "[{}] reaping idle session {} (last seen {})",
                session.client_addr, session.id, session.last_seen
            );
            if let Some(stream) = session.detach_stream() {
                self.spawn_teardown(stream);
            }
        }
    }

    /// Stops every session's stream and waits for the terminations, so no
    /// capture process outlives the server.
    async fn shutdown_all(&mut self) {
        let addrs = self.registry.addrs();
        if addrs.is_empty() {
            return;
        }
        info!("Stopping {} active sessions", addrs.len());

        let mut teardowns = Vec::new();
        for addr in addrs {
            if let Some(mut session) = self.registry.remove(&addr) {
                if let Some(stream) = session.detach_stream() {
                    teardowns.push(self.spawn_teardown(stream));
                }
            }
        }
        for teardown in teardowns {
            if let Err(e) = teardown.await {
                warn!("teardown task failed: {}", e);
            }
        }
        info!("All sessions stopped");
    }

    async fn send_raw(&self, addr: SocketAddr, payload: &[u8]) {
        if let Err(e) = self.socket.send_to(payload, addr).await {
            warn!("[{}] failed to send response: {}", addr, e);
        }
    }

    async fn send_json<T: Serialize>(&self, addr: SocketAddr, response: &T) {
        match serde_json::to_vec(response) {
            Ok(payload) => self.send_raw(addr, &payload).await,
            Err(e) => error!("[!] Failed to serialize response for {}: {}", addr, e),
        }
    }

    async fn send_error(&self, addr: SocketAddr, error: ProtocolError) {
        self.send_json(addr, &ErrorResponse::new(error.to_string()))
            .await;
    }
}
