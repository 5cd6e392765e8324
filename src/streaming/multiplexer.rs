use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::types::{BatchLimits, StreamCounters};

/// Marker appended to a record line that had to be cut down to fit inside a
/// single datagram. Truncation is explicit so a client never mistakes a cut
/// line for a complete record.
pub const TRUNCATION_MARKER: &str = " [TRUNCATED]";

/// Bounded line buffer between one capture process and one client endpoint.
///
/// The reader side pushes complete stdout lines and never waits: when the
/// buffer is full the oldest line is dropped and counted, so a slow client
/// can never stall the process read loop. The sender side pops newline-framed
/// batches and parks on the notifier while the buffer is empty.
///
/// Design notes:
/// - One producer (the stdout reader task) and one consumer (the sender
///   task) per queue; `Notify::notify_one` stores a permit, which is exactly
///   the wakeup semantics a single consumer needs.
/// - The mutex is only ever held for queue surgery, never across an await.
#[derive(Debug)]
pub struct OutboundQueue {
    lines: Mutex<VecDeque<String>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        OutboundQueue {
            lines: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            capacity,
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueues one record line, dropping the oldest buffered line first if
    /// the queue is at capacity.
    pub fn push_line(&self, line: String) {
        let mut lines = self.lines.lock().unwrap();
        if lines.len() >= self.capacity {
            lines.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        lines.push_back(line);
        drop(lines);
        self.notify.notify_one();
    }

    /// Pops the next batch of lines that fits within `limits`.
    ///
    /// Line order is preserved. A single line too large to fit in any
    /// datagram is returned alone, truncated with [`TRUNCATION_MARKER`],
    /// rather than wedging the queue forever.
    pub fn pop_batch(&self, limits: BatchLimits) -> Vec<String> {
        let mut lines = self.lines.lock().unwrap();
        let mut batch = Vec::new();
        let mut bytes = 0usize;

        while batch.len() < limits.max_batch_lines {
            let needed = match lines.front() {
                // +1 for the newline framing added by the sender.
                Some(front) => front.len() + 1,
                None => break,
            };

            if bytes + needed > limits.max_datagram_bytes {
                if batch.is_empty() {
                    if let Some(mut line) = lines.pop_front() {
                        truncate_line(&mut line, limits.max_datagram_bytes.saturating_sub(1));
                        batch.push(line);
                    }
                }
                break;
            }

            if let Some(line) = lines.pop_front() {
                bytes += needed;
                batch.push(line);
            }
        }

        batch
    }

    /// Marks the queue as closed and wakes the consumer. Buffered lines stay
    /// poppable; the sender drains them before exiting.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of lines discarded so far because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }

    /// Parks until the producer pushes a line or the queue is closed.
    pub async fn wait_for_lines(&self) {
        self.notify.notified().await;
    }
}

/// Cuts `line` down to at most `budget` bytes, appending [`TRUNCATION_MARKER`]
/// and keeping the cut on a UTF-8 character boundary.
fn truncate_line(line: &mut String, budget: usize) {
    if line.len() <= budget {
        return;
    }
    let mut cut = budget.saturating_sub(TRUNCATION_MARKER.len());
    while cut > 0 && !line.is_char_boundary(cut) {
        cut -= 1;
    }
    line.truncate(cut);
    line.push_str(TRUNCATION_MARKER);
}

/// Spawns the per-session sender task: pops line batches from `queue`, frames
/// them one-per-line into a datagram and sends it to `addr`.
///
/// The task exits once the queue is closed and fully drained. Send failures
/// are logged and skipped; delivery is best-effort by contract.
pub fn spawn_sender(
    socket: Arc<UdpSocket>,
    addr: SocketAddr,
    queue: Arc<OutboundQueue>,
    counters: Arc<StreamCounters>,
    limits: BatchLimits,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let batch = queue.pop_batch(limits);
            if batch.is_empty() {
                if queue.is_closed() {
                    break;
                }
                queue.wait_for_lines().await;
                continue;
            }

            let mut payload = String::with_capacity(limits.max_datagram_bytes);
            for line in &batch {
                payload.push_str(line);
                payload.push('\n');
            }

            match socket.send_to(payload.as_bytes(), addr).await {
                Ok(sent) => {
                    counters
                        .lines
                        .fetch_add(batch.len() as u64, Ordering::Relaxed);
                    counters.bytes.fetch_add(sent as u64, Ordering::Relaxed);
                }
                Err(e) => {
                    debug!("[{}] record send failed: {}", addr, e);
                }
            }
        }
        debug!("[{}] sender task finished", addr);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_test::assert_ok;

    fn limits(max_datagram_bytes: usize, max_batch_lines: usize) -> BatchLimits {
        BatchLimits {
            max_datagram_bytes,
            max_batch_lines,
        }
    }

    #[test]
    fn preserves_line_order() {
        let queue = OutboundQueue::new(16);
        for i in 0..5 {
            queue.push_line(format!("line-{}", i));
        }

        let batch = queue.pop_batch(limits(1024, 16));
        let expected: Vec<String> = (0..5).map(|i| format!("line-{}", i)).collect();
        assert_eq!(batch, expected);
        assert!(queue.is_empty());
    }

    #[test]
    fn drops_oldest_when_full_and_counts_it() {
        let queue = OutboundQueue::new(3);
        for i in 0..5 {
            queue.push_line(format!("line-{}", i));
        }

        assert_eq!(queue.dropped(), 2);
        let batch = queue.pop_batch(limits(1024, 16));
        assert_eq!(batch, vec!["line-2", "line-3", "line-4"]);
    }

    #[test]
    fn batch_respects_line_limit() {
        let queue = OutboundQueue::new(16);
        for i in 0..6 {
            queue.push_line(format!("{}", i));
        }

        assert_eq!(queue.pop_batch(limits(1024, 4)).len(), 4);
        assert_eq!(queue.pop_batch(limits(1024, 4)).len(), 2);
    }

    #[test]
    fn batch_respects_byte_limit() {
        let queue = OutboundQueue::new(16);
        // Each line costs 10 bytes plus a newline.
        for _ in 0..4 {
            queue.push_line("a".repeat(10));
        }

        // 25 bytes holds two framed lines (22 bytes) but not three.
        let batch = queue.pop_batch(limits(25, 16));
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn oversized_line_is_truncated_with_marker() {
        let queue = OutboundQueue::new(4);
        queue.push_line("x".repeat(500));

        let batch = queue.pop_batch(limits(100, 8));
        assert_eq!(batch.len(), 1);
        assert!(batch[0].ends_with(TRUNCATION_MARKER));
        assert!(batch[0].len() + 1 <= 100);
        assert!(queue.is_empty());
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let queue = OutboundQueue::new(4);
        // Two-byte characters force the cut point off a boundary.
        queue.push_line("é".repeat(300));

        let batch = queue.pop_batch(limits(64, 8));
        assert!(batch[0].ends_with(TRUNCATION_MARKER));
        assert!(batch[0].len() + 1 <= 64);
    }

    #[test]
    fn close_keeps_buffered_lines_poppable() {
        let queue = OutboundQueue::new(8);
        queue.push_line(String::from("tail"));
        queue.close();

        assert!(queue.is_closed());
        assert_eq!(queue.pop_batch(limits(1024, 8)), vec!["tail"]);
    }

    #[tokio::test]
    async fn sender_delivers_lines_and_exits_on_close() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let receiver_addr = receiver.local_addr().unwrap();
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());

        let queue = Arc::new(OutboundQueue::new(64));
        let counters = Arc::new(StreamCounters::default());
        let task = spawn_sender(
            socket,
            receiver_addr,
            queue.clone(),
            counters.clone(),
            limits(1400, 4),
        );

        for i in 0..10 {
            queue.push_line(format!("record-{}", i));
        }
        queue.close();

        let joined = timeout(Duration::from_secs(5), task)
            .await
            .expect("sender did not exit after close");
        tokio_test::assert_ok!(joined);

        let mut received = Vec::new();
        let mut buf = [0u8; 2048];
        while received.len() < 10 {
            let recv = timeout(Duration::from_secs(5), receiver.recv_from(&mut buf))
                .await
                .expect("timed out waiting for datagrams");
            let (n, _) = tokio_test::assert_ok!(recv);
            let text = std::str::from_utf8(&buf[..n]).unwrap();
            received.extend(text.lines().map(str::to_string));
        }

        let expected: Vec<String> = (0..10).map(|i| format!("record-{}", i)).collect();
        assert_eq!(received, expected);
        assert_eq!(counters.lines.load(Ordering::Relaxed), 10);
        assert!(counters.bytes.load(Ordering::Relaxed) > 0);
    }
}
