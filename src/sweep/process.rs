use std::net::SocketAddr;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use crate::error_handling::types::SweepError;
use crate::streaming::multiplexer::OutboundQueue;

use super::types::{SpawnedSweep, SweepEvent};

/// Spawns one capture process for a session and wires up its output.
///
/// Arguments are passed as a literal vector, never through a shell, so a
/// validated list cannot be reinterpreted as shell syntax. Stdout is drained
/// line-by-line into the session's outbound queue by a dedicated task; when
/// the pipe closes (process exit or kill) the task reports a
/// [`SweepEvent::Ended`] to the dispatcher. Stderr is drained into the debug
/// log so a wedged pipe can never block the process.
///
/// A spawn refusal from the OS is reported as [`SweepError::SpawnFailed`],
/// which callers must keep distinct from argument-validation failures.
pub fn spawn_sweep(
    command: &str,
    args: &[String],
    addr: SocketAddr,
    stream_id: Uuid,
    queue: Arc<OutboundQueue>,
    event_tx: mpsc::Sender<SweepEvent>,
) -> Result<SpawnedSweep, SweepError> {
    debug!("[{}] spawning {} {:?}", addr, command, args);

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(SweepError::SpawnFailed)?;

    let Some(stdout) = child.stdout.take() else {
        return Err(SweepError::SpawnFailed(std::io::Error::other(
            "stdout pipe missing",
        )));
    };

    let reader_task = {
        let queue = queue.clone();
        let mut reader = BufReader::new(stdout).lines();
        tokio::spawn(async move {
            while let Ok(Some(line)) = reader.next_line().await {
                if line.is_empty() {
                    continue;
                }
                queue.push_line(line);
            }
            debug!("[sweep:{}] stdout reader finished", stream_id);
            let _ = event_tx.send(SweepEvent::Ended { addr, stream_id }).await;
        })
    };

    let stderr_task = child.stderr.take().map(|stderr| {
        let mut reader = BufReader::new(stderr).lines();
        tokio::spawn(async move {
            while let Ok(Some(line)) = reader.next_line().await {
                debug!("[sweep:{}][stderr] {}", stream_id, line);
            }
            debug!("[sweep:{}] stderr monitoring ended", stream_id);
        })
    });

    Ok(SpawnedSweep {
        child,
        reader_task,
        stderr_task,
    })
}

/// Stops a capture process: SIGTERM first so hackrf_sweep can release the
/// device cleanly, then SIGKILL once `grace` has elapsed.
///
/// The exit status is reaped on every path so no zombie is left in the
/// process table. Safe to call on a process that has already exited.
pub async fn terminate(child: &mut Child, grace: Duration) -> Result<ExitStatus, SweepError> {
    if let Some(status) = child.try_wait().map_err(SweepError::WaitFailed)? {
        return Ok(status);
    }

    if let Some(pid) = child.id() {
        let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if ret != 0 {
            warn!(
                "failed to send SIGTERM to capture process {}: {}",
                pid,
                std::io::Error::last_os_error()
            );
        }
    }

    match timeout(grace, child.wait()).await {
        Ok(status) => status.map_err(SweepError::WaitFailed),
        Err(_) => {
            warn!(
                "capture process ignored SIGTERM for {:?}, killing it",
                grace
            );
            if let Err(e) = child.start_kill() {
                // Lost the race against the exit itself; wait() reaps either way.
                debug!("kill after grace period failed: {}", e);
            }
            child.wait().await.map_err(SweepError::WaitFailed)
        }
    }
}
