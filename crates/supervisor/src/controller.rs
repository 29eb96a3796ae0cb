// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor controller: consumes heartbeats, kills stalled workers.

use crate::channel::{decode_frame, ipc_path, Verb};
use std::collections::HashMap;
use std::future::poll_fn;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixDatagram;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::time::delay_queue::{DelayQueue, Key};
use tracing::{debug, error, warn};

/// Bounded receive so the loop observes shutdown promptly.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Invoked with the pid of a worker whose deadline expired. Must not
/// block; the controller does not wait for the worker to die.
pub type KillFn = Arc<dyn Fn(u32) + Send + Sync>;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("cannot bind supervisor socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Heartbeat consumer bound to the service's supervisor endpoint.
///
/// Holds at most one pending deadline per pid; BUSY re-arms
/// (last-writer-wins), DONE cancels, expiry removes the entry and
/// invokes the kill function. Pids are weak references: a kill targets
/// whatever currently runs under that pid.
pub struct Supervisor {
    socket: UnixDatagram,
    path: PathBuf,
    timeout: Duration,
    kill: KillFn,
}

impl Supervisor {
    /// Bind the endpoint, replacing any stale socket file.
    pub fn bind(service: &str, timeout: Duration, kill: KillFn) -> Result<Self, SupervisorError> {
        let path = ipc_path(service);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale supervisor socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "cannot remove stale socket"),
        }
        let socket = UnixDatagram::bind(&path)
            .map_err(|source| SupervisorError::Bind { path: path.clone(), source })?;
        Ok(Self { socket, path, timeout, kill })
    }

    /// Run the supervise loop as a background task.
    pub fn spawn(self) -> SupervisorHandle {
        let cancel = CancellationToken::new();
        let path = self.path.clone();
        let task = tokio::spawn(self.run(cancel.clone()));
        SupervisorHandle { cancel, task, path }
    }

    async fn run(self, cancel: CancellationToken) {
        let mut deadlines: DelayQueue<u32> = DelayQueue::new();
        let mut armed: HashMap<u32, Key> = HashMap::new();
        let mut buf = [0u8; 64];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                expired = poll_fn(|cx| deadlines.poll_expired(cx)), if !armed.is_empty() => {
                    if let Some(entry) = expired {
                        let pid = entry.into_inner();
                        armed.remove(&pid);
                        error!(pid, "killing stalled worker");
                        (self.kill)(pid);
                    }
                }

                recv = tokio::time::timeout(RECV_TIMEOUT, self.socket.recv(&mut buf)) => {
                    match recv {
                        // Receive window elapsed; go around.
                        Err(_) => {}
                        Ok(Ok(n)) => match decode_frame(&buf[..n]) {
                            Ok((pid, Verb::Busy)) => match armed.get(&pid) {
                                Some(key) => deadlines.reset(key, self.timeout),
                                None => {
                                    armed.insert(pid, deadlines.insert(pid, self.timeout));
                                }
                            },
                            Ok((pid, Verb::Done)) => {
                                // Unknown pid: heartbeat outlived its
                                // worker, or a duplicate. Ignore.
                                if let Some(key) = armed.remove(&pid) {
                                    deadlines.remove(&key);
                                }
                            }
                            Err(e) => warn!(error = %e, "discarding malformed supervisor frame"),
                        },
                        Ok(Err(e)) => {
                            error!(error = %e, "supervisor receive failed");
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
            }
        }
        // Pending deadlines die with the loop.
        debug!("supervisor loop stopped");
    }
}

/// Handle to a running supervisor task.
pub struct SupervisorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    path: PathBuf,
}

impl SupervisorHandle {
    /// Cancel pending deadlines, stop the loop, unlink the endpoint.
    pub async fn stop(self) {
        debug!("stopping supervisor");
        self.cancel.cancel();
        let _ = self.task.await;
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
