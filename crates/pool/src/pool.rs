// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane side of the worker pool.
//!
//! One slot task per worker: it spawns the child process, feeds it
//! tasks taken from a shared queue, and respawns it after recycling or
//! death. The supervisor rides alongside with a process-group SIGKILL
//! as its kill function; the pool never waits on a kill — a dead child
//! surfaces as a broken pipe and the slot respawns.

use crate::frames::{
    read_frame_async, write_frame_async, TaskOutcome, TaskSpec, WorkerInit, WorkerOrder,
    WorkerReply,
};
use crate::{FrameError, PoolError, WorkerError};
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toil_core::Config;
use toil_supervisor::{KillFn, Supervisor, SupervisorHandle};
use tracing::{debug, error, info, warn};

/// Environment marker set on spawned workers. A host binary checks it
/// (see [`crate::worker::is_worker_process`]) and hands control to
/// [`crate::worker::run`] instead of starting the service.
pub const WORKER_ENV: &str = "TOIL_WORKER";

/// Grace period for a worker to exit after a Shutdown order.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Program used to spawn worker processes.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Re-exec the current binary, the default for a host service
    /// whose main dispatches on [`WORKER_ENV`].
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub parallelism: usize,
    /// Tasks per worker before recycling. 0 = eternal.
    pub lifecycle: u32,
    pub service: String,
    pub logstorage: String,
    pub storagedir: PathBuf,
    pub supervisor_timeout: Duration,
    pub worker_command: WorkerCommand,
}

impl PoolConfig {
    pub fn from_config(config: &Config, worker_command: WorkerCommand) -> Self {
        Self {
            parallelism: config.parallelprocesses.max(1),
            lifecycle: config.processlifecycle,
            service: config.service.clone(),
            logstorage: config.logstorage.clone(),
            storagedir: config.storage_root(),
            supervisor_timeout: Duration::from_secs(config.supervisor_timeout),
            worker_command,
        }
    }

    fn init_frame(&self) -> WorkerInit {
        WorkerInit {
            service: self.service.clone(),
            logstorage: self.logstorage.clone(),
            storagedir: self.storagedir.clone(),
            lifecycle: self.lifecycle,
        }
    }
}

/// Task submission surface, abstracted so the engine can run against a
/// fake in tests.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Queue a task and wait for its outcome. Queueing is unbounded;
    /// admission control belongs upstream.
    async fn submit(&self, spec: TaskSpec) -> Result<TaskOutcome, WorkerError>;
}

struct Submission {
    spec: TaskSpec,
    reply: oneshot::Sender<Result<TaskOutcome, WorkerError>>,
}

type SharedQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Submission>>>;

/// Fixed-size pool of long-lived worker processes.
pub struct WorkerPool {
    queue: mpsc::UnboundedSender<Submission>,
    cancel: CancellationToken,
    slots: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    supervisor: parking_lot::Mutex<Option<SupervisorHandle>>,
}

impl WorkerPool {
    /// Bind the supervisor and launch one slot task per worker.
    pub fn start(config: PoolConfig) -> Result<Self, PoolError> {
        let kill: KillFn = Arc::new(kill_worker);
        let supervisor =
            Supervisor::bind(&config.service, config.supervisor_timeout, kill)?.spawn();

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let queue = Arc::new(tokio::sync::Mutex::new(queue_rx));
        let cancel = CancellationToken::new();
        let config = Arc::new(config);

        info!(
            parallelism = config.parallelism,
            lifecycle = config.lifecycle,
            "starting worker pool"
        );
        let slots = (0..config.parallelism)
            .map(|slot| {
                tokio::spawn(slot_loop(
                    Arc::clone(&config),
                    Arc::clone(&queue),
                    cancel.clone(),
                    slot,
                ))
            })
            .collect();

        Ok(Self {
            queue: queue_tx,
            cancel,
            slots: parking_lot::Mutex::new(slots),
            supervisor: parking_lot::Mutex::new(Some(supervisor)),
        })
    }

    /// Stop accepting submissions, terminate workers, stop the
    /// supervisor. Pending futures resolve with a cancellation error.
    pub async fn shutdown(&self) {
        info!("closing worker pool");
        self.cancel.cancel();
        let slots = std::mem::take(&mut *self.slots.lock());
        for slot in slots {
            let _ = slot.await;
        }
        let supervisor = self.supervisor.lock().take();
        if let Some(supervisor) = supervisor {
            supervisor.stop().await;
        }
    }
}

#[async_trait]
impl Dispatch for WorkerPool {
    async fn submit(&self, spec: TaskSpec) -> Result<TaskOutcome, WorkerError> {
        let (reply, rx) = oneshot::channel();
        self.queue
            .send(Submission { spec, reply })
            .map_err(|_| WorkerError::Cancelled)?;
        rx.await.map_err(|_| WorkerError::Cancelled)?
    }
}

/// Process-group SIGKILL; each worker is its own group leader.
fn kill_worker(pid: u32) {
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) => {}
        // Already gone: the kill raced the worker's own death.
        Err(Errno::ESRCH) => {}
        Err(e) => warn!(pid, error = %e, "cannot kill worker group"),
    }
}

async fn slot_loop(config: Arc<PoolConfig>, queue: SharedQueue, cancel: CancellationToken, slot: usize) {
    'respawn: loop {
        if cancel.is_cancelled() {
            return;
        }
        let mut worker = match SpawnedWorker::spawn(&config).await {
            Ok(worker) => worker,
            Err(e) => {
                error!(slot, error = %e, "cannot spawn worker, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => continue 'respawn,
                }
            }
        };
        info!(slot, pid = worker.pid, "worker started");

        let mut served = 0u32;
        loop {
            let submission = tokio::select! {
                _ = cancel.cancelled() => {
                    worker.terminate().await;
                    return;
                }
                next = recv_next(&queue) => match next {
                    Some(submission) => submission,
                    // Queue closed: pool is gone.
                    None => {
                        worker.terminate().await;
                        return;
                    }
                },
            };

            match worker.run_task(&submission.spec).await {
                Ok(outcome) => {
                    let _ = submission.reply.send(Ok(outcome));
                }
                Err(e) => {
                    warn!(slot, pid = worker.pid, uuid = %submission.spec.uuid, error = %e,
                        "worker died mid-task");
                    let _ = submission
                        .reply
                        .send(Err(WorkerError::Crashed(e.to_string())));
                    worker.reap().await;
                    continue 'respawn;
                }
            }

            served += 1;
            if config.lifecycle != 0 && served >= config.lifecycle {
                debug!(slot, pid = worker.pid, served, "recycling worker");
                worker.terminate().await;
                continue 'respawn;
            }
        }
    }
}

/// Take the next submission; slots share one queue, any idle slot wins.
async fn recv_next(queue: &SharedQueue) -> Option<Submission> {
    queue.lock().await.recv().await
}

struct SpawnedWorker {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    pid: u32,
}

impl SpawnedWorker {
    async fn spawn(config: &PoolConfig) -> Result<Self, PoolError> {
        let mut command = Command::new(&config.worker_command.program);
        command
            .args(&config.worker_command.args)
            .env(WORKER_ENV, "1")
            .process_group(0)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(PoolError::Spawn)?;
        let pid = child
            .id()
            .ok_or_else(|| PoolError::Spawn(std::io::Error::other("worker pid unavailable")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PoolError::Spawn(std::io::Error::other("worker stdin unavailable")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PoolError::Spawn(std::io::Error::other("worker stdout unavailable")))?;

        let mut worker = Self { child, stdin, stdout: BufReader::new(stdout), pid };
        write_frame_async(&mut worker.stdin, &WorkerOrder::Init(config.init_frame()))
            .await
            .map_err(|e| PoolError::Spawn(std::io::Error::other(e.to_string())))?;
        Ok(worker)
    }

    async fn run_task(&mut self, spec: &TaskSpec) -> Result<TaskOutcome, FrameError> {
        write_frame_async(&mut self.stdin, &WorkerOrder::Run(spec.clone())).await?;
        let WorkerReply::Result { outcome, .. } = read_frame_async(&mut self.stdout).await?;
        Ok(outcome)
    }

    /// Orderly termination: Shutdown order, closed stdin, bounded wait.
    async fn terminate(mut self) {
        let _ = write_frame_async(&mut self.stdin, &WorkerOrder::Shutdown).await;
        drop(self.stdin);
        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                warn!(pid = self.pid, "worker ignored shutdown, killing");
                let _ = self.child.start_kill();
                let _ = self.child.wait().await;
            }
        }
    }

    /// Collect a worker already known to be dead or dying.
    async fn reap(mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }
}

/// In-memory dispatcher for engine tests: records submissions and
/// replies from a canned function, optionally after a delay.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeDispatch {
    delay: Option<Duration>,
    reply: Box<dyn Fn(&TaskSpec) -> Result<TaskOutcome, WorkerError> + Send + Sync>,
    submitted: parking_lot::Mutex<Vec<TaskSpec>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeDispatch {
    pub fn replying<F>(reply: F) -> Self
    where
        F: Fn(&TaskSpec) -> Result<TaskOutcome, WorkerError> + Send + Sync + 'static,
    {
        Self { delay: None, reply: Box::new(reply), submitted: parking_lot::Mutex::new(Vec::new()) }
    }

    /// Every submission completes with the given document.
    pub fn completing_with(document: &str) -> Self {
        let document = document.to_string();
        Self::replying(move |_| Ok(TaskOutcome::Done { document: Some(document.clone()) }))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn submitted(&self) -> Vec<TaskSpec> {
        self.submitted.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Dispatch for FakeDispatch {
    async fn submit(&self, spec: TaskSpec) -> Result<TaskOutcome, WorkerError> {
        self.submitted.lock().push(spec.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.reply)(&spec)
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
