// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data-plane side: the worker process.
//!
//! A worker is single-threaded with respect to handlers. It reads
//! orders from stdin, runs each task inside the execution envelope
//! (workdir, status updates, supervisor heartbeats, in-process
//! deadline, per-job log), writes the result frame to stdout, and
//! exits cleanly once its lifecycle is served.

use crate::frames::{read_frame, write_frame, TaskOutcome, TaskSpec, WorkerInit, WorkerOrder, WorkerReply};
use crate::registry::Registry;
use crate::response::JobResponse;
use crate::{FrameError, WORKER_ENV};
use nix::sys::signal::{raise, Signal};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use toil_core::{JobId, ProcessError, Status};
use toil_store::{create_store, StatusStore, StoreError};
use toil_supervisor::Notifier;
use tracing::{error, info, warn};

/// True when this process was spawned by a pool as a worker.
pub fn is_worker_process() -> bool {
    std::env::var_os(WORKER_ENV).is_some()
}

/// Worker process entry point. Serves tasks until shut down, recycled,
/// or orphaned, then exits.
pub fn run(registry: Registry) -> ! {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let code = match serve(registry, &mut stdin.lock(), &mut stdout.lock()) {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "worker failed");
            1
        }
    };
    std::process::exit(code)
}

#[derive(Debug, Error)]
pub enum WorkerFault {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}

/// Order-serving loop, parameterized over the pipe endpoints so tests
/// can drive it in-process.
pub fn serve<R: Read, W: Write>(
    registry: Registry,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), WorkerFault> {
    let init = match read_frame::<_, WorkerOrder>(reader)? {
        WorkerOrder::Init(init) => init,
        _ => return Err(WorkerFault::Protocol("expected init frame")),
    };
    let mut ctx = WorkerCtx::attach(&init)?;
    info!(pid = std::process::id(), "worker ready");

    let mut served = 0u32;
    loop {
        let order = match read_frame::<_, WorkerOrder>(reader) {
            Ok(order) => order,
            // Controller hung up; nothing left to serve.
            Err(e) if e.is_eof() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        match order {
            WorkerOrder::Run(spec) => {
                let outcome = ctx.run_task(&registry, &spec);
                write_frame(writer, &WorkerReply::Result { uuid: spec.uuid, outcome })?;
                served += 1;
                if init.lifecycle != 0 && served >= init.lifecycle {
                    info!(served, "worker lifecycle served, exiting");
                    return Ok(());
                }
            }
            WorkerOrder::Shutdown => return Ok(()),
            WorkerOrder::Init(_) => return Err(WorkerFault::Protocol("duplicate init frame")),
        }
    }
}

/// Per-process worker state: store session and supervisor notifier,
/// attached once before the first task.
struct WorkerCtx {
    store: Arc<dyn StatusStore>,
    notifier: Notifier,
}

impl WorkerCtx {
    fn attach(init: &WorkerInit) -> Result<Self, WorkerFault> {
        let store = create_store(&init.logstorage, &init.storagedir)?;
        store.init_session()?;
        let notifier = Notifier::connect(&init.service);
        Ok(Self { store, notifier })
    }

    /// The execution envelope for one task.
    fn run_task(&mut self, registry: &Registry, spec: &TaskSpec) -> TaskOutcome {
        if let Err(e) = enter_workdir(&spec.workdir) {
            let _ = self
                .store
                .update_status(&spec.uuid, "Internal error", None, Some(Status::Error));
            return TaskOutcome::Failed { message: e.to_string() };
        }
        if let Err(e) =
            self.store.update_status(&spec.uuid, "Task started", Some(0), Some(Status::Started))
        {
            return TaskOutcome::Failed { message: e.to_string() };
        }

        self.notifier.notify_busy();
        let result = {
            let _deadline = DeadlineGuard::abort_after(
                Duration::from_secs(spec.timeout),
                Arc::clone(&self.store),
                spec.uuid,
            );
            invoke_handler(registry, &self.store, spec)
        };
        self.notifier.notify_done();

        match result {
            Ok(document) => TaskOutcome::Done { document },
            Err(TaskFault::Process(e)) => TaskOutcome::ProcessError { message: e.message },
            Err(TaskFault::Internal(message)) => {
                error!(uuid = %spec.uuid, message, "uncaught worker error");
                let _ = self
                    .store
                    .update_status(&spec.uuid, "Internal error", None, Some(Status::Error));
                TaskOutcome::Failed { message }
            }
        }
    }
}

enum TaskFault {
    Process(ProcessError),
    Internal(String),
}

fn internal<E: std::fmt::Display>(e: E) -> TaskFault {
    TaskFault::Internal(e.to_string())
}

fn invoke_handler(
    registry: &Registry,
    store: &Arc<dyn StatusStore>,
    spec: &TaskSpec,
) -> Result<Option<String>, TaskFault> {
    let handler = registry.get(&spec.identifier).map_err(internal)?;
    let request = spec.to_request();
    let mut response =
        JobResponse::new(spec.uuid, spec.identifier.clone(), spec.status, Arc::clone(store));

    let mut log = JobLog::open(&spec.workdir).map_err(internal)?;
    log.line(&format!("task {} started ({})", spec.uuid, spec.identifier));
    let rss_start = rss_bytes();

    let outcome = handler.call(&request, &mut response);

    log_memory(&mut log, spec, rss_start);

    match outcome {
        Ok(()) => {
            response
                .update_status("Task finished", Some(100), Some(Status::Done))
                .map_err(internal)?;
            log.line("task finished");
            let document = response.render().map_err(internal)?;
            if response.stores_response() {
                store.store_response(&spec.uuid, &document).map_err(internal)?;
            }
            match spec.status.mode() {
                toil_core::Mode::Sync => Ok(Some(document)),
                toil_core::Mode::FireAndForget => Ok(None),
            }
        }
        Err(process_error) => {
            let _ = response.update_status(&process_error.message, None, Some(Status::Error));
            log.line(&format!("task error: {}", process_error.message));
            Err(TaskFault::Process(process_error))
        }
    }
}

fn enter_workdir(workdir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(workdir)?;
    std::env::set_current_dir(workdir)
}

/// In-process deadline, the second of the three timeout tiers.
///
/// Writes the timeout error with context while this process can still
/// say anything, then aborts; the supervisor's kill-timer covers the
/// case where even that is impossible.
struct DeadlineGuard {
    state: Arc<(parking_lot::Mutex<bool>, parking_lot::Condvar)>,
}

impl DeadlineGuard {
    fn abort_after(timeout: Duration, store: Arc<dyn StatusStore>, uuid: JobId) -> Self {
        Self::arm(timeout, move || {
            error!(%uuid, "timeout occurred in worker process");
            let _ = store.update_status(&uuid, "Timeout Error", None, Some(Status::Error));
            let _ = raise(Signal::SIGABRT);
        })
    }

    fn arm<F: FnOnce() + Send + 'static>(timeout: Duration, on_fire: F) -> Self {
        let state = Arc::new((parking_lot::Mutex::new(false), parking_lot::Condvar::new()));
        let shared = Arc::clone(&state);
        std::thread::spawn(move || {
            let (lock, cvar) = &*shared;
            let deadline = Instant::now() + timeout;
            let mut cancelled = lock.lock();
            loop {
                if *cancelled {
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                cvar.wait_for(&mut cancelled, deadline - now);
            }
            drop(cancelled);
            on_fire();
        });
        Self { state }
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        *self.state.0.lock() = true;
        self.state.1.notify_all();
    }
}

/// Per-job `processing` log inside the workdir.
struct JobLog {
    file: std::fs::File,
}

impl JobLog {
    fn open(workdir: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(workdir.join("processing"))?;
        Ok(Self { file })
    }

    fn line(&mut self, message: &str) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        if let Err(e) = writeln!(self.file, "{} {}", now, message) {
            warn!(error = %e, "cannot write processing log");
        }
    }
}

fn log_memory(log: &mut JobLog, spec: &TaskSpec, rss_start: Option<u64>) {
    if let (Some(start), Some(end)) = (rss_start, rss_bytes()) {
        const MB: f64 = 1024.0 * 1024.0;
        let line = format!(
            "{} memory: start={:.3}Mb end={:.3}Mb delta={:.3}Mb",
            spec.identifier,
            start as f64 / MB,
            end as f64 / MB,
            (end as f64 - start as f64) / MB,
        );
        info!(uuid = %spec.uuid, "{}", line);
        log.line(&line);
    }
}

#[cfg(target_os = "linux")]
fn rss_bytes() -> Option<u64> {
    // statm reports pages; assume the common 4 KiB page size.
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * 4096)
}

#[cfg(not(target_os = "linux"))]
fn rss_bytes() -> Option<u64> {
    None
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
