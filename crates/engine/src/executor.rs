// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution engine.

use crate::cleanup::{remove_workdir, run_cleanup};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toil_core::{Clock, Config, JobId, JobRequest, Mode, StatusRecord, Status, SystemClock};
use toil_pool::{Dispatch, Registry, TaskOutcome, TaskSpec, WorkerError};
use toil_store::{StatusStore, StoreError};
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Handler identifier absent from the registry.
    #[error("unknown process: {0}")]
    UnknownProcess(String),

    /// Sync wait exceeded the request deadline. The worker-side timer
    /// performs the actual kill; this only unblocks the caller.
    #[error("Execute timeout")]
    Timeout,

    /// Domain error raised by the handler.
    #[error("Process error: {0}")]
    Process(String),

    /// Worker failed outside the handler contract.
    #[error("worker failure: {0}")]
    Worker(String),

    /// No record for the given uuid.
    #[error("no such job: {0}")]
    NotFound(JobId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot prepare workdir: {0}")]
    Workdir(std::io::Error),
}

impl ExecuteError {
    /// Domain code surfaced upward for job-level failures.
    pub fn code(&self) -> Option<u16> {
        match self {
            ExecuteError::Timeout | ExecuteError::Process(_) => Some(424),
            _ => None,
        }
    }
}

/// Outcome of `execute`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteReply {
    /// Sync: the handler's response document.
    Completed(serde_json::Value),
    /// Fire-and-forget: accepted, progress tracked via `get_status`.
    Accepted(JobId),
}

/// Public surface over store, registry, and dispatcher.
///
/// Generic over the dispatcher so tests drive it with a fake pool, and
/// over the clock so cleanup scenarios control time.
pub struct Engine<D: Dispatch, C: Clock = SystemClock> {
    store: Arc<dyn StatusStore>,
    dispatcher: Arc<D>,
    registry: Arc<Registry>,
    config: Config,
    clock: C,
    cancel: CancellationToken,
    cleanup: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl<D: Dispatch + 'static, C: Clock + 'static> Engine<D, C> {
    pub fn with_clock(
        store: Arc<dyn StatusStore>,
        dispatcher: Arc<D>,
        registry: Arc<Registry>,
        config: Config,
        clock: C,
    ) -> Self {
        Self {
            store,
            dispatcher,
            registry,
            config,
            clock,
            cancel: CancellationToken::new(),
            cleanup: parking_lot::Mutex::new(None),
        }
    }

    /// Attach the store session and launch the periodic cleanup task.
    pub fn initialize(&self) -> Result<(), ExecuteError> {
        self.store.init_session()?;
        self.schedule_cleanup();
        Ok(())
    }

    /// Stop the cleanup loop. The pool is shut down by its owner.
    pub async fn terminate(&self) {
        self.cancel.cancel();
        let task = self.cleanup.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    pub fn list_processes(&self) -> Vec<String> {
        self.registry.identifiers()
    }

    /// Run a job. Sync requests block (bounded by the request timeout)
    /// and return the response document; fire-and-forget requests
    /// return as soon as the job is accepted.
    pub async fn execute(&self, request: JobRequest) -> Result<ExecuteReply, ExecuteError> {
        if !self.registry.contains(&request.identifier) {
            return Err(ExecuteError::UnknownProcess(request.identifier));
        }
        self.store.log_request(&request)?;

        let workdir = self.workdir_of(&request.uuid);
        std::fs::create_dir_all(&workdir).map_err(ExecuteError::Workdir)?;
        let spec = TaskSpec::from_request(&request, workdir);

        match request.mode() {
            Mode::FireAndForget => {
                self.store.update_status(&request.uuid, "Task accepted", None, None)?;
                self.spawn_detached(spec);
                Ok(ExecuteReply::Accepted(request.uuid))
            }
            Mode::Sync => self.execute_sync(spec).await,
        }
    }

    /// Background dispatch: the worker records progress; only failures
    /// outside the handler contract need recording here.
    fn spawn_detached(&self, spec: TaskSpec) {
        let store = Arc::clone(&self.store);
        let dispatcher = Arc::clone(&self.dispatcher);
        let uuid = spec.uuid;
        tokio::spawn(async move {
            match dispatcher.submit(spec).await {
                Ok(TaskOutcome::Done { .. }) | Ok(TaskOutcome::ProcessError { .. }) => {}
                Ok(TaskOutcome::Failed { message }) => {
                    record_internal_error(&store, uuid, &message);
                }
                Err(e) => record_internal_error(&store, uuid, &e.to_string()),
            }
        });
    }

    async fn execute_sync(&self, spec: TaskSpec) -> Result<ExecuteReply, ExecuteError> {
        let uuid = spec.uuid;
        let deadline = Duration::from_secs(spec.timeout);
        let outcome = tokio::time::timeout(deadline, self.dispatcher.submit(spec)).await;
        match outcome {
            Err(_) => Err(ExecuteError::Timeout),
            Ok(Ok(TaskOutcome::Done { document })) => {
                let value = match document {
                    None => serde_json::Value::Null,
                    Some(text) => serde_json::from_str(&text)
                        .map_err(|e| ExecuteError::Worker(e.to_string()))?,
                };
                Ok(ExecuteReply::Completed(value))
            }
            Ok(Ok(TaskOutcome::ProcessError { message })) => Err(ExecuteError::Process(message)),
            Ok(Ok(TaskOutcome::Failed { message })) => {
                record_internal_error(&self.store, uuid, &message);
                Err(ExecuteError::Worker(message))
            }
            Ok(Err(WorkerError::Cancelled)) => {
                Err(ExecuteError::Worker("submission cancelled".to_string()))
            }
            Ok(Err(e)) => {
                record_internal_error(&self.store, uuid, &e.to_string());
                Err(ExecuteError::Worker(e.to_string()))
            }
        }
    }

    pub fn get_status(&self, uuid: &JobId) -> Result<Option<StatusRecord>, ExecuteError> {
        Ok(self.store.get_status(uuid)?)
    }

    pub fn all_status(&self) -> Result<Vec<StatusRecord>, ExecuteError> {
        Ok(self.store.records()?)
    }

    pub fn get_results(&self, uuid: &JobId) -> Result<Option<serde_json::Value>, ExecuteError> {
        Ok(self.store.get_results(uuid)?)
    }

    /// Delete a job's record and workdir.
    ///
    /// Unknown uuid is an error; an in-flight job is refused with
    /// `Ok(false)` and left untouched.
    pub fn delete_results(&self, uuid: &JobId) -> Result<bool, ExecuteError> {
        let record = self.store.get_status(uuid)?.ok_or(ExecuteError::NotFound(*uuid))?;
        if !record.is_terminal() {
            return Ok(false);
        }
        info!(%uuid, "cleaning response status");
        remove_workdir(&self.workdir_of(uuid));
        self.store.delete_response(uuid)?;
        Ok(true)
    }

    fn workdir_of(&self, uuid: &JobId) -> PathBuf {
        self.config.workdir.join(uuid.to_string())
    }

    fn schedule_cleanup(&self) {
        let store = Arc::clone(&self.store);
        let workdir = self.config.workdir.clone();
        let interval = Duration::from_secs(self.config.cleanup_interval);
        let expiration = self.config.response_expiration;
        let clock = self.clock.clone();
        let cancel = self.cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
                // Runs on the control-plane scheduler; passes are short
                // and never touch non-terminal, in-deadline records.
                run_cleanup(store.as_ref(), &workdir, expiration, clock.epoch_secs());
            }
        });
        *self.cleanup.lock() = Some(task);
    }
}

impl<D: Dispatch + 'static> Engine<D, SystemClock> {
    pub fn new(
        store: Arc<dyn StatusStore>,
        dispatcher: Arc<D>,
        registry: Arc<Registry>,
        config: Config,
    ) -> Self {
        Self::with_clock(store, dispatcher, registry, config, SystemClock)
    }
}

fn record_internal_error(store: &Arc<dyn StatusStore>, uuid: JobId, message: &str) {
    error!(%uuid, message, "uncaught process failure");
    if let Err(e) = store.update_status(&uuid, "Internal error", None, Some(Status::Error)) {
        error!(%uuid, error = %e, "cannot record internal error");
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
