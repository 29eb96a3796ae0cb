// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! toil-pool: bounded pool of worker processes.
//!
//! The control-plane side ([`WorkerPool`]) spawns N long-lived worker
//! processes, feeds them tasks over length-prefixed frames on their
//! stdio, recycles them after a configured number of tasks, and
//! respawns on death. The data-plane side ([`worker::run`]) is the
//! entry point a host binary calls when it finds itself spawned as a
//! worker: it attaches a store session, connects the supervisor
//! notifier, and serves tasks until recycled or shut down.

mod frames;
mod pool;
mod registry;
mod response;
pub mod worker;

pub use frames::{
    read_frame, read_frame_async, write_frame, write_frame_async, FrameError, TaskOutcome,
    TaskSpec, WorkerInit, WorkerOrder, WorkerReply,
};
#[cfg(any(test, feature = "test-support"))]
pub use pool::FakeDispatch;
pub use pool::{Dispatch, PoolConfig, WorkerCommand, WorkerPool, WORKER_ENV};
pub use registry::{Handler, Registry};
pub use response::JobResponse;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    /// Handler identifier absent from the registry. Raised by lookups
    /// on the control plane; never crosses into a worker.
    #[error("unknown process: {0}")]
    UnknownProcess(String),

    #[error("cannot spawn worker: {0}")]
    Spawn(std::io::Error),

    #[error(transparent)]
    Supervisor(#[from] toil_supervisor::SupervisorError),

    #[error(transparent)]
    Store(#[from] toil_store::StoreError),
}

/// Failure of a submitted task outside the handler contract.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker process died before delivering a result.
    #[error("worker crashed: {0}")]
    Crashed(String),

    /// The pool shut down before the task ran.
    #[error("submission cancelled")]
    Cancelled,
}
