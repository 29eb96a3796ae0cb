// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! toil-store: persistent status records for jobs.
//!
//! The [`StatusStore`] trait is the capability set every backend
//! implements; backends are resolved by name through [`create_store`].
//! The `files` backend is the cross-process default (the controller and
//! every worker attach their own session to the same directory); the
//! `memory` backend is single-process and exists for tests and
//! embedded use.

mod factory;
mod files;
mod memory;

pub use factory::create_store;
pub use files::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;
use toil_core::{JobId, JobRequest, Status, StatusRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested backend name is not registered. Fatal at init.
    #[error("unknown status store backend: {0}")]
    StorageNotFound(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("corrupt record for {uuid}: {message}")]
    Corrupt { uuid: JobId, message: String },
}

/// Capability set of a status store backend.
///
/// Accessed from the controller and from every worker process; each
/// implementation provides its own per-session concurrency safety.
/// Status updates for one uuid are totally ordered here: the store is
/// the serialization point.
pub trait StatusStore: Send + Sync {
    /// Attach this process to the backing store. Called once per
    /// process, including in each worker.
    fn init_session(&self) -> Result<(), StoreError>;

    /// Create the record for an incoming request, in ACCEPTED state.
    fn log_request(&self, request: &JobRequest) -> Result<(), StoreError>;

    /// Mutate an existing record and refresh its timestamp.
    ///
    /// Succeeds silently for an unknown uuid: a late update from a
    /// worker must not fail after cleanup already deleted the record.
    fn update_status(
        &self,
        uuid: &JobId,
        message: &str,
        progress: Option<u8>,
        status: Option<Status>,
    ) -> Result<(), StoreError>;

    /// Persist the rendered response document.
    fn store_response(&self, uuid: &JobId, document: &str) -> Result<(), StoreError>;

    fn get_status(&self, uuid: &JobId) -> Result<Option<StatusRecord>, StoreError>;

    /// Parsed response document of a job, or `None` when nothing was
    /// stored (yet).
    fn get_results(&self, uuid: &JobId) -> Result<Option<serde_json::Value>, StoreError>;

    /// Remove a record. Idempotent.
    fn delete_response(&self, uuid: &JobId) -> Result<(), StoreError>;

    /// Snapshot copy of all records, safe to consume while other
    /// sessions keep writing.
    fn records(&self) -> Result<Vec<StatusRecord>, StoreError>;
}

impl std::fmt::Debug for dyn StatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<status store>")
    }
}

/// Shared record-mutation rule for backends.
///
/// Terminal states win: an update carrying a non-terminal status is
/// dropped once the record is terminal, so a late STARTED from a
/// half-dead worker cannot resurrect a finished job.
pub(crate) fn apply_update(
    record: &mut StatusRecord,
    message: &str,
    progress: Option<u8>,
    status: Option<Status>,
    now: u64,
) -> bool {
    if let Some(next) = status {
        if record.status.is_terminal() && !next.is_terminal() {
            tracing::warn!(
                uuid = %record.uuid,
                current = %record.status,
                requested = %next,
                "dropping status regression on terminal record"
            );
            return false;
        }
        record.status = next;
    }
    record.message = message.to_string();
    if progress.is_some() {
        record.progress = progress;
    }
    record.timestamp = Some(now);
    true
}

/// Parse a stored document into a JSON value.
pub(crate) fn parse_document(
    uuid: &JobId,
    document: Option<&str>,
) -> Result<Option<serde_json::Value>, StoreError> {
    match document {
        None => Ok(None),
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| StoreError::Corrupt { uuid: *uuid, message: e.to_string() }),
    }
}
