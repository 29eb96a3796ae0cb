// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic reclamation of status records and workdirs.
//!
//! Two reasons to reclaim: *dangling* records left behind by workers
//! that died without reporting (non-terminal, past their timeout, or
//! missing a timestamp entirely), and *expired* terminal records past
//! their retention window. Pinned records are exempt from both.

use std::path::Path;
use toil_core::StatusRecord;
use toil_store::StatusStore;
use tracing::{error, info, warn};

/// One cleanup pass over a snapshot of the store. Returns the number
/// of records deleted.
pub fn run_cleanup(
    store: &dyn StatusStore,
    workdir_root: &Path,
    default_expiration: u64,
    now: u64,
) -> usize {
    info!("running cleanup task");
    let records = match store.records() {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "cleanup cannot enumerate records");
            return 0;
        }
    };

    let mut deleted = 0;
    for record in records {
        if record.pinned {
            continue;
        }
        let dangling = is_dangling(&record, now);
        if !record.is_terminal() && !dangling {
            // In-flight and within deadline: leave it alone.
            continue;
        }
        let expired = match record.timestamp {
            Some(ts) => now.saturating_sub(ts) >= record.expiration.unwrap_or(default_expiration),
            None => false,
        };
        if dangling || expired {
            info!(uuid = %record.uuid, dangling, expired, "cleaning response status");
            remove_workdir(&workdir_root.join(record.uuid.to_string()));
            // Delete even when the workdir could not be removed, so an
            // unremovable directory cannot wedge the loop forever.
            if let Err(e) = store.delete_response(&record.uuid) {
                error!(uuid = %record.uuid, error = %e, "cannot delete record");
                continue;
            }
            deleted += 1;
        }
    }
    deleted
}

/// A record whose worker died without ever reporting a terminal state.
fn is_dangling(record: &StatusRecord, now: u64) -> bool {
    let Some(timestamp) = record.timestamp else {
        return true;
    };
    if record.is_terminal() {
        return false;
    }
    match record.timeout {
        None => true,
        Some(timeout) => now.saturating_sub(timestamp) >= timeout,
    }
}

/// Remove a job's workdir, tolerating its absence. Filesystem errors
/// are logged and swallowed; the caller deletes the record regardless.
pub(crate) fn remove_workdir(workdir: &Path) {
    match std::fs::remove_dir_all(workdir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %workdir.display(), error = %e, "unable to remove directory"),
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
