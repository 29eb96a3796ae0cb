// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed status store: one JSON record per job.
//!
//! This is the cross-process backend. The controller and every worker
//! open their own session against the same directory; writes go
//! through a temp file + rename so a concurrent reader never observes
//! a torn record. Jobs are written by exactly one worker at a time, so
//! read-modify-write per uuid needs no cross-process lock.

use crate::{apply_update, parse_document, StatusStore, StoreError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use toil_core::{Clock, JobId, JobRequest, Status, StatusRecord, SystemClock};
use tracing::warn;

pub struct FileStore<C: Clock = SystemClock> {
    root: PathBuf,
    clock: C,
}

impl FileStore<SystemClock> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, SystemClock)
    }
}

impl<C: Clock> FileStore<C> {
    pub fn with_clock(root: impl Into<PathBuf>, clock: C) -> Self {
        Self { root: root.into(), clock }
    }

    fn record_path(&self, uuid: &JobId) -> PathBuf {
        self.root.join(format!("{}.json", uuid))
    }

    fn read_record(&self, uuid: &JobId) -> Result<Option<StatusRecord>, StoreError> {
        match fs::read(self.record_path(uuid)) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Corrupt { uuid: *uuid, message: e.to_string() }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_record(&self, record: &StatusRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.uuid);
        let tmp = self.root.join(format!("{}.{}.tmp", record.uuid, std::process::id()));
        fs::write(&tmp, serde_json::to_vec(record)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn mutate<F>(&self, uuid: &JobId, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StatusRecord) -> bool,
    {
        match self.read_record(uuid)? {
            None => Ok(()),
            Some(mut record) => {
                if f(&mut record) {
                    self.write_record(&record)?;
                }
                Ok(())
            }
        }
    }
}

impl<C: Clock> StatusStore for FileStore<C> {
    fn init_session(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn log_request(&self, request: &JobRequest) -> Result<(), StoreError> {
        let record = StatusRecord::accepted(
            request.uuid,
            request.identifier.clone(),
            request.timeout,
            self.clock.epoch_secs(),
        );
        self.write_record(&record)
    }

    fn update_status(
        &self,
        uuid: &JobId,
        message: &str,
        progress: Option<u8>,
        status: Option<Status>,
    ) -> Result<(), StoreError> {
        let now = self.clock.epoch_secs();
        self.mutate(uuid, |record| apply_update(record, message, progress, status, now))
    }

    fn store_response(&self, uuid: &JobId, document: &str) -> Result<(), StoreError> {
        self.mutate(uuid, |record| {
            record.document = Some(document.to_string());
            true
        })
    }

    fn get_status(&self, uuid: &JobId) -> Result<Option<StatusRecord>, StoreError> {
        self.read_record(uuid)
    }

    fn get_results(&self, uuid: &JobId) -> Result<Option<serde_json::Value>, StoreError> {
        let record = self.read_record(uuid)?;
        parse_document(uuid, record.as_ref().and_then(|r| r.document.as_deref()))
    }

    fn delete_response(&self, uuid: &JobId) -> Result<(), StoreError> {
        match fs::remove_file(self.record_path(uuid)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn records(&self) -> Result<Vec<StatusRecord>, StoreError> {
        let mut out = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_loose(&path) {
                Some(record) => out.push(record),
                // A record deleted or half-written mid-enumeration is
                // not an error; the next pass sees the final state.
                None => warn!(path = %path.display(), "skipping unreadable status record"),
            }
        }
        Ok(out)
    }
}

fn read_loose(path: &Path) -> Option<StatusRecord> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
#[path = "files_tests.rs"]
mod tests;
