// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory status store. Single-process only.

use crate::{apply_update, parse_document, StatusStore, StoreError};
use parking_lot::RwLock;
use std::collections::HashMap;
use toil_core::{Clock, JobId, JobRequest, Status, StatusRecord, SystemClock};

/// Map-backed store for tests and embedded single-process use.
pub struct MemoryStore<C: Clock = SystemClock> {
    records: RwLock<HashMap<JobId, StatusRecord>>,
    clock: C,
}

impl MemoryStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { records: RwLock::new(HashMap::new()), clock }
    }

    /// Insert a record verbatim, bypassing `log_request`. Useful for
    /// seeding cleanup scenarios.
    pub fn insert(&self, record: StatusRecord) {
        self.records.write().insert(record.uuid, record);
    }
}

impl<C: Clock> StatusStore for MemoryStore<C> {
    fn init_session(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn log_request(&self, request: &JobRequest) -> Result<(), StoreError> {
        let record = StatusRecord::accepted(
            request.uuid,
            request.identifier.clone(),
            request.timeout,
            self.clock.epoch_secs(),
        );
        self.records.write().insert(request.uuid, record);
        Ok(())
    }

    fn update_status(
        &self,
        uuid: &JobId,
        message: &str,
        progress: Option<u8>,
        status: Option<Status>,
    ) -> Result<(), StoreError> {
        if let Some(record) = self.records.write().get_mut(uuid) {
            apply_update(record, message, progress, status, self.clock.epoch_secs());
        }
        Ok(())
    }

    fn store_response(&self, uuid: &JobId, document: &str) -> Result<(), StoreError> {
        if let Some(record) = self.records.write().get_mut(uuid) {
            record.document = Some(document.to_string());
        }
        Ok(())
    }

    fn get_status(&self, uuid: &JobId) -> Result<Option<StatusRecord>, StoreError> {
        Ok(self.records.read().get(uuid).cloned())
    }

    fn get_results(&self, uuid: &JobId) -> Result<Option<serde_json::Value>, StoreError> {
        let records = self.records.read();
        parse_document(uuid, records.get(uuid).and_then(|r| r.document.as_deref()))
    }

    fn delete_response(&self, uuid: &JobId) -> Result<(), StoreError> {
        self.records.write().remove(uuid);
        Ok(())
    }

    fn records(&self) -> Result<Vec<StatusRecord>, StoreError> {
        Ok(self.records.read().values().cloned().collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
