// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response object handed to handlers.

use std::sync::Arc;
use toil_core::{JobId, Status};
use toil_store::{StatusStore, StoreError};

/// Mutable response for one handler invocation.
///
/// Carries its own store handle, injected at construction time by the
/// worker, so status updates flow through the job's session rather
/// than any process-wide state.
pub struct JobResponse {
    uuid: JobId,
    identifier: String,
    status: Status,
    store_response: bool,
    store: Arc<dyn StatusStore>,
    document: serde_json::Value,
}

impl JobResponse {
    pub fn new(
        uuid: JobId,
        identifier: impl Into<String>,
        requested: Status,
        store: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            uuid,
            identifier: identifier.into(),
            status: requested,
            // Snapshot of the request-side threshold: progressing to
            // DONE later must not change whether we persist.
            store_response: requested.stores_response(),
            store,
            document: serde_json::Value::Null,
        }
    }

    pub fn uuid(&self) -> JobId {
        self.uuid
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether the response document must be persisted.
    pub fn stores_response(&self) -> bool {
        self.store_response
    }

    pub fn document(&self) -> &serde_json::Value {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut serde_json::Value {
        &mut self.document
    }

    pub fn set_document(&mut self, document: serde_json::Value) {
        self.document = document;
    }

    /// Record a status update for this job.
    pub fn update_status(
        &mut self,
        message: &str,
        progress: Option<u8>,
        status: Option<Status>,
    ) -> Result<(), StoreError> {
        if let Some(next) = status {
            self.status = next;
        }
        self.store.update_status(&self.uuid, message, progress, status)
    }

    /// Render the document to text, the transport-safe form required
    /// before it crosses the process boundary.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.document)
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
