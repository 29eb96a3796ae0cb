// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incoming job request.

use crate::id::JobId;
use crate::status::{Mode, Status};
use serde::{Deserialize, Serialize};

/// A request to run one handler invocation.
///
/// `status` is the requested status mode (see [`Status`]): it decides
/// whether the response document is persisted and whether dispatch is
/// fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub uuid: JobId,
    /// Key into the handler registry.
    pub identifier: String,
    /// Opaque input payload handed to the handler.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Per-job deadline in seconds, must be > 0.
    pub timeout: u64,
    #[serde(default = "default_status")]
    pub status: Status,
}

fn default_status() -> Status {
    Status::Accepted
}

impl JobRequest {
    pub fn new(identifier: impl Into<String>, payload: serde_json::Value, timeout: u64) -> Self {
        Self {
            uuid: JobId::generate(),
            identifier: identifier.into(),
            payload,
            timeout,
            status: Status::Accepted,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn mode(&self) -> Mode {
        self.status.mode()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
