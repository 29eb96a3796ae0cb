// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted status record.

use crate::id::JobId;
use crate::status::Status;
use serde::{Deserialize, Serialize};

/// One status record per job, owned by the status store.
///
/// `timestamp` and `timeout` are optional so that legacy or partially
/// written records still deserialize; the cleanup pass treats a missing
/// timestamp, or a non-terminal record past its timeout, as dangling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub uuid: JobId,
    pub identifier: String,
    pub status: Status,
    #[serde(default)]
    pub message: String,
    /// Percent complete, when the handler reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Unix seconds of the last update.
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// Per-job deadline in seconds, copied from the request.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Retention in seconds after reaching a terminal state. `None`
    /// falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    /// Pinned records are exempt from cleanup.
    #[serde(default)]
    pub pinned: bool,
    /// Rendered response document, present once stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl StatusRecord {
    /// Fresh ACCEPTED record for an incoming request.
    pub fn accepted(uuid: JobId, identifier: impl Into<String>, timeout: u64, now: u64) -> Self {
        Self {
            uuid,
            identifier: identifier.into(),
            status: Status::Accepted,
            message: String::new(),
            progress: None,
            timestamp: Some(now),
            timeout: Some(timeout),
            expiration: None,
            pinned: false,
            document: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
