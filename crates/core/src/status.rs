// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered status model for job records.
//!
//! The variant order is load-bearing: a record only ever moves forward,
//! `stores_response` and `is_terminal` are threshold checks, and the
//! cleanup pass keys off terminality.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a job, ordered by progression.
///
/// `StoreStatus` and `StoreAndUpdateStatus` are request-side statuses:
/// anything at or past `StoreStatus` persists its response document,
/// and `StoreAndUpdateStatus` additionally selects fire-and-forget
/// dispatch. `Done` and `Error` are the terminal states.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Accepted,
    Started,
    Paused,
    StoreStatus,
    StoreAndUpdateStatus,
    Done,
    Error,
}

impl Status {
    /// Terminal states may be deleted; nothing progresses past them.
    pub fn is_terminal(self) -> bool {
        self >= Status::Done
    }

    /// Whether the response document must be persisted to the store.
    pub fn stores_response(self) -> bool {
        self >= Status::StoreStatus
    }

    /// Execution mode selected by a request carrying this status.
    pub fn mode(self) -> Mode {
        if self == Status::StoreAndUpdateStatus {
            Mode::FireAndForget
        } else {
            Mode::Sync
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Accepted => "accepted",
            Status::Started => "started",
            Status::Paused => "paused",
            Status::StoreStatus => "store_status",
            Status::StoreAndUpdateStatus => "store_and_update_status",
            Status::Done => "done",
            Status::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Execution mode: whether the caller blocks for the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sync,
    FireAndForget,
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
