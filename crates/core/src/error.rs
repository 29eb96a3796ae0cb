// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain error raised by user handlers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised by a handler to signal a job-level failure.
///
/// A `ProcessError` is part of the normal contract: the worker records
/// it as an ERROR status and, in sync mode, the engine surfaces it to
/// the caller. Anything else a handler does wrong is an internal error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ProcessError {
    pub message: String,
}

impl ProcessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<&str> for ProcessError {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProcessError {
    fn from(s: String) -> Self {
        Self { message: s }
    }
}
