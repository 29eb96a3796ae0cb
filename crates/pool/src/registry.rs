// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler registry.
//!
//! The host builds one registry on the control plane (used to reject
//! unknown identifiers before dispatch) and rebuilds the same registry
//! inside each worker process, where the handlers actually run.

use crate::response::JobResponse;
use crate::PoolError;
use std::collections::HashMap;
use std::sync::Arc;
use toil_core::{JobRequest, ProcessError};

/// User-supplied function run inside a worker.
///
/// Takes the request and mutates the response; a returned
/// [`ProcessError`] is the one sanctioned way to fail a job.
pub trait Handler: Send + Sync {
    fn call(&self, request: &JobRequest, response: &mut JobResponse) -> Result<(), ProcessError>;
}

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<handler>")
    }
}

impl<F> Handler for F
where
    F: Fn(&JobRequest, &mut JobResponse) -> Result<(), ProcessError> + Send + Sync,
{
    fn call(&self, request: &JobRequest, response: &mut JobResponse) -> Result<(), ProcessError> {
        self(request, response)
    }
}

/// Identifier → handler map.
#[derive(Default, Clone)]
pub struct Registry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(mut self, identifier: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.handlers.insert(identifier.into(), Arc::new(handler));
        self
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.handlers.contains_key(identifier)
    }

    pub fn get(&self, identifier: &str) -> Result<Arc<dyn Handler>, PoolError> {
        self.handlers
            .get(identifier)
            .cloned()
            .ok_or_else(|| PoolError::UnknownProcess(identifier.to_string()))
    }

    pub fn identifiers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
