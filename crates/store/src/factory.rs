// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named backend resolution.

use crate::{FileStore, MemoryStore, StatusStore, StoreError};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Resolve a status store backend by its configured name.
///
/// `root` is the storage directory for file-backed backends; the
/// `memory` backend ignores it. An unknown name fails initialization.
pub fn create_store(name: &str, root: &Path) -> Result<Arc<dyn StatusStore>, StoreError> {
    info!(backend = name, "loading status store");
    match name {
        "files" => Ok(Arc::new(FileStore::new(root))),
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => Err(StoreError::StorageNotFound(other.to_string())),
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
