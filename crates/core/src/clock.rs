// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock source for record timestamps.
//!
//! Status records carry unix-second timestamps, and the cleanup pass
//! ages them against timeouts and retention windows. Both read time
//! through this trait, so tests move the clock instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Clone + Send + Sync {
    /// Current unix time in whole seconds.
    fn epoch_secs(&self) -> u64;
}

/// Reads the real system time.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Test clock pinned to an explicit epoch; moves only when told to.
///
/// Clones share the underlying time, so a store built on one handle
/// observes advances made through another.
#[derive(Clone)]
pub struct FakeClock {
    epoch: Arc<AtomicU64>,
}

impl FakeClock {
    /// A clock that reads `epoch_secs` until advanced.
    pub fn at(epoch_secs: u64) -> Self {
        Self { epoch: Arc::new(AtomicU64::new(epoch_secs)) }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.epoch.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn epoch_secs(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
