// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use toil_core::{Clock, FakeClock, JobId, Status};
use toil_store::MemoryStore;
use yare::parameterized;

const DEFAULT_EXPIRATION: u64 = 86_400;

struct Fixture {
    clock: FakeClock,
    store: MemoryStore<FakeClock>,
    root: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let clock = FakeClock::at(1_000_000);
        let store = MemoryStore::with_clock(clock.clone());
        Self { clock, store, root: tempfile::tempdir().unwrap() }
    }

    /// Seed a record stamped at the current fake time, with a workdir
    /// on disk.
    fn seed(&self, status: Status, timeout: u64, pinned: bool) -> JobId {
        let uuid = JobId::generate();
        let mut record = toil_core::StatusRecord::accepted(
            uuid,
            "echo",
            timeout,
            self.clock.epoch_secs(),
        );
        record.status = status;
        record.pinned = pinned;
        self.store.insert(record);
        std::fs::create_dir_all(self.workdir(&uuid)).unwrap();
        uuid
    }

    fn workdir(&self, uuid: &JobId) -> std::path::PathBuf {
        self.root.path().join(uuid.to_string())
    }

    fn sweep(&self) -> usize {
        run_cleanup(&self.store, self.root.path(), DEFAULT_EXPIRATION, self.clock.epoch_secs())
    }

    fn exists(&self, uuid: &JobId) -> bool {
        self.store.get_status(uuid).unwrap().is_some()
    }
}

#[test]
fn dangling_started_record_is_reclaimed() {
    let fx = Fixture::new();
    let uuid = fx.seed(Status::Started, 60, false);

    fx.clock.advance_secs(3600);
    assert_eq!(fx.sweep(), 1);

    assert!(!fx.exists(&uuid));
    assert!(!fx.workdir(&uuid).exists());
}

#[test]
fn pinned_record_survives_everything() {
    let fx = Fixture::new();
    let dangling = fx.seed(Status::Started, 60, true);
    let expired = fx.seed(Status::Done, 60, true);

    fx.clock.advance_secs(DEFAULT_EXPIRATION * 2);
    assert_eq!(fx.sweep(), 0);

    assert!(fx.exists(&dangling));
    assert!(fx.exists(&expired));
    assert!(fx.workdir(&dangling).exists());
}

#[test]
fn in_flight_record_within_deadline_is_kept() {
    let fx = Fixture::new();
    let uuid = fx.seed(Status::Started, 600, false);

    fx.clock.advance_secs(30);
    assert_eq!(fx.sweep(), 0);

    assert!(fx.exists(&uuid));
    assert!(fx.workdir(&uuid).exists());
}

#[test]
fn terminal_record_expires_after_retention() {
    let fx = Fixture::new();
    let uuid = fx.seed(Status::Done, 60, false);

    fx.clock.advance_secs(DEFAULT_EXPIRATION - 1);
    assert_eq!(fx.sweep(), 0);
    assert!(fx.exists(&uuid));

    fx.clock.advance_secs(1);
    assert_eq!(fx.sweep(), 1);
    assert!(!fx.exists(&uuid));
}

#[test]
fn per_record_expiration_overrides_default() {
    let fx = Fixture::new();
    let uuid = JobId::generate();
    let mut record =
        toil_core::StatusRecord::accepted(uuid, "echo", 60, fx.clock.epoch_secs());
    record.status = Status::Error;
    record.expiration = Some(10);
    fx.store.insert(record);

    fx.clock.advance_secs(11);
    assert_eq!(fx.sweep(), 1);
    assert!(!fx.exists(&uuid));
}

#[parameterized(
    done = { Status::Done },
    error = { Status::Error },
)]
fn fresh_terminal_records_are_kept(status: Status) {
    let fx = Fixture::new();
    let uuid = fx.seed(status, 60, false);

    fx.clock.advance_secs(120);
    assert_eq!(fx.sweep(), 0);
    assert!(fx.exists(&uuid));
}

#[test]
fn record_without_timestamp_is_dangling() {
    let fx = Fixture::new();
    let uuid = JobId::generate();
    let mut record = toil_core::StatusRecord::accepted(uuid, "echo", 60, 0);
    record.timestamp = None;
    fx.store.insert(record);

    assert_eq!(fx.sweep(), 1);
    assert!(!fx.exists(&uuid));
}

#[test]
fn record_without_timeout_is_dangling_when_non_terminal() {
    let fx = Fixture::new();
    let uuid = JobId::generate();
    let mut record =
        toil_core::StatusRecord::accepted(uuid, "echo", 60, fx.clock.epoch_secs());
    record.status = Status::Started;
    record.timeout = None;
    fx.store.insert(record);

    assert_eq!(fx.sweep(), 1);
    assert!(!fx.exists(&uuid));
}

#[test]
fn missing_workdir_is_tolerated() {
    let fx = Fixture::new();
    let uuid = fx.seed(Status::Started, 60, false);
    std::fs::remove_dir_all(fx.workdir(&uuid)).unwrap();

    fx.clock.advance_secs(3600);
    assert_eq!(fx.sweep(), 1);
    assert!(!fx.exists(&uuid));
}
