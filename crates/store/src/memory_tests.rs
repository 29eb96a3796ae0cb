// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use toil_core::FakeClock;

fn request() -> JobRequest {
    JobRequest::new("echo", json!({"x": 1}), 30)
}

#[test]
fn log_request_creates_accepted_record() {
    let clock = FakeClock::at(500);
    let store = MemoryStore::with_clock(clock);
    let req = request();

    store.log_request(&req).unwrap();

    let rec = store.get_status(&req.uuid).unwrap().unwrap();
    assert_eq!(rec.status, Status::Accepted);
    assert_eq!(rec.timestamp, Some(500));
    assert_eq!(rec.timeout, Some(30));
}

#[test]
fn update_refreshes_timestamp() {
    let clock = FakeClock::at(500);
    let store = MemoryStore::with_clock(clock.clone());
    let req = request();
    store.log_request(&req).unwrap();

    clock.advance_secs(10);
    store.update_status(&req.uuid, "Task started", Some(0), Some(Status::Started)).unwrap();

    let rec = store.get_status(&req.uuid).unwrap().unwrap();
    assert_eq!(rec.status, Status::Started);
    assert_eq!(rec.message, "Task started");
    assert_eq!(rec.progress, Some(0));
    assert_eq!(rec.timestamp, Some(clock.epoch_secs()));
}

#[test]
fn update_unknown_uuid_is_silent() {
    let store = MemoryStore::new();
    store.update_status(&JobId::generate(), "late", None, Some(Status::Error)).unwrap();
    assert!(store.records().unwrap().is_empty());
}

#[test]
fn terminal_record_resists_regression() {
    let store = MemoryStore::new();
    let req = request();
    store.log_request(&req).unwrap();
    store.update_status(&req.uuid, "done", Some(100), Some(Status::Done)).unwrap();

    store.update_status(&req.uuid, "late start", Some(0), Some(Status::Started)).unwrap();

    let rec = store.get_status(&req.uuid).unwrap().unwrap();
    assert_eq!(rec.status, Status::Done);
}

#[test]
fn results_roundtrip() {
    let store = MemoryStore::new();
    let req = request();
    store.log_request(&req).unwrap();

    assert_eq!(store.get_results(&req.uuid).unwrap(), None);

    store.store_response(&req.uuid, "{\"x\":1}").unwrap();
    assert_eq!(store.get_results(&req.uuid).unwrap(), Some(json!({"x": 1})));
}

#[test]
fn delete_is_idempotent() {
    let store = MemoryStore::new();
    let req = request();
    store.log_request(&req).unwrap();

    store.delete_response(&req.uuid).unwrap();
    store.delete_response(&req.uuid).unwrap();
    assert!(store.get_status(&req.uuid).unwrap().is_none());
}

#[test]
fn records_returns_a_snapshot() {
    let store = MemoryStore::new();
    let a = request();
    let b = request();
    store.log_request(&a).unwrap();
    store.log_request(&b).unwrap();

    let snapshot = store.records().unwrap();
    store.delete_response(&a.uuid).unwrap();

    // The snapshot is a copy, unaffected by the delete.
    assert_eq!(snapshot.len(), 2);
    assert_eq!(store.records().unwrap().len(), 1);
}
