// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn accepted_record_shape() {
    let uuid = JobId::generate();
    let rec = StatusRecord::accepted(uuid, "echo", 30, 1_700_000_000);

    assert_eq!(rec.uuid, uuid);
    assert_eq!(rec.status, Status::Accepted);
    assert_eq!(rec.timestamp, Some(1_700_000_000));
    assert_eq!(rec.timeout, Some(30));
    assert!(!rec.pinned);
    assert!(!rec.is_terminal());
}

#[test]
fn legacy_record_without_timestamp_deserializes() {
    let uuid = JobId::generate();
    let json = format!(r#"{{"uuid":"{}","identifier":"echo","status":"started"}}"#, uuid);
    let rec: StatusRecord = serde_json::from_str(&json).unwrap();

    assert_eq!(rec.timestamp, None);
    assert_eq!(rec.timeout, None);
    assert!(rec.message.is_empty());
}

#[test]
fn roundtrips_through_json() {
    let mut rec = StatusRecord::accepted(JobId::generate(), "echo", 30, 42);
    rec.status = Status::Done;
    rec.progress = Some(100);
    rec.document = Some("{\"x\":1}".to_string());

    let json = serde_json::to_string(&rec).unwrap();
    let back: StatusRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, rec);
}
