// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generate_is_unique() {
    let a = JobId::generate();
    let b = JobId::generate();
    assert_ne!(a, b);
}

#[test]
fn display_roundtrips_through_parse() {
    let id = JobId::generate();
    let parsed: JobId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn serde_is_a_plain_string() {
    let id = JobId::generate();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id));

    let back: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn parse_rejects_garbage() {
    assert!("not-a-uuid".parse::<JobId>().is_err());
}
