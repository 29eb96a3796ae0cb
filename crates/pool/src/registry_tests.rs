// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample() -> Registry {
    Registry::new()
        .install("echo", |req: &JobRequest, resp: &mut JobResponse| {
            resp.set_document(req.payload.clone());
            Ok(())
        })
        .install("fail", |_: &JobRequest, _: &mut JobResponse| {
            Err(ProcessError::new("boom"))
        })
}

#[test]
fn lookup_finds_installed_handlers() {
    let registry = sample();
    assert!(registry.contains("echo"));
    assert!(registry.get("fail").is_ok());
}

#[test]
fn unknown_identifier_is_an_error() {
    let registry = sample();
    assert!(!registry.contains("nope"));
    let err = registry.get("nope").unwrap_err();
    assert!(matches!(err, PoolError::UnknownProcess(name) if name == "nope"));
}

#[test]
fn identifiers_are_sorted() {
    let registry = sample();
    assert_eq!(registry.identifiers(), vec!["echo".to_string(), "fail".to_string()]);
}
