// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn ordering_follows_progression() {
    assert!(Status::Accepted < Status::Started);
    assert!(Status::Started < Status::Paused);
    assert!(Status::Paused < Status::StoreStatus);
    assert!(Status::StoreStatus < Status::StoreAndUpdateStatus);
    assert!(Status::StoreAndUpdateStatus < Status::Done);
    assert!(Status::Done < Status::Error);
}

#[parameterized(
    accepted = { Status::Accepted, false },
    started = { Status::Started, false },
    paused = { Status::Paused, false },
    store = { Status::StoreStatus, false },
    store_and_update = { Status::StoreAndUpdateStatus, false },
    done = { Status::Done, true },
    error = { Status::Error, true },
)]
fn terminality(status: Status, terminal: bool) {
    assert_eq!(status.is_terminal(), terminal);
}

#[parameterized(
    accepted = { Status::Accepted, false },
    store = { Status::StoreStatus, true },
    store_and_update = { Status::StoreAndUpdateStatus, true },
    done = { Status::Done, true },
)]
fn response_storage_threshold(status: Status, stores: bool) {
    assert_eq!(status.stores_response(), stores);
}

#[test]
fn mode_selection() {
    assert_eq!(Status::StoreAndUpdateStatus.mode(), Mode::FireAndForget);
    assert_eq!(Status::StoreStatus.mode(), Mode::Sync);
    assert_eq!(Status::Accepted.mode(), Mode::Sync);
}

#[test]
fn serde_snake_case() {
    let json = serde_json::to_string(&Status::StoreAndUpdateStatus).unwrap();
    assert_eq!(json, "\"store_and_update_status\"");

    let back: Status = serde_json::from_str("\"done\"").unwrap();
    assert_eq!(back, Status::Done);
}
