// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use std::io::Cursor;

fn spec() -> TaskSpec {
    TaskSpec {
        uuid: JobId::generate(),
        identifier: "echo".to_string(),
        payload: json!({"x": 1}),
        timeout: 10,
        status: Status::StoreStatus,
        workdir: PathBuf::from("/tmp/toil/job"),
    }
}

#[test]
fn order_roundtrips_through_the_pipe() {
    let order = WorkerOrder::Run(spec());
    let mut buf = Vec::new();
    write_frame(&mut buf, &order).unwrap();

    let back: WorkerOrder = read_frame(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(back, order);
}

#[test]
fn several_frames_in_sequence() {
    let init = WorkerOrder::Init(WorkerInit {
        service: "toil".to_string(),
        logstorage: "files".to_string(),
        storagedir: PathBuf::from("/tmp/toil/status"),
        lifecycle: 5,
    });
    let run = WorkerOrder::Run(spec());

    let mut buf = Vec::new();
    write_frame(&mut buf, &init).unwrap();
    write_frame(&mut buf, &run).unwrap();
    write_frame(&mut buf, &WorkerOrder::Shutdown).unwrap();

    let mut cursor = Cursor::new(&buf);
    assert_eq!(read_frame::<_, WorkerOrder>(&mut cursor).unwrap(), init);
    assert_eq!(read_frame::<_, WorkerOrder>(&mut cursor).unwrap(), run);
    assert_eq!(read_frame::<_, WorkerOrder>(&mut cursor).unwrap(), WorkerOrder::Shutdown);
}

#[test]
fn eof_is_distinguishable() {
    let err = read_frame::<_, WorkerOrder>(&mut Cursor::new(&[][..])).unwrap_err();
    assert!(err.is_eof());

    // Truncated mid-payload is still EOF-kind.
    let mut buf = Vec::new();
    write_frame(&mut buf, &WorkerOrder::Shutdown).unwrap();
    buf.truncate(buf.len() - 2);
    let err = read_frame::<_, WorkerOrder>(&mut Cursor::new(&buf)).unwrap_err();
    assert!(err.is_eof());
}

#[test]
fn oversized_frame_is_rejected_without_allocating() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&u32::MAX.to_be_bytes());
    let err = read_frame::<_, WorkerOrder>(&mut Cursor::new(&buf)).unwrap_err();
    assert!(matches!(err, FrameError::TooLarge(_)));
}

#[tokio::test]
async fn async_and_sync_sides_interoperate() {
    let reply = WorkerReply::Result {
        uuid: JobId::generate(),
        outcome: TaskOutcome::Done { document: Some("{\"x\":1}".to_string()) },
    };

    // Worker writes blocking, pool reads async.
    let mut buf = Vec::new();
    write_frame(&mut buf, &reply).unwrap();
    let back: WorkerReply = read_frame_async(&mut Cursor::new(&buf)).await.unwrap();
    assert_eq!(back, reply);

    // Pool writes async, worker reads blocking.
    let mut buf = Vec::new();
    write_frame_async(&mut buf, &reply).await.unwrap();
    let back: WorkerReply = read_frame(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(back, reply);
}

#[test]
fn spec_converts_to_request_and_back() {
    let request = JobRequest::new("echo", json!({"a": true}), 7).with_status(Status::StoreStatus);
    let spec = TaskSpec::from_request(&request, PathBuf::from("/tmp/w"));
    assert_eq!(spec.to_request(), request);
}
