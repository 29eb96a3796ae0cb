// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use toil_core::JobRequest;

fn service_name() -> String {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    format!("pool-test-{}-{}", std::process::id(), COUNTER.fetch_add(1, Ordering::Relaxed))
}

fn spec() -> TaskSpec {
    let request = JobRequest::new("echo", json!({}), 5);
    TaskSpec::from_request(&request, std::env::temp_dir().join(request.uuid.to_string()))
}

#[test]
fn from_config_clamps_parallelism() {
    let config = toil_core::Config {
        parallelprocesses: 4,
        processlifecycle: 9,
        service: "svc".to_string(),
        ..toil_core::Config::default()
    };

    let pool_config = PoolConfig::from_config(&config, WorkerCommand::new("/bin/false"));
    assert_eq!(pool_config.parallelism, 4);
    assert_eq!(pool_config.lifecycle, 9);
    assert_eq!(pool_config.service, "svc");
    assert_eq!(pool_config.storagedir, config.storage_root());
}

#[tokio::test]
async fn shutdown_cancels_pending_submissions() {
    // A worker command that cannot spawn: the slot keeps retrying and
    // the queue never drains.
    let config = PoolConfig {
        parallelism: 1,
        lifecycle: 0,
        service: service_name(),
        logstorage: "memory".to_string(),
        storagedir: std::env::temp_dir(),
        supervisor_timeout: Duration::from_secs(60),
        worker_command: WorkerCommand::new("/nonexistent/toil-worker"),
    };
    let pool = Arc::new(WorkerPool::start(config).unwrap());

    let submitter = Arc::clone(&pool);
    let pending = tokio::spawn(async move { submitter.submit(spec()).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    pool.shutdown().await;

    let result = pending.await.unwrap();
    assert_eq!(result, Err(WorkerError::Cancelled));

    // Submissions after shutdown are refused outright.
    assert_eq!(pool.submit(spec()).await, Err(WorkerError::Cancelled));
}

#[tokio::test]
async fn fake_dispatch_records_submissions() {
    let fake = FakeDispatch::completing_with("{\"ok\":true}");
    let task = spec();

    let outcome = fake.submit(task.clone()).await.unwrap();
    assert_eq!(outcome, TaskOutcome::Done { document: Some("{\"ok\":true}".to_string()) });
    assert_eq!(fake.submitted(), vec![task]);
}

#[tokio::test(start_paused = true)]
async fn fake_dispatch_delay_defers_completion() {
    let fake = FakeDispatch::replying(|_| Ok(TaskOutcome::Done { document: None }))
        .with_delay(Duration::from_secs(30));

    tokio::select! {
        _ = fake.submit(spec()) => panic!("completed before the delay"),
        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
    }
}

#[test]
fn worker_command_builder() {
    let cmd = WorkerCommand::new("/usr/bin/svc").arg("--worker").arg("-q");
    assert_eq!(cmd.program, PathBuf::from("/usr/bin/svc"));
    assert_eq!(cmd.args, vec!["--worker".to_string(), "-q".to_string()]);
}

#[test]
fn kill_worker_tolerates_missing_process() {
    // Free pid from the far end of the range; ESRCH is swallowed.
    kill_worker(4_000_000);
}
