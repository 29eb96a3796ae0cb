// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker harness spawned by the pool in integration tests.

use toil_pool::worker;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if !worker::is_worker_process() {
        eprintln!("toil-harness runs only as a pool worker (TOIL_WORKER=1)");
        std::process::exit(2);
    }
    worker::run(toil_specs::demo_registry())
}
