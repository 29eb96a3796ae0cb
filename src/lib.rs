// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Demo handler set shared by the harness worker binary and the
//! workspace integration tests. The control plane installs the same
//! registry to validate identifiers; only workers invoke the handlers.

use serde_json::json;
use toil_core::{JobRequest, ProcessError};
use toil_pool::{JobResponse, Registry};

pub fn demo_registry() -> Registry {
    Registry::new()
        .install("echo", |req: &JobRequest, resp: &mut JobResponse| {
            resp.set_document(req.payload.clone());
            Ok(())
        })
        .install("whoami", |_: &JobRequest, resp: &mut JobResponse| {
            resp.set_document(json!({ "pid": std::process::id() }));
            Ok(())
        })
        .install("sleep", |req: &JobRequest, resp: &mut JobResponse| {
            let seconds = req.payload.get("seconds").and_then(|v| v.as_u64()).unwrap_or(30);
            std::thread::sleep(std::time::Duration::from_secs(seconds));
            resp.set_document(json!({ "slept": seconds }));
            Ok(())
        })
        .install("fail", |_: &JobRequest, _: &mut JobResponse| {
            Err(ProcessError::new("boom"))
        })
        .install(
            "crash",
            |_: &JobRequest, _: &mut JobResponse| -> Result<(), ProcessError> {
                // Dies the way a segfaulting handler would: no DONE, no
                // ERROR status, just a corpse for the pool to replace.
                std::process::abort()
            },
        )
}
