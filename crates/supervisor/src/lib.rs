// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! toil-supervisor: out-of-band kill-timer for stalled workers.
//!
//! Workers push BUSY/DONE heartbeats over a local datagram socket; the
//! controller arms a one-shot deadline per worker pid on BUSY and
//! cancels it on DONE. A deadline that fires invokes the configured
//! kill function. The channel is one-way and best-effort by design: a
//! worker never blocks or fails because the supervisor is unreachable.

mod channel;
mod controller;

pub use channel::{decode_frame, encode_frame, ipc_path, FrameError, Notifier, Verb};
pub use controller::{KillFn, Supervisor, SupervisorError, SupervisorHandle};
