// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat channel: endpoint derivation, frame codec, worker-side
//! notifier.
//!
//! A frame is two length-delimited parts `[pid-ascii, verb]` with
//! u32 big-endian part lengths, one frame per datagram. No versioning:
//! producers and consumer come from the same build on the same host.

use std::io::{self, ErrorKind};
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

const SOCKET_PREFIX: &str = "toil";

/// Path of the supervisor socket for a service.
///
/// Lives in `TOIL_IPC_DIR` when set (tests point this at a tempdir),
/// otherwise in the system temp directory. Local to the host; the
/// trust boundary is the machine.
pub fn ipc_path(service: &str) -> PathBuf {
    let root = std::env::var_os("TOIL_IPC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    root.join(format!("{}_{}_supervisor.sock", SOCKET_PREFIX, service))
}

/// Heartbeat verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Busy,
    Done,
}

impl Verb {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            Verb::Busy => b"BUSY",
            Verb::Done => b"DONE",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("truncated frame")]
    Truncated,

    #[error("trailing bytes after frame")]
    TrailingBytes,

    #[error("frame pid is not ascii digits")]
    BadPid,

    #[error("unknown verb {0:?}")]
    BadVerb(Vec<u8>),
}

pub fn encode_frame(pid: u32, verb: Verb) -> Vec<u8> {
    let pid_part = pid.to_string().into_bytes();
    let verb_part = verb.as_bytes();
    let mut buf = Vec::with_capacity(8 + pid_part.len() + verb_part.len());
    buf.extend_from_slice(&(pid_part.len() as u32).to_be_bytes());
    buf.extend_from_slice(&pid_part);
    buf.extend_from_slice(&(verb_part.len() as u32).to_be_bytes());
    buf.extend_from_slice(verb_part);
    buf
}

pub fn decode_frame(buf: &[u8]) -> Result<(u32, Verb), FrameError> {
    let (pid_part, rest) = take_part(buf)?;
    let (verb_part, rest) = take_part(rest)?;
    if !rest.is_empty() {
        return Err(FrameError::TrailingBytes);
    }
    let pid = std::str::from_utf8(pid_part)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or(FrameError::BadPid)?;
    let verb = match verb_part {
        b"BUSY" => Verb::Busy,
        b"DONE" => Verb::Done,
        other => return Err(FrameError::BadVerb(other.to_vec())),
    };
    Ok((pid, verb))
}

fn take_part(buf: &[u8]) -> Result<(&[u8], &[u8]), FrameError> {
    if buf.len() < 4 {
        return Err(FrameError::Truncated);
    }
    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let rest = &buf[4..];
    if rest.len() < len {
        return Err(FrameError::Truncated);
    }
    Ok((&rest[..len], &rest[len..]))
}

/// Worker-side heartbeat producer.
///
/// State machine: IDLE -(BUSY)-> BUSY -(DONE)-> IDLE, with duplicate
/// notifications suppressed. Sends are non-blocking and non-queuing;
/// an absent consumer drops the datagram.
pub struct Notifier {
    sock: Option<UnixDatagram>,
    pid: u32,
    busy: bool,
}

impl Notifier {
    /// Connect to the service's supervisor endpoint.
    ///
    /// A missing endpoint disables the notifier instead of failing:
    /// workers must keep running without a supervisor.
    pub fn connect(service: &str) -> Self {
        let path = ipc_path(service);
        let sock = match Self::open(&path) {
            Ok(sock) => Some(sock),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "supervisor endpoint unavailable");
                None
            }
        };
        Self { sock, pid: std::process::id(), busy: false }
    }

    fn open(path: &PathBuf) -> io::Result<UnixDatagram> {
        let sock = UnixDatagram::unbound()?;
        sock.set_nonblocking(true)?;
        sock.connect(path)?;
        Ok(sock)
    }

    pub fn notify_busy(&mut self) {
        if !self.busy {
            self.busy = true;
            self.send(Verb::Busy);
        }
    }

    pub fn notify_done(&mut self) {
        if self.busy {
            self.busy = false;
            self.send(Verb::Done);
        }
    }

    fn send(&self, verb: Verb) {
        let Some(sock) = &self.sock else { return };
        match sock.send(&encode_frame(self.pid, verb)) {
            Ok(_) => {}
            Err(e) if no_listener(&e) => {}
            Err(e) => warn!(error = %e, "supervisor notify failed"),
        }
    }
}

/// Consumer absent or not keeping up; the heartbeat is best-effort.
fn no_listener(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionRefused
            | ErrorKind::NotFound
            | ErrorKind::NotConnected
            | ErrorKind::WouldBlock
    )
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
