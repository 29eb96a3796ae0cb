// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch protocol between the pool and its worker processes.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload, on
//! the worker's stdin/stdout. The worker side reads and writes
//! blocking (the data plane has no scheduler); the pool side is async.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use toil_core::{JobId, JobRequest, Status};

/// Upper bound on a frame payload; anything larger is a protocol bug.
const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("frame codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds limit")]
    TooLarge(u32),
}

impl FrameError {
    /// Peer closed the pipe: normal end of a worker's life.
    pub fn is_eof(&self) -> bool {
        matches!(self, FrameError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// First frame a worker receives: everything it needs to attach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInit {
    /// Service name; the supervisor endpoint derives from it.
    pub service: String,
    /// Status store backend name.
    pub logstorage: String,
    /// Storage root for file-backed stores.
    pub storagedir: PathBuf,
    /// Tasks to serve before self-terminating. 0 = eternal.
    pub lifecycle: u32,
}

/// One handler invocation, as shipped to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub uuid: JobId,
    pub identifier: String,
    pub payload: serde_json::Value,
    pub timeout: u64,
    pub status: Status,
    pub workdir: PathBuf,
}

impl TaskSpec {
    pub fn from_request(request: &JobRequest, workdir: PathBuf) -> Self {
        Self {
            uuid: request.uuid,
            identifier: request.identifier.clone(),
            payload: request.payload.clone(),
            timeout: request.timeout,
            status: request.status,
            workdir,
        }
    }

    pub fn to_request(&self) -> JobRequest {
        JobRequest {
            uuid: self.uuid,
            identifier: self.identifier.clone(),
            payload: self.payload.clone(),
            timeout: self.timeout,
            status: self.status,
        }
    }
}

/// Pool → worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerOrder {
    Init(WorkerInit),
    Run(TaskSpec),
    Shutdown,
}

/// Worker → pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerReply {
    Result { uuid: JobId, outcome: TaskOutcome },
}

/// Terminal result of one task, as reported by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Handler returned cleanly. Sync tasks carry the response
    /// document rendered to text before crossing the process boundary.
    Done { document: Option<String> },
    /// Handler raised a domain error; the worker already recorded the
    /// ERROR status.
    ProcessError { message: String },
    /// Envelope failure outside the handler contract.
    Failed { message: String },
}

pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, frame: &T) -> Result<(), FrameError> {
    let payload = serde_json::to_vec(frame)?;
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, FrameError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(serde_json::from_slice(&payload)?)
}

pub async fn write_frame_async<W, T>(writer: &mut W, frame: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(frame)?;
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame_async<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(serde_json::from_slice(&payload)?)
}

#[cfg(test)]
#[path = "frames_tests.rs"]
mod tests;
