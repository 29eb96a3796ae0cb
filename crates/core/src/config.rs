// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service configuration, read once at startup.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Runtime configuration for the execution substrate.
///
/// All keys have defaults so an empty TOML document is a valid config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Status store backend name, resolved by the store factory.
    pub logstorage: String,
    /// Worker pool size. A configured 0 is raised to 1.
    pub parallelprocesses: usize,
    /// Tasks served by a worker before it is recycled. 0 = eternal.
    pub processlifecycle: u32,
    /// Root of the per-job working directories.
    pub workdir: PathBuf,
    /// Root of the `files` store backend. Defaults to `{workdir}/status`.
    pub storagedir: Option<PathBuf>,
    /// Seconds between cleanup passes.
    pub cleanup_interval: u64,
    /// Default retention in seconds for terminal records.
    pub response_expiration: u64,
    /// Ceiling armed by the controller-side kill-timer when a worker
    /// reports BUSY. Heartbeat frames carry no per-job deadline.
    pub supervisor_timeout: u64,
    /// Service name; the supervisor socket path derives from it.
    pub service: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logstorage: "files".to_string(),
            parallelprocesses: 1,
            processlifecycle: 0,
            workdir: std::env::temp_dir().join("toil"),
            storagedir: None,
            cleanup_interval: 300,
            response_expiration: 86_400,
            supervisor_timeout: 3_600,
            service: "toil".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(s)?;
        Ok(cfg.normalized())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    fn normalized(mut self) -> Self {
        self.parallelprocesses = self.parallelprocesses.max(1);
        self
    }

    /// Effective storage root for file-backed stores.
    pub fn storage_root(&self) -> PathBuf {
        self.storagedir.clone().unwrap_or_else(|| self.workdir.join("status"))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
