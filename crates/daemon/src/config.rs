// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Default job timeout when a caller doesn't specify one.
const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Daemon configuration, resolved once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Root directory under which per-task clone workspaces are created.
    pub workspaces_dir: PathBuf,
    /// Timeout applied to a task when the caller doesn't specify one.
    pub default_timeout: Duration,
    /// Git URIs to seed the repository registry with on first startup.
    pub serve: Vec<String>,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `BOS_DB_PATH` (default `./buildos-pipeline.db`),
    /// `BOS_WORKSPACES_DIR` (default `./workspaces`),
    /// `BOS_DEFAULT_TIMEOUT_SECS` (default 3600),
    /// `SERVE` (comma-separated git URIs, default empty).
    pub fn load() -> Self {
        let db_path = std::env::var("BOS_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./buildos-pipeline.db"));

        let workspaces_dir = std::env::var("BOS_WORKSPACES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./workspaces"));

        let default_timeout = std::env::var("BOS_DEFAULT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let serve = std::env::var("SERVE")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            db_path,
            workspaces_dir,
            default_timeout,
            serve,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
