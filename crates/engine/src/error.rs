// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for job execution and scheduling.

use bos_core::TaskId;
use thiserror::Error;

/// Failure of one step inside `Job::run`. Cancellation is modeled as a
/// variant (not a panic or a signal) so the run loop can map it straight
/// to `TaskStatus::Canceled` with `?`.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("task was cancelled")]
    Cancelled,
    #[error("timeout exceeded")]
    TimedOut,
    #[error("command exited with status {0}")]
    NonZeroExit(i32),
    #[error("failed to spawn command: {0}")]
    SpawnFailed(String),
    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),
    #[error("failed to archive results: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("store error: {0}")]
    Store(#[from] bos_storage::StoreError),
}

/// Errors surfaced by the scheduler's control operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("task {0} is not in a removable (queued) state")]
    NotRemovable(TaskId),
    #[error("no task is currently running")]
    NothingRunning,
    #[error("store error: {0}")]
    Store(#[from] bos_storage::StoreError),
}
