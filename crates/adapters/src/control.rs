// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control/query surface: the seam through which an HTTP (or CLI, or
//! anything else) layer would drive the scheduler and read the store,
//! without that layer needing to know either exists.

use crate::error::AdapterError;
use bos_core::{LogEntry, RepoId, RepositoryWithTaskCount, TaskId, TaskStatus, TaskWithContentFlag};
use bos_engine::Scheduler;
use bos_storage::{ContentChunks, Store};
use std::sync::Arc;
use std::time::Duration;

/// Maps control/query operations onto a `Scheduler` + `Store`. Owns no
/// state of its own beyond the two `Arc`s it wraps.
pub struct Adapters {
    scheduler: Arc<Scheduler>,
    store: Arc<Store>,
}

impl Adapters {
    pub fn new(scheduler: Arc<Scheduler>, store: Arc<Store>) -> Self {
        Self { scheduler, store }
    }

    pub fn enqueue(&self, repo_id: &RepoId, timeout: Duration) -> Result<TaskId, AdapterError> {
        let job = self.scheduler.enqueue(repo_id, timeout)?;
        Ok(job.task_id.clone())
    }

    pub fn remove(&self, task_id: &TaskId) -> Result<(), AdapterError> {
        self.scheduler.remove(task_id)?;
        Ok(())
    }

    pub fn kill_current(&self) -> Result<TaskId, AdapterError> {
        Ok(self.scheduler.kill_current()?)
    }

    pub fn current_job(&self) -> Option<(TaskId, TaskStatus)> {
        self.scheduler.current_job().map(|job| (job.task_id.clone(), job.status()))
    }

    pub fn list_repositories(&self) -> Result<Vec<RepositoryWithTaskCount>, AdapterError> {
        Ok(self.store.list_repositories()?)
    }

    pub fn list_tasks(&self, repo_id: &RepoId) -> Result<Vec<TaskWithContentFlag>, AdapterError> {
        Ok(self.store.list_tasks_for_repo(repo_id)?)
    }

    pub fn get_logs_since(&self, task_id: &TaskId, after_id: i64) -> Result<Vec<LogEntry>, AdapterError> {
        Ok(self.store.logs_since(task_id, after_id)?)
    }

    pub fn stream_content(&self, task_id: &TaskId) -> Result<ContentChunks<'_>, AdapterError> {
        Ok(self.store.stream_content(task_id)?)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
