// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FIFO job queue backed by a single worker thread.

use crate::error::SchedulerError;
use crate::job::Job;
use crate::workspace::Workspace;
use bos_core::{Clock, RepoId, TaskId, TaskStatus};
use bos_storage::Store;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

struct State {
    queue: VecDeque<Arc<Job>>,
    jobs: HashMap<TaskId, Arc<Job>>,
    current_job: Option<Arc<Job>>,
    shutting_down: bool,
}

/// Runs at most one job at a time, in FIFO order, on a dedicated
/// background thread. `enqueue`/`remove`/`kill_current` are the only
/// operations that touch the shared state directly; everything else is
/// read through `current_job` or the store.
pub struct Scheduler {
    state: Mutex<State>,
    not_empty: Condvar,
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    workspaces_root: PathBuf,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, workspaces_root: PathBuf) -> Arc<Self> {
        let scheduler = Arc::new(Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                jobs: HashMap::new(),
                current_job: None,
                shutting_down: false,
            }),
            not_empty: Condvar::new(),
            store,
            clock,
            workspaces_root,
            worker: Mutex::new(None),
        });
        let worker_scheduler = scheduler.clone();
        let handle = std::thread::spawn(move || worker_scheduler.run_worker_loop());
        *scheduler.worker.lock() = Some(handle);
        scheduler
    }

    /// Create a task row, build its workspace, and append it to the
    /// queue. Fails if `repo_id` is unknown to the store.
    pub fn enqueue(&self, repo_id: &RepoId, timeout: Duration) -> Result<Arc<Job>, SchedulerError> {
        let task_id = TaskId::generate();
        let created_at = self.clock.now_string();
        self.store.create_task(&task_id, repo_id, &created_at)?;

        let repo = self
            .store
            .get_repository(repo_id)?
            .ok_or_else(|| SchedulerError::NotFound(task_id.clone()))?;
        let workspace = Workspace::create(&self.workspaces_root, &task_id)
            .map_err(|e| SchedulerError::Store(bos_storage::StoreError::Io(e)))?;
        let job = Arc::new(Job::new(task_id.clone(), repo_id.clone(), repo.git_uri, timeout, workspace));

        let mut state = self.state.lock();
        state.jobs.insert(task_id, job.clone());
        state.queue.push_back(job.clone());
        self.not_empty.notify_one();
        Ok(job)
    }

    /// Cancel a still-queued task. Fails if the task isn't queued (already
    /// running, or already terminal).
    pub fn remove(&self, task_id: &TaskId) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        let job = state
            .jobs
            .get(task_id)
            .cloned()
            .ok_or_else(|| SchedulerError::NotFound(task_id.clone()))?;
        if job.status() != TaskStatus::Queued {
            return Err(SchedulerError::NotRemovable(task_id.clone()));
        }
        job.cancel_while_queued();
        state.queue.retain(|j| j.task_id != *task_id);
        drop(state);

        let finished_at = self.clock.now_string();
        self.store.update_task_status(task_id, TaskStatus::Canceled, None, Some(&finished_at))?;
        Ok(())
    }

    /// Signal the currently-running job to stop. No-op (an error) if
    /// nothing is running.
    pub fn kill_current(&self) -> Result<TaskId, SchedulerError> {
        let state = self.state.lock();
        match &state.current_job {
            Some(job) if job.status() == TaskStatus::Running => {
                job.kill();
                Ok(job.task_id.clone())
            }
            _ => Err(SchedulerError::NothingRunning),
        }
    }

    pub fn current_job(&self) -> Option<Arc<Job>> {
        self.state.lock().current_job.clone()
    }

    /// Cancel every still-queued task, then stop the worker thread and
    /// wait for it to finish whatever it's currently running.
    pub fn shutdown(&self) {
        let finished_at = self.clock.now_string();
        {
            let mut state = self.state.lock();
            for job in state.queue.drain(..) {
                job.cancel_while_queued();
                if let Err(e) = self.store.update_task_status(&job.task_id, TaskStatus::Canceled, None, Some(&finished_at)) {
                    tracing::warn!(task_id = %job.task_id, error = %e, "failed to persist cancellation on shutdown");
                }
            }
            state.shutting_down = true;
        }
        self.not_empty.notify_all();

        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    fn run_worker_loop(&self) {
        loop {
            let job = {
                let mut state = self.state.lock();
                loop {
                    if let Some(job) = state.queue.pop_front() {
                        break Some(job);
                    }
                    if state.shutting_down {
                        break None;
                    }
                    self.not_empty.wait(&mut state);
                }
            };

            let Some(job) = job else { break };

            self.state.lock().current_job = Some(job.clone());
            if job.status() != TaskStatus::Canceled {
                job.run(&self.store, self.clock.as_ref());
            }
            self.state.lock().current_job = None;
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
