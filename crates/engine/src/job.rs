// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One job execution: clone, run the pipeline script, archive `.result/`.

use crate::error::JobError;
use crate::workspace::Workspace;
use bos_core::{Clock, RepoId, TaskId, TaskStatus};
use bos_runner::{CancelToken, RunOutcome};
use bos_storage::Store;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use zip::write::FileOptions;
use zip::ZipWriter;

/// A single queued-then-run task. Holds everything `Scheduler::_loop`
/// needs to decide whether to run it and how to cancel it mid-flight.
pub struct Job {
    pub task_id: TaskId,
    pub repo_id: RepoId,
    git_uri: String,
    timeout: Duration,
    workspace: Workspace,
    cancel: CancelToken,
    status: Mutex<TaskStatus>,
}

impl Job {
    pub fn new(task_id: TaskId, repo_id: RepoId, git_uri: String, timeout: Duration, workspace: Workspace) -> Self {
        Self {
            task_id,
            repo_id,
            git_uri,
            timeout,
            workspace,
            cancel: CancelToken::new(),
            status: Mutex::new(TaskStatus::Queued),
        }
    }

    pub fn status(&self) -> TaskStatus {
        *self.status.lock()
    }

    fn set_status(&self, status: TaskStatus) {
        *self.status.lock() = status;
    }

    /// Ask the job to stop. Cooperative: a running child is signalled via
    /// the process group, a queued job is simply never run.
    pub fn kill(&self) {
        self.cancel.cancel();
    }

    /// Cancel a job that is still queued and will never reach `run()`.
    /// Sets the in-memory status directly to `Canceled` so the worker
    /// loop's guard can skip it if it was already popped off the queue,
    /// and tears down the workspace immediately since nothing else will.
    pub fn cancel_while_queued(&self) {
        self.cancel.cancel();
        self.set_status(TaskStatus::Canceled);
        self.workspace.cleanup();
    }

    /// Run the full clone → pipeline script → archive sequence, persisting
    /// status transitions and log lines to `store` as it goes. Returns the
    /// final status so the caller (the scheduler worker loop) doesn't need
    /// to re-read it back out of the mutex.
    pub fn run(&self, store: &Store, clock: &dyn Clock) -> TaskStatus {
        self.set_status(TaskStatus::Running);
        let started_at = clock.now_string();
        if let Err(e) = store.update_task_status(&self.task_id, TaskStatus::Running, Some(&started_at), None) {
            tracing::warn!(task_id = %self.task_id, error = %e, "failed to persist running status");
        }

        let outcome = self.execute(store, clock);
        let status = match outcome {
            Ok(()) => TaskStatus::Finished,
            Err(JobError::Cancelled) => TaskStatus::Canceled,
            Err(e) => {
                tracing::error!(task_id = %self.task_id, error = %e, "task failed");
                TaskStatus::Failed
            }
        };
        self.set_status(status);

        let finished_at = clock.now_string();
        if let Err(e) = store.update_task_status(&self.task_id, status, None, Some(&finished_at)) {
            tracing::warn!(task_id = %self.task_id, error = %e, "failed to persist final status");
        }
        self.workspace.cleanup();
        status
    }

    fn execute(&self, store: &Store, clock: &dyn Clock) -> Result<(), JobError> {
        let home = self.workspace.home_dir.to_string_lossy().into_owned();
        let mut env: Vec<(String, String)> = std::env::vars().collect();
        upsert_env(&mut env, "HOME", &home);

        self.workspace.reset_clone_dir()?;
        let clone_dir = self.workspace.clone_dir.to_string_lossy().into_owned();
        self.run_step(store, clock, &["git", "clone", &self.git_uri, &clone_dir], None, &env)?;
        self.check_cancelled()?;

        let script = self.workspace.clone_dir.join(".config").join("pipeline.sh");
        if script.is_file() {
            let script_str = script.to_string_lossy().into_owned();
            self.run_step(store, clock, &["bash", &script_str], Some(&self.workspace.clone_dir), &env)?;
            self.check_cancelled()?;
        } else {
            self.log(store, clock, "No pipeline.sh found - skipping");
        }

        let result_dir = self.workspace.clone_dir.join(".result");
        if result_dir.is_dir() {
            self.check_cancelled()?;
            self.archive_results(store, clock, &result_dir)?;
        } else {
            self.log(store, clock, "No .result directory - nothing to archive");
        }

        Ok(())
    }

    fn run_step(&self, store: &Store, clock: &dyn Clock, argv: &[&str], cwd: Option<&Path>, env: &[(String, String)]) -> Result<(), JobError> {
        self.log(store, clock, &argv.join(" "));
        let outcome = bos_runner::run(argv, cwd, env, self.timeout, &self.cancel, |line| {
            self.log(store, clock, line);
        });
        match outcome {
            RunOutcome::Ok => Ok(()),
            RunOutcome::Cancelled => Err(JobError::Cancelled),
            RunOutcome::TimedOut => {
                self.log(store, clock, "Timeout exceeded");
                Err(JobError::TimedOut)
            }
            RunOutcome::NonZeroExit(code) => Err(JobError::NonZeroExit(code)),
            RunOutcome::SpawnFailed(msg) => Err(JobError::SpawnFailed(msg)),
        }
    }

    fn archive_results(&self, store: &Store, clock: &dyn Clock, result_dir: &Path) -> Result<(), JobError> {
        let zip_path = self.workspace.clone_dir.join(format!("{}.zip", self.task_id));
        match self.write_archive(result_dir, &zip_path) {
            Ok(()) => {
                let mut bytes = Vec::new();
                File::open(&zip_path)?.read_to_end(&mut bytes)?;
                store.put_content(&self.task_id, &bytes)?;
                self.log(store, clock, &format!("Archived results -> {}", zip_path.display()));
                Ok(())
            }
            Err(e) => {
                self.log(store, clock, &format!("Archive failed: {e}"));
                Err(e)
            }
        }
    }

    fn write_archive(&self, result_dir: &Path, zip_path: &Path) -> Result<(), JobError> {
        let file = File::create(zip_path)?;
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

        for entry in walkdir::WalkDir::new(result_dir).into_iter().filter_map(Result::ok) {
            let relative = entry.path().strip_prefix(result_dir).unwrap_or(entry.path());
            if relative.as_os_str().is_empty() {
                continue;
            }
            let name = relative.to_string_lossy();
            if entry.file_type().is_dir() {
                writer.add_directory(name, options)?;
            } else if entry.file_type().is_file() {
                writer.start_file(name, options)?;
                let mut contents = Vec::new();
                File::open(entry.path())?.read_to_end(&mut contents)?;
                writer.write_all(&contents)?;
            }
        }
        writer.finish()?;
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), JobError> {
        if self.cancel.is_set() {
            Err(JobError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn log(&self, store: &Store, clock: &dyn Clock, line: &str) {
        let timestamp = clock.now_string();
        if let Err(e) = store.append_log(&self.task_id, &timestamp, line) {
            tracing::warn!(task_id = %self.task_id, error = %e, "failed to persist log line");
        }
        tracing::info!(task_id = %self.task_id, "{line}");
    }
}

fn upsert_env(env: &mut Vec<(String, String)>, key: &str, value: &str) {
    if let Some(entry) = env.iter_mut().find(|(k, _)| k == key) {
        entry.1 = value.to_string();
    } else {
        env.push((key.to_string(), value.to_string()));
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
