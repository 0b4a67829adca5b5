// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task clone directory lifecycle.

use bos_core::TaskId;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Owns a task's `clone_dir` (where the repo is checked out and the
/// pipeline script runs) and its `_home` subdirectory (used as `$HOME`
/// for the spawned processes). Created under a configurable workspaces
/// root; removed recursively on every exit path.
pub struct Workspace {
    root: PathBuf,
    pub clone_dir: PathBuf,
    pub home_dir: PathBuf,
}

impl Workspace {
    pub fn create(workspaces_root: &Path, task_id: &TaskId) -> io::Result<Self> {
        fs::create_dir_all(workspaces_root)?;
        let root = tempfile::Builder::new()
            .prefix(&format!("repo-{task_id}-"))
            .tempdir_in(workspaces_root)?
            .into_path();
        let home_dir = root.join("_home");
        fs::create_dir_all(&home_dir)?;
        Ok(Self {
            clone_dir: root.clone(),
            home_dir,
            root,
        })
    }

    /// Remove the clone directory (and `_home` beneath it) so `git clone`
    /// can recreate it from nothing.
    pub fn reset_clone_dir(&self) -> io::Result<()> {
        remove_dir_all_ignoring_missing(&self.clone_dir)
    }

    /// Tear down the whole workspace. Errors are logged, not propagated —
    /// a cleanup failure must never mask the task's real outcome.
    pub fn cleanup(&self) {
        if let Err(e) = remove_dir_all_ignoring_missing(&self.root) {
            tracing::warn!(error = %e, path = %self.root.display(), "failed to remove workspace directory");
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn remove_dir_all_ignoring_missing(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
