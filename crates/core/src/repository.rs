// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository registry entity.

use crate::RepoId;
use serde::{Deserialize, Serialize};

/// A registered Git repository. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepoId,
    pub git_uri: String,
    pub name: String,
    pub created_at: String,
}

/// A [`Repository`] plus the number of tasks ever enqueued against it,
/// as returned by `list_repositories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryWithTaskCount {
    #[serde(flatten)]
    pub repository: Repository,
    pub task_count: u64,
}

/// Derive a display name from a git URI the way the source does: the last
/// two `/`-separated path segments with a trailing `.git` stripped.
pub fn display_name_from_uri(git_uri: &str) -> String {
    let trimmed = git_uri.trim_end_matches(".git");
    let segments: Vec<&str> = trimmed.split('/').collect();
    let tail = if segments.len() >= 2 {
        &segments[segments.len() - 2..]
    } else {
        &segments[..]
    };
    tail.join("/")
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
