// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bos_core::{FakeClock, RepoId};
use bos_storage::Store;
use chrono::Utc;
use std::fs;
use std::process::Command;
use std::time::Duration;

fn git(args: &[&str], cwd: &Path) {
    let status = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .env("GIT_AUTHOR_NAME", "test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .expect("git command spawns");
    assert!(status.success(), "git {args:?} failed");
}

fn init_source_repo(pipeline_sh: Option<&str>) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    git(&["init", "-q"], dir.path());
    if let Some(script) = pipeline_sh {
        let config_dir = dir.path().join(".config");
        fs::create_dir_all(&config_dir).expect("mkdir .config");
        fs::write(config_dir.join("pipeline.sh"), script).expect("write pipeline.sh");
    }
    fs::write(dir.path().join("README.md"), "fixture repo\n").expect("write readme");
    git(&["add", "-A"], dir.path());
    git(&["commit", "-q", "-m", "initial"], dir.path());
    dir
}

fn setup() -> (Store, RepoId, tempfile::TempDir) {
    let store = Store::open_in_memory().expect("open store");
    let repo_id = RepoId::generate();
    store
        .create_repository(&repo_id, "placeholder", "fixture", "2026-01-01T00:00:00.000000")
        .expect("create repo");
    let workspaces_root = tempfile::tempdir().expect("workspaces root");
    (store, repo_id, workspaces_root)
}

fn make_job(store: &Store, repo_id: &RepoId, git_uri: &str, workspaces_root: &Path, timeout: Duration) -> Job {
    let task_id = TaskId::generate();
    store
        .create_task(&task_id, repo_id, "2026-01-01T00:00:00.000000")
        .expect("create task");
    let workspace = Workspace::create(workspaces_root, &task_id).expect("create workspace");
    Job::new(task_id, repo_id.clone(), git_uri.to_string(), timeout, workspace)
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

#[test]
fn runs_pipeline_script_and_archives_results() {
    let (store, repo_id, workspaces_root) = setup();
    let source = init_source_repo(Some("#!/bin/sh\nmkdir -p .result\necho hello > .result/output.txt\n"));
    let job = make_job(&store, &repo_id, &file_uri(source.path()), workspaces_root.path(), Duration::from_secs(30));
    let clock = FakeClock::new(Utc::now());

    let status = job.run(&store, &clock);

    assert_eq!(status, TaskStatus::Finished);
    let task = store.get_task(&job.task_id).expect("get task").expect("present");
    assert!(task.has_content);

    let mut archive = Vec::new();
    for chunk in store.stream_content(&job.task_id).expect("stream") {
        archive.extend(chunk.expect("chunk"));
    }
    assert_eq!(&archive[0..2], b"PK", "archive should be a valid zip");
}

#[test]
fn finishes_without_archive_when_no_result_dir() {
    let (store, repo_id, workspaces_root) = setup();
    let source = init_source_repo(None);
    let job = make_job(&store, &repo_id, &file_uri(source.path()), workspaces_root.path(), Duration::from_secs(30));
    let clock = FakeClock::new(Utc::now());

    let status = job.run(&store, &clock);

    assert_eq!(status, TaskStatus::Finished);
    let task = store.get_task(&job.task_id).expect("get task").expect("present");
    assert!(!task.has_content);
}

#[test]
fn marks_failed_when_pipeline_script_exits_non_zero() {
    let (store, repo_id, workspaces_root) = setup();
    let source = init_source_repo(Some("#!/bin/sh\nexit 7\n"));
    let job = make_job(&store, &repo_id, &file_uri(source.path()), workspaces_root.path(), Duration::from_secs(30));
    let clock = FakeClock::new(Utc::now());

    let status = job.run(&store, &clock);

    assert_eq!(status, TaskStatus::Failed);
}

#[test]
fn marks_canceled_when_killed_before_run() {
    let (store, repo_id, workspaces_root) = setup();
    let source = init_source_repo(None);
    let job = make_job(&store, &repo_id, &file_uri(source.path()), workspaces_root.path(), Duration::from_secs(30));
    job.kill();
    let clock = FakeClock::new(Utc::now());

    let status = job.run(&store, &clock);

    assert_eq!(status, TaskStatus::Canceled);
}

#[test]
fn workspace_is_cleaned_up_after_run() {
    let (store, repo_id, workspaces_root) = setup();
    let source = init_source_repo(None);
    let job = make_job(&store, &repo_id, &file_uri(source.path()), workspaces_root.path(), Duration::from_secs(30));
    let clone_dir = job.workspace.clone_dir.clone();

    job.run(&store, &FakeClock::new(Utc::now()));

    assert!(!clone_dir.exists());
}
