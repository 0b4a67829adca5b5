// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bos_core::SystemClock;
use std::thread;

fn new_scheduler() -> (Arc<Scheduler>, RepoId, tempfile::TempDir) {
    let store = Arc::new(Store::open_in_memory().expect("open store"));
    let repo_id = RepoId::generate();
    store
        .create_repository(&repo_id, "file:///nonexistent-repo", "fixture", "2026-01-01T00:00:00.000000")
        .expect("create repo");
    let workspaces_root = tempfile::tempdir().expect("workspaces root");
    let scheduler = Scheduler::new(store, Arc::new(SystemClock), workspaces_root.path().to_path_buf());
    (scheduler, repo_id, workspaces_root)
}

#[test]
fn enqueue_rejects_unknown_repo() {
    let store = Arc::new(Store::open_in_memory().expect("open store"));
    let workspaces_root = tempfile::tempdir().expect("workspaces root");
    let scheduler = Scheduler::new(store, Arc::new(SystemClock), workspaces_root.path().to_path_buf());

    let err = scheduler.enqueue(&RepoId::generate(), Duration::from_secs(1)).expect_err("should fail");
    assert!(matches!(err, SchedulerError::NotFound(_)));
    scheduler.shutdown();
}

#[test]
fn remove_cancels_a_still_queued_task() {
    let (scheduler, repo_id, workspaces_root) = new_scheduler();
    // Shut the worker down immediately so the queue is ours to control
    // directly, without racing a background thread for the job.
    scheduler.shutdown();

    let task_id = TaskId::generate();
    scheduler.store.create_task(&task_id, &repo_id, "2026-01-01T00:00:00.000000").expect("create task");
    let workspace = Workspace::create(workspaces_root.path(), &task_id).expect("workspace");
    let clone_dir = workspace.clone_dir.clone();
    let job = Arc::new(Job::new(task_id.clone(), repo_id.clone(), "file:///nonexistent-repo".to_string(), Duration::from_secs(1), workspace));
    {
        let mut state = scheduler.state.lock();
        state.jobs.insert(task_id.clone(), job.clone());
        state.queue.push_back(job.clone());
    }

    scheduler.remove(&task_id).expect("remove");
    let task = scheduler.store.get_task(&task_id).expect("get").expect("present");
    assert_eq!(task.task.status, TaskStatus::Canceled);
    // The in-memory status must also flip, or the worker loop's guard
    // (`job.status() != Canceled`) would still run a popped-but-removed job.
    assert_eq!(job.status(), TaskStatus::Canceled);
    assert!(!clone_dir.exists(), "a removed, never-run job must not leak its workspace directory");
}

#[test]
fn remove_unknown_task_is_not_found() {
    let (scheduler, _repo_id, _workspaces_root) = new_scheduler();
    let err = scheduler.remove(&TaskId::generate()).expect_err("should fail");
    assert!(matches!(err, SchedulerError::NotFound(_)));
    scheduler.shutdown();
}

#[test]
fn kill_current_errors_when_nothing_running() {
    let (scheduler, _repo_id, _workspaces_root) = new_scheduler();
    let err = scheduler.kill_current().expect_err("should fail");
    assert!(matches!(err, SchedulerError::NothingRunning));
    scheduler.shutdown();
}

#[test]
fn shutdown_cancels_remaining_queue_and_stops_worker() {
    let (scheduler, repo_id, _workspaces_root) = new_scheduler();
    // Repo URI is bogus, so the running job will fail fast; the point
    // here is just that shutdown drains the queue and returns.
    let _job = scheduler.enqueue(&repo_id, Duration::from_secs(5)).expect("enqueue");
    thread::sleep(Duration::from_millis(50));
    scheduler.shutdown();
}

#[test]
fn shutdown_marks_queued_jobs_canceled_in_memory_and_cleans_workspace() {
    let (scheduler, repo_id, workspaces_root) = new_scheduler();
    scheduler.shutdown();

    let task_id = TaskId::generate();
    scheduler.store.create_task(&task_id, &repo_id, "2026-01-01T00:00:00.000000").expect("create task");
    let workspace = Workspace::create(workspaces_root.path(), &task_id).expect("workspace");
    let clone_dir = workspace.clone_dir.clone();
    let job = Arc::new(Job::new(task_id.clone(), repo_id.clone(), "file:///nonexistent-repo".to_string(), Duration::from_secs(1), workspace));
    scheduler.state.lock().queue.push_back(job.clone());

    scheduler.shutdown();

    assert_eq!(job.status(), TaskStatus::Canceled);
    assert!(!clone_dir.exists(), "shutdown must not leak a still-queued job's workspace directory");
}
