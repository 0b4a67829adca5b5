// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bos_core::RepoId;
use bos_storage::Store;

fn task_with_logs() -> (Store, TaskId) {
    let store = Store::open_in_memory().expect("open store");
    let repo_id = RepoId::generate();
    store.create_repository(&repo_id, "file:///repo.git", "repo", "2026-01-01T00:00:00.000000").expect("create repo");
    let task_id = TaskId::generate();
    store.create_task(&task_id, &repo_id, "2026-01-01T00:00:00.000000").expect("create task");
    (store, task_id)
}

#[test]
fn poll_logs_returns_new_lines_and_advances_cursor() {
    let (store, task_id) = task_with_logs();
    store.append_log(&task_id, "2026-01-01T00:00:00.100000", "first").expect("log 1");
    let second_id = store.append_log(&task_id, "2026-01-01T00:00:00.200000", "second").expect("log 2");

    let (logs, cursor) = poll_logs(&store, &task_id, 0).expect("poll");
    assert_eq!(logs.len(), 2);
    assert_eq!(cursor, second_id);

    let (logs, cursor_again) = poll_logs(&store, &task_id, cursor).expect("poll again");
    assert!(logs.is_empty());
    assert_eq!(cursor_again, cursor);
}

#[test]
fn sse_frames_ends_once_task_is_terminal_and_drained() {
    let (store, task_id) = task_with_logs();
    store.append_log(&task_id, "2026-01-01T00:00:00.100000", "line one").expect("log 1");
    store.append_log(&task_id, "2026-01-01T00:00:00.200000", "line two").expect("log 2");
    store
        .update_task_status(&task_id, bos_core::TaskStatus::Finished, None, Some("2026-01-01T00:00:00.300000"))
        .expect("finish task");

    let frames: Vec<_> = SseFrames::new(&store, task_id, Duration::from_millis(10))
        .collect::<Result<Vec<_>, _>>()
        .expect("frames");

    assert_eq!(frames, vec!["data: line one\n\n".to_string(), "data: line two\n\n".to_string()]);
}

#[test]
fn sse_frames_not_found_for_unknown_task() {
    let store = Store::open_in_memory().expect("open store");
    let frame = SseFrames::new(&store, TaskId::generate(), Duration::from_millis(10))
        .next()
        .expect("first item");
    assert!(matches!(frame, Err(AdapterError::NotFound)));
}
