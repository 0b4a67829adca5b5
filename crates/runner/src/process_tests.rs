// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn collect_lines() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str)) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let on_line = move |line: &str| sink.lock().unwrap_or_else(|e| e.into_inner()).push(line.to_string());
    (lines, on_line)
}

#[test]
fn captures_stdout_lines_in_order_and_succeeds() {
    let (lines, on_line) = collect_lines();
    let outcome = run(
        &["sh", "-c", "echo one; echo two"],
        None,
        &[],
        Duration::from_secs(5),
        &CancelToken::new(),
        on_line,
    );
    assert_eq!(outcome, RunOutcome::Ok);
    let captured = lines.lock().unwrap_or_else(|e| e.into_inner());
    assert_eq!(*captured, vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn reports_non_zero_exit() {
    let (_lines, on_line) = collect_lines();
    let outcome = run(
        &["sh", "-c", "exit 3"],
        None,
        &[],
        Duration::from_secs(5),
        &CancelToken::new(),
        on_line,
    );
    assert_eq!(outcome, RunOutcome::NonZeroExit(3));
}

#[test]
fn cancel_token_terminates_long_running_process() {
    let (_lines, on_line) = collect_lines();
    let cancel = CancelToken::new();
    let cancel_clone = cancel.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        cancel_clone.cancel();
    });

    let start = Instant::now();
    let outcome = run(
        &["sh", "-c", "sleep 30"],
        None,
        &[],
        Duration::from_secs(60),
        &cancel,
        on_line,
    );
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn timeout_terminates_process() {
    let (_lines, on_line) = collect_lines();
    let start = Instant::now();
    let outcome = run(
        &["sh", "-c", "sleep 30"],
        None,
        &[],
        Duration::from_millis(200),
        &CancelToken::new(),
        on_line,
    );
    assert_eq!(outcome, RunOutcome::TimedOut);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn missing_binary_reports_spawn_failed() {
    let (_lines, on_line) = collect_lines();
    let outcome = run(
        &["/no/such/binary-xyz-does-not-exist"],
        None,
        &[],
        Duration::from_secs(5),
        &CancelToken::new(),
        on_line,
    );
    assert!(matches!(outcome, RunOutcome::SpawnFailed(_)));
}

#[test]
fn env_is_fully_replaced_not_merged() {
    let (lines, on_line) = collect_lines();
    let outcome = run(
        &["sh", "-c", "echo \"$ONLY_VAR\"; echo \"path_set=${PATH:+yes}\""],
        None,
        &[("ONLY_VAR".to_string(), "present".to_string())],
        Duration::from_secs(5),
        &CancelToken::new(),
        on_line,
    );
    assert_eq!(outcome, RunOutcome::Ok);
    let captured = lines.lock().unwrap_or_else(|e| e.into_inner());
    assert_eq!(captured[0], "present");
    assert_eq!(captured[1], "path_set=");
}
