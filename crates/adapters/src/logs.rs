// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log delivery. `poll_logs` is the authoritative cursor-polling
//! primitive; `sse_frames` is a thin framing adapter on top of it for
//! callers that want to push Server-Sent Events instead of driving their
//! own poll loop.

use crate::error::AdapterError;
use bos_core::{LogEntry, TaskId};
use bos_storage::Store;
use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

/// Fetch every log line with `id > cursor`, returning them alongside the
/// cursor to pass on the next call (the highest id seen, or `cursor`
/// unchanged if nothing new arrived).
pub fn poll_logs(store: &Store, task_id: &TaskId, cursor: i64) -> Result<(Vec<LogEntry>, i64), AdapterError> {
    let logs = store.logs_since(task_id, cursor)?;
    let next_cursor = logs.last().map(|entry| entry.id).unwrap_or(cursor);
    Ok((logs, next_cursor))
}

/// Iterator over SSE-framed log lines for one task. Blocks (sleeping
/// `poll_interval` between empty polls) until new lines arrive, and ends
/// once the task reaches a terminal status with nothing left to deliver.
pub struct SseFrames<'a> {
    store: &'a Store,
    task_id: TaskId,
    cursor: i64,
    poll_interval: Duration,
    buffered: VecDeque<LogEntry>,
}

impl<'a> SseFrames<'a> {
    pub fn new(store: &'a Store, task_id: TaskId, poll_interval: Duration) -> Self {
        Self {
            store,
            task_id,
            cursor: 0,
            poll_interval,
            buffered: VecDeque::new(),
        }
    }
}

impl Iterator for SseFrames<'_> {
    type Item = Result<String, AdapterError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffered.pop_front() {
                return Some(Ok(sse_frame(&entry)));
            }

            match poll_logs(self.store, &self.task_id, self.cursor) {
                Ok((logs, next_cursor)) => {
                    self.cursor = next_cursor;
                    if logs.is_empty() {
                        match self.store.get_task(&self.task_id) {
                            Ok(Some(task)) if task.task.status.is_terminal() => return None,
                            Ok(Some(_)) => {
                                thread::sleep(self.poll_interval);
                                continue;
                            }
                            Ok(None) => return Some(Err(AdapterError::NotFound)),
                            Err(e) => return Some(Err(AdapterError::Store(e))),
                        }
                    }
                    self.buffered.extend(logs);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn sse_frame(entry: &LogEntry) -> String {
    format!("data: {}\n\n", entry.line)
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
