// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The embedded SQLite persistence layer.
//!
//! A single embedded SQLite database behind a `parking_lot::Mutex`: every
//! mutating operation takes the lock for the duration of its (possibly
//! multi-statement) transaction, so concurrent writers never interleave.
//! WAL mode lets readers on the same connection make progress without
//! being blocked by the OS-level file lock a second writer process would
//! take — moot here since this Store is the only writer, but it costs
//! nothing to enable.

use crate::error::StoreError;
use crate::schema::{CHUNK_SIZE, SCHEMA_SQL};
use bos_core::{LogEntry, RepoId, Repository, RepositoryWithTaskCount, Task, TaskId, TaskStatus, TaskWithContentFlag};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if absent) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA synchronous=NORMAL;",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // repositories
    // ---------------------------------------------------------------

    pub fn create_repository(
        &self,
        id: &RepoId,
        git_uri: &str,
        name: &str,
        created_at: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO repositories (id, git_uri, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id.as_str(), git_uri, name, created_at],
        )?;
        Ok(())
    }

    pub fn get_repository(&self, repo_id: &RepoId) -> Result<Option<Repository>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, git_uri, name, created_at FROM repositories WHERE id = ?1",
            params![repo_id.as_str()],
            row_to_repository,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn list_repositories(&self) -> Result<Vec<RepositoryWithTaskCount>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT r.id, r.git_uri, r.name, r.created_at,
                    (SELECT COUNT(1) FROM tasks t WHERE t.repo_id = r.id) AS task_count
               FROM repositories r
              ORDER BY r.name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RepositoryWithTaskCount {
                    repository: row_to_repository(row)?,
                    task_count: row.get::<_, i64>(4)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ---------------------------------------------------------------
    // tasks
    // ---------------------------------------------------------------

    /// Create a task row with initial status `queued`. Fails with
    /// [`StoreError::NotFound`] if `repo_id` is unknown.
    pub fn create_task(
        &self,
        task_id: &TaskId,
        repo_id: &RepoId,
        created_at: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM repositories WHERE id = ?1)",
            params![repo_id.as_str()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::NotFound);
        }
        conn.execute(
            "INSERT INTO tasks (id, repo_id, status, created_at) VALUES (?1, ?2, 'queued', ?3)",
            params![task_id.as_str(), repo_id.as_str(), created_at],
        )?;
        Ok(())
    }

    pub fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        started_at: Option<&str>,
        finished_at: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let mut sql = String::from("UPDATE tasks SET status = ?1");
        let mut param_values: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(status.as_str().to_string())];

        if let Some(started_at) = started_at {
            sql.push_str(&format!(", started_at = ?{}", param_values.len() + 1));
            param_values.push(Box::new(started_at.to_string()));
        }
        if let Some(finished_at) = finished_at {
            sql.push_str(&format!(", finished_at = ?{}", param_values.len() + 1));
            param_values.push(Box::new(finished_at.to_string()));
        }
        sql.push_str(&format!(" WHERE id = ?{}", param_values.len() + 1));
        param_values.push(Box::new(task_id.as_str().to_string()));

        let refs: Vec<&dyn rusqlite::ToSql> = param_values.iter().map(|b| b.as_ref()).collect();
        conn.execute(&sql, refs.as_slice())?;
        Ok(())
    }

    pub fn get_task(&self, task_id: &TaskId) -> Result<Option<TaskWithContentFlag>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT t.id, t.repo_id, t.status, t.created_at, t.started_at, t.finished_at,
                    EXISTS(SELECT 1 FROM content_chunks cc WHERE cc.task_id = t.id) AS has_content
               FROM tasks t WHERE t.id = ?1",
            params![task_id.as_str()],
            row_to_task_with_content,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Newest first.
    pub fn list_tasks_for_repo(&self, repo_id: &RepoId) -> Result<Vec<TaskWithContentFlag>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.repo_id, t.status, t.created_at, t.started_at, t.finished_at,
                    EXISTS(SELECT 1 FROM content_chunks cc WHERE cc.task_id = t.id) AS has_content
               FROM tasks t WHERE t.repo_id = ?1 ORDER BY t.created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![repo_id.as_str()], row_to_task_with_content)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ---------------------------------------------------------------
    // logs
    // ---------------------------------------------------------------

    /// Append a log line, returning the store-assigned monotonic id.
    pub fn append_log(&self, task_id: &TaskId, timestamp: &str, line: &str) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO logs (task_id, timestamp, line) VALUES (?1, ?2, ?3)",
            params![task_id.as_str(), timestamp, line],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Rows with `id > after_id`, strictly ordered by `id`.
    pub fn logs_since(&self, task_id: &TaskId, after_id: i64) -> Result<Vec<LogEntry>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, line FROM logs WHERE task_id = ?1 AND id > ?2 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![task_id.as_str(), after_id], |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    task_id: task_id.clone(),
                    timestamp: row.get(1)?,
                    line: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ---------------------------------------------------------------
    // content chunks
    // ---------------------------------------------------------------

    /// Replace the task's content in a single transaction: old chunks,
    /// new chunks, or (if there were none) no chunks — never a mix.
    pub fn put_content(&self, task_id: &TaskId, bytes: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM content_chunks WHERE task_id = ?1",
            params![task_id.as_str()],
        )?;
        for (seq, chunk) in bytes.chunks(CHUNK_SIZE).enumerate() {
            tx.execute(
                "INSERT INTO content_chunks (task_id, seq, data) VALUES (?1, ?2, ?3)",
                params![task_id.as_str(), seq as i64, chunk],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Chunks in `seq` order. Fails with [`StoreError::NotFound`] if the
    /// task has no stored content.
    pub fn stream_content(&self, task_id: &TaskId) -> Result<ContentChunks, StoreError> {
        let count: i64 = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT COUNT(1) FROM content_chunks WHERE task_id = ?1",
                params![task_id.as_str()],
                |row| row.get(0),
            )?
        };
        if count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(ContentChunks {
            store: self,
            task_id: task_id.clone(),
            next_seq: 0,
            total: count,
        })
    }
}

fn row_to_repository(row: &rusqlite::Row) -> rusqlite::Result<Repository> {
    Ok(Repository {
        id: RepoId::new(row.get::<_, String>(0)?),
        git_uri: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_task_with_content(row: &rusqlite::Row) -> rusqlite::Result<TaskWithContentFlag> {
    let status_str: String = row.get(2)?;
    let status = TaskStatus::from_str(&status_str).unwrap_or(TaskStatus::Queued);
    Ok(TaskWithContentFlag {
        task: Task {
            id: TaskId::new(row.get::<_, String>(0)?),
            repo_id: RepoId::new(row.get::<_, String>(1)?),
            status,
            created_at: row.get(3)?,
            started_at: row.get(4)?,
            finished_at: row.get(5)?,
        },
        has_content: row.get(6)?,
    })
}

/// Lazily-fetched sequence of content chunks, read in `seq` order with
/// bounded memory regardless of the archive's total size.
pub struct ContentChunks<'a> {
    store: &'a Store,
    task_id: TaskId,
    next_seq: i64,
    total: i64,
}

impl<'a> Iterator for ContentChunks<'a> {
    type Item = Result<Vec<u8>, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_seq >= self.total {
            return None;
        }
        let conn = self.store.conn.lock();
        let result = conn.query_row(
            "SELECT data FROM content_chunks WHERE task_id = ?1 AND seq = ?2",
            params![self.task_id.as_str(), self.next_seq],
            |row| row.get::<_, Vec<u8>>(0),
        );
        self.next_seq += 1;
        match result {
            Ok(data) => Some(Ok(data)),
            Err(e) => Some(Err(StoreError::from(e))),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
