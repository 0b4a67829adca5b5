// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! bos-storage: embedded SQLite persistence for repositories, tasks, logs,
//! and task result archives.

pub mod error;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use schema::CHUNK_SIZE;
pub use store::{ContentChunks, Store};
