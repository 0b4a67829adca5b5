// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the control/query surface. No HTTP status-code mapping
//! lives here — that belongs to whatever HTTP layer is wired on top.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("not found")]
    NotFound,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("store error: {0}")]
    Store(#[from] bos_storage::StoreError),
}

impl From<bos_engine::SchedulerError> for AdapterError {
    fn from(err: bos_engine::SchedulerError) -> Self {
        use bos_engine::SchedulerError as E;
        let message = err.to_string();
        match err {
            E::NotFound(_) => AdapterError::NotFound,
            E::NotRemovable(_) | E::NothingRunning => AdapterError::InvalidState(message),
            E::Store(e) => AdapterError::Store(e),
        }
    }
}
