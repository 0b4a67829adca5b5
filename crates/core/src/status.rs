// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task status state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a [`crate::Task`].
///
/// ```text
/// queued ──worker picks──▶ running ──success──▶ finished
///    │                         │
///    │                         ├─ non-zero / spawn fail / archive fail ─▶ failed
///    │                         └─ cancel_signal set during run ────────▶ canceled
///    └─ scheduler.remove ───────────────────────────────────────────────▶ canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Finished,
    Failed,
    Canceled,
}

impl TaskStatus {
    /// Terminal statuses are absorbing: no transition leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Canceled)
    }

    /// True if `self -> next` is a valid edge in the state machine above.
    pub fn can_transition_to(self, next: Self) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Queued, Running) | (Queued, Canceled) => true,
            (Running, Finished) | (Running, Failed) | (Running, Canceled) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            "canceled" => Ok(Self::Canceled),
            other => Err(format!("invalid task status: {other}")),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
