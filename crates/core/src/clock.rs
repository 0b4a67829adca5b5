// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so timestamps are injectable in tests.

use chrono::{DateTime, Utc};

/// Source of the current time, with timestamps formatted as ISO-8601 UTC
/// without a timezone suffix.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Format `now()` the way the store expects it to be persisted.
    fn now_string(&self) -> String {
        format_timestamp(self.now())
    }
}

/// Format a timestamp without a timezone suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed/steppable clock for deterministic tests.
#[cfg(feature = "test-support")]
#[derive(Clone)]
pub struct FakeClock(std::sync::Arc<std::sync::Mutex<DateTime<Utc>>>);

#[cfg(feature = "test-support")]
impl FakeClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(std::sync::Arc::new(std::sync::Mutex::new(start)))
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *guard = *guard + duration;
    }
}

#[cfg(feature = "test-support")]
impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
