// CLASSIFICATION: COMMUNITY
// Filename: clock.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Wall-clock abstraction so timestamps can be pinned in tests.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Time source for leaf timestamps and history queries.
pub trait Clock: Send + Sync {
    /// Return the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation backed by `Utc::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock forward by `step`.
    pub fn advance(&self, step: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += step;
    }

    /// Pin the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}
