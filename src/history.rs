// CLASSIFICATION: COMMUNITY
// Filename: history.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Bounded time-range queries against leaves.
//!
//! The mirror keeps no samples. A [`HistoryBackend`] computes or fetches a
//! representative value for the requested range; the default backend
//! derives one from the query and current sub-second components.

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::error::{MirrorError, Result};
use crate::index::{Leaf, PathIndex};

/// Source of representative values for a time range.
pub trait HistoryBackend: Send + Sync {
    fn value_for(
        &self,
        leaf: &Leaf,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<f64>;
}

/// Stand-in backend: start-time milliseconds plus current milliseconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticHistory;

impl HistoryBackend for SyntheticHistory {
    fn value_for(
        &self,
        _leaf: &Leaf,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        Ok(f64::from(start.timestamp_subsec_millis()) + f64::from(now.timestamp_subsec_millis()))
    }
}

/// Status attached to a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Good,
}

/// Value answered for one leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryValue {
    /// Path of the leaf the value belongs to.
    pub key: String,
    pub value: f64,
    pub status: HistoryStatus,
}

/// One entry of a batched history read.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRequest {
    pub leaf_id: i64,
    /// Set once the resolver has answered this entry.
    pub processed: bool,
    pub result: Option<Result<HistoryValue>>,
}

impl HistoryRequest {
    pub fn new(leaf_id: i64) -> Self {
        Self {
            leaf_id,
            processed: false,
            result: None,
        }
    }
}

/// Whether `time` is missing or the zero time value.
pub fn is_unset(time: Option<DateTime<Utc>>) -> bool {
    match time {
        None => true,
        Some(t) => {
            t == DateTime::<Utc>::MIN_UTC
                || (t.timestamp() == 0 && t.timestamp_subsec_nanos() == 0)
        }
    }
}

/// Answers history queries through a [`HistoryBackend`].
pub struct HistoryResolver {
    backend: Box<dyn HistoryBackend>,
}

impl Default for HistoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HistoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryResolver").finish_non_exhaustive()
    }
}

impl HistoryResolver {
    /// Resolver backed by [`SyntheticHistory`].
    pub fn new() -> Self {
        Self::with_backend(Box::new(SyntheticHistory))
    }

    pub fn with_backend(backend: Box<dyn HistoryBackend>) -> Self {
        Self { backend }
    }

    /// Resolve one leaf over `[start, end]`.
    ///
    /// Unset bounds are rejected before the leaf is looked up.
    pub fn resolve_history(
        &self,
        index: &PathIndex,
        leaf_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<HistoryValue> {
        let (start, end) = check_bounds(start, end)?;
        self.resolve_one(index, leaf_id, start, end, now)
    }

    /// Resolve a batch sharing one time range, marking each answered
    /// request as processed. A missing bound rejects the whole batch.
    pub fn resolve_batch(
        &self,
        index: &PathIndex,
        requests: &mut [HistoryRequest],
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let (start, end) = check_bounds(start, end)?;
        for request in requests.iter_mut().filter(|r| !r.processed) {
            request.result = Some(self.resolve_one(index, request.leaf_id, start, end, now));
            request.processed = true;
        }
        Ok(())
    }

    fn resolve_one(
        &self,
        index: &PathIndex,
        leaf_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<HistoryValue> {
        let leaf = index
            .lookup_leaf(leaf_id)
            .ok_or_else(|| MirrorError::NotFound(format!("leaf {leaf_id}")))?;
        let value = self.backend.value_for(leaf, start, end, now)?;
        debug!("[history] leaf {leaf_id} resolved to {value}");
        Ok(HistoryValue {
            key: leaf.path.clone(),
            value,
            status: HistoryStatus::Good,
        })
    }
}

fn check_bounds(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    match (start, end) {
        (Some(s), Some(e)) if !is_unset(start) && !is_unset(end) => Ok((s, e)),
        _ => Err(MirrorError::UnsupportedQuery(
            "history reads require both start and end times".to_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn epoch_and_min_count_as_unset() {
        assert!(is_unset(None));
        assert!(is_unset(Some(DateTime::<Utc>::MIN_UTC)));
        assert!(is_unset(Some(Utc.timestamp_opt(0, 0).unwrap())));
        assert!(!is_unset(Some(Utc.timestamp_opt(1, 0).unwrap())));
    }
}
