// CLASSIFICATION: COMMUNITY
// Filename: updater.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Periodic refresh: reconcile when the snapshot source advances, then
//! push a fresh value into every leaf.

use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::entity::Snapshot;
use crate::error::Result;
use crate::mirror::{NodeMirror, RefreshReport};
use crate::reconcile::ReconcileReport;
use crate::schedule::Periodic;
use crate::source::{SnapshotSource, ValueSource};

/// When a tick should reconcile before refreshing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileTrigger {
    /// Reconcile whenever the source generation moves past the last one
    /// applied.
    #[default]
    OnAdvance,
    /// Never reconcile from the updater; the tree only changes through
    /// explicit calls.
    Disabled,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Generation observed this tick, if the source answered.
    pub generation: Option<u64>,
    /// Present when the tick reconciled.
    pub reconcile: Option<ReconcileReport>,
    pub refresh: RefreshReport,
}

/// Drives reconciliation and value refresh for a [`NodeMirror`].
pub struct ValueUpdater {
    mirror: NodeMirror,
    snapshots: Box<dyn SnapshotSource>,
    values: Box<dyn ValueSource>,
    trigger: ReconcileTrigger,
    last_generation: Option<u64>,
}

impl std::fmt::Debug for ValueUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueUpdater")
            .field("trigger", &self.trigger)
            .field("last_generation", &self.last_generation)
            .finish_non_exhaustive()
    }
}

impl ValueUpdater {
    pub fn new(
        mirror: NodeMirror,
        snapshots: Box<dyn SnapshotSource>,
        values: Box<dyn ValueSource>,
    ) -> Self {
        Self {
            mirror,
            snapshots,
            values,
            trigger: ReconcileTrigger::default(),
            last_generation: None,
        }
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: ReconcileTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Treat `generation` as already applied, e.g. after a bootstrap from
    /// the same source.
    #[must_use]
    pub fn starting_at(mut self, generation: u64) -> Self {
        self.last_generation = Some(generation);
        self
    }

    pub fn last_generation(&self) -> Option<u64> {
        self.last_generation
    }

    /// Run one refresh cycle.
    ///
    /// Source failures are logged and never abort the tick: a generation
    /// or snapshot error skips reconciliation, and a failed leaf sample
    /// leaves that leaf's previous value in place.
    pub fn tick(&mut self) -> Result<TickReport> {
        let mut report = TickReport::default();
        let pending = self.pending_snapshot(&mut report);

        let values = &mut self.values;
        let (reconciled, refresh) = self.mirror.with_core(|core| {
            let reconciled = pending
                .as_ref()
                .map(|(_, snapshot)| core.reconcile(&snapshot.entities));
            (reconciled, core.refresh_values(values.as_mut()))
        })?;

        if let (Some((generation, _)), Some(applied)) = (pending, reconciled.as_ref()) {
            self.last_generation = Some(generation);
            if !applied.is_noop() {
                info!(
                    "[update] generation {generation} applied {} edits",
                    applied.edits()
                );
            }
        }
        report.reconcile = reconciled;
        report.refresh = refresh;
        debug!(
            "[update] tick refreshed {} leaves, {} failed",
            report.refresh.updated,
            report.refresh.failed.len()
        );
        Ok(report)
    }

    /// Snapshot to apply this tick, with its generation.
    fn pending_snapshot(&mut self, report: &mut TickReport) -> Option<(u64, Snapshot)> {
        if self.trigger == ReconcileTrigger::Disabled {
            return None;
        }
        let generation = match self.snapshots.generation() {
            Ok(generation) => generation,
            Err(err) => {
                warn!("[update] generation check failed: {err}");
                return None;
            }
        };
        report.generation = Some(generation);
        if self.last_generation.is_some_and(|seen| generation <= seen) {
            return None;
        }
        match self.snapshots.latest() {
            Ok(snapshot) => Some((generation, snapshot)),
            Err(err) => {
                warn!("[update] snapshot fetch failed: {err}");
                None
            }
        }
    }

    /// Move the updater onto a background thread ticking every `interval`.
    pub fn spawn(mut self, interval: Duration) -> Result<Periodic> {
        Periodic::spawn("nodemirror-updater", interval, move || {
            if let Err(err) = self.tick() {
                warn!("[update] tick failed: {err}");
            }
        })
    }
}
