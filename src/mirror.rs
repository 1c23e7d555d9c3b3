// CLASSIFICATION: COMMUNITY
// Filename: mirror.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Shared handle over the mirrored tree.
//!
//! Every structural edit, value refresh and inbound callback runs under one
//! lock, so readers never observe a half-applied reconcile pass.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::builder::{BuildReport, TreeBuilder};
use crate::clock::{Clock, SystemClock};
use crate::entity::Entity;
use crate::error::{MirrorError, Result};
use crate::gate::WriteGate;
use crate::history::{HistoryBackend, HistoryRequest, HistoryResolver, HistoryValue};
use crate::index::{Container, Leaf, PathIndex};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::source::ValueSource;
use crate::space::AddressSpace;
use crate::value::Variant;

/// Address of a node in an inbound read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    /// Container path, or a leaf path when no container matches.
    Path(String),
    /// Leaf identifier.
    Id(i64),
}

impl From<i64> for NodeRef {
    fn from(id: i64) -> Self {
        NodeRef::Id(id)
    }
}

impl From<&str> for NodeRef {
    fn from(path: &str) -> Self {
        NodeRef::Path(path.to_owned())
    }
}

/// Snapshot of one node returned to the protocol layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum NodeState {
    Container(Container),
    Leaf(Leaf),
}

/// Outcome of refreshing every leaf value once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub updated: usize,
    /// Leaves whose sample failed, with the cause.
    pub failed: Vec<MirrorError>,
}

/// State guarded by the mirror lock.
pub(crate) struct MirrorCore {
    index: PathIndex,
    space: Box<dyn AddressSpace>,
    gate: WriteGate,
    history: HistoryResolver,
    clock: Arc<dyn Clock>,
}

impl MirrorCore {
    fn build(&mut self, entities: &[Entity]) -> BuildReport {
        let now = self.clock.now();
        TreeBuilder::new(&mut self.index, &mut *self.space, now).build(entities)
    }

    pub(crate) fn reconcile(&mut self, entities: &[Entity]) -> ReconcileReport {
        let now = self.clock.now();
        Reconciler::new(&mut self.index, &mut *self.space, now).reconcile(entities)
    }

    /// Sample every live leaf, committing and notifying each success.
    pub(crate) fn refresh_values(&mut self, source: &mut dyn ValueSource) -> RefreshReport {
        let mut report = RefreshReport::default();
        let mut ids: Vec<i64> = self.index.leaves().map(|leaf| leaf.id).collect();
        ids.sort_unstable();
        for id in ids {
            let Some(leaf) = self.index.leaf_mut(id) else {
                continue;
            };
            match source.sample(leaf) {
                Ok(value) => {
                    leaf.value = value;
                    leaf.timestamp = self.clock.now();
                    let key = leaf.key();
                    self.space.notify_changed(&key);
                    report.updated += 1;
                }
                Err(err) => {
                    warn!("[update] leaf {id}: {err}");
                    report.failed.push(err);
                }
            }
        }
        report
    }
}

/// Thread-safe handle to the mirrored tree. Clones share the same tree.
#[derive(Clone)]
pub struct NodeMirror {
    inner: Arc<Mutex<MirrorCore>>,
}

impl fmt::Debug for NodeMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeMirror").finish_non_exhaustive()
    }
}

impl NodeMirror {
    /// Empty mirror publishing into `space`, stamped by the system clock.
    #[must_use]
    pub fn new(space: impl AddressSpace + 'static) -> Self {
        Self::with_clock(space, Arc::new(SystemClock))
    }

    /// Empty mirror with an explicit time source.
    #[must_use]
    pub fn with_clock(space: impl AddressSpace + 'static, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(Box::new(space), clock, HistoryResolver::new())
    }

    /// Empty mirror answering history reads from `backend`.
    #[must_use]
    pub fn with_history_backend(
        space: impl AddressSpace + 'static,
        clock: Arc<dyn Clock>,
        backend: Box<dyn HistoryBackend>,
    ) -> Self {
        Self::from_parts(Box::new(space), clock, HistoryResolver::with_backend(backend))
    }

    fn from_parts(
        space: Box<dyn AddressSpace>,
        clock: Arc<dyn Clock>,
        history: HistoryResolver,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MirrorCore {
                index: PathIndex::new(),
                space,
                gate: WriteGate::new(),
                history,
                clock,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MirrorCore>> {
        self.inner.lock().map_err(|_| MirrorError::LockPoisoned)
    }

    /// Run `f` with the tree lock held.
    pub(crate) fn with_core<R>(&self, f: impl FnOnce(&mut MirrorCore) -> R) -> Result<R> {
        let mut core = self.lock()?;
        Ok(f(&mut core))
    }

    /// Populate an empty mirror from `entities`.
    ///
    /// A mirror that already holds nodes must be brought up to date with
    /// [`NodeMirror::reconcile`] instead.
    pub fn bootstrap(&self, entities: &[Entity]) -> Result<BuildReport> {
        let mut core = self.lock()?;
        if !core.index.is_empty() {
            return Err(MirrorError::structural(
                "/",
                "mirror already populated; reconcile instead",
            ));
        }
        let report = core.build(entities);
        info!(
            "[mirror] bootstrap created {} nodes, skipped {}",
            report.created(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Bring the tree in line with `entities`.
    pub fn reconcile(&self, entities: &[Entity]) -> Result<ReconcileReport> {
        let report = self.lock()?.reconcile(entities);
        if report.is_noop() {
            debug!("[mirror] reconcile: no changes");
        } else {
            info!("[mirror] reconcile applied {} edits", report.edits());
        }
        Ok(report)
    }

    /// Answer an inbound read.
    pub fn read(&self, node: impl Into<NodeRef>) -> Result<NodeState> {
        let core = self.lock()?;
        match node.into() {
            NodeRef::Id(id) => core
                .index
                .lookup_leaf(id)
                .cloned()
                .map(NodeState::Leaf)
                .ok_or_else(|| MirrorError::NotFound(format!("leaf {id}"))),
            NodeRef::Path(path) => {
                if let Some(container) = core.index.lookup_container(&path) {
                    return Ok(NodeState::Container(container.clone()));
                }
                core.index
                    .find_leaf_by_path(&path)
                    .cloned()
                    .map(NodeState::Leaf)
                    .ok_or(MirrorError::NotFound(path))
            }
        }
    }

    /// Answer an inbound write. On success the accepted value and a fresh
    /// timestamp are committed and observers are notified; a rejected
    /// payload leaves the leaf untouched.
    pub fn write(&self, id: i64, proposed: Variant) -> Result<Variant> {
        let mut guard = self.lock()?;
        let core = &mut *guard;
        let leaf = core
            .index
            .leaf_mut(id)
            .ok_or_else(|| MirrorError::NotFound(format!("leaf {id}")))?;
        let accepted = match core.gate.validate_write(leaf, proposed) {
            Ok(value) => value,
            Err(err) => {
                debug!("[mirror] write to leaf {id} rejected: {err}");
                return Err(err);
            }
        };
        leaf.value = accepted.clone();
        leaf.timestamp = core.clock.now();
        let key = leaf.key();
        core.space.notify_changed(&key);
        Ok(accepted)
    }

    /// Answer an inbound history read for one leaf.
    pub fn query_history(
        &self,
        id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<HistoryValue> {
        let core = self.lock()?;
        let now = core.clock.now();
        core.history.resolve_history(&core.index, id, start, end, now)
    }

    /// Answer a batched history read sharing one time range.
    pub fn query_history_batch(
        &self,
        requests: &mut [HistoryRequest],
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let core = self.lock()?;
        let now = core.clock.now();
        core.history
            .resolve_batch(&core.index, requests, start, end, now)
    }

    /// Refresh every leaf from `source` once.
    pub fn refresh(&self, source: &mut dyn ValueSource) -> Result<RefreshReport> {
        self.with_core(|core| core.refresh_values(source))
    }

    pub fn lookup_container(&self, path: &str) -> Result<Option<Container>> {
        Ok(self.lock()?.index.lookup_container(path).cloned())
    }

    pub fn lookup_leaf(&self, id: i64) -> Result<Option<Leaf>> {
        Ok(self.lock()?.index.lookup_leaf(id).cloned())
    }

    /// Run a read-only closure against the index under the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&PathIndex) -> R) -> Result<R> {
        Ok(f(&self.lock()?.index))
    }
}
