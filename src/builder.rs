// CLASSIFICATION: COMMUNITY
// Filename: builder.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Top-down materialisation of entity subtrees.
//!
//! Every node is inserted, registered and announced before any of its
//! children is looked at, so the protocol layer never sees a child whose
//! parent it does not know yet.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::entity::{self, Entity, Validated};
use crate::error::{MirrorError, Result};
use crate::index::{Container, Leaf, NodeKey, PathIndex};
use crate::space::AddressSpace;

/// Counts of nodes materialised by a build.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BuildReport {
    pub roots: usize,
    pub containers: usize,
    pub leaves: usize,
    /// Entities left out because their parent chain could not be resolved.
    pub skipped: Vec<MirrorError>,
}

impl BuildReport {
    /// Total number of nodes created.
    pub fn created(&self) -> usize {
        self.roots + self.containers + self.leaves
    }
}

/// Creates containers and leaves in the index and registers them with the
/// address space.
pub struct TreeBuilder<'t, S: AddressSpace + ?Sized> {
    index: &'t mut PathIndex,
    space: &'t mut S,
    now: DateTime<Utc>,
}

impl<'t, S: AddressSpace + ?Sized> TreeBuilder<'t, S> {
    pub fn new(index: &'t mut PathIndex, space: &'t mut S, now: DateTime<Utc>) -> Self {
        Self { index, space, now }
    }

    /// Populate the tree from a full entity list.
    ///
    /// Nodes whose key is already indexed are left alone together with
    /// their subtree; updating existing nodes is the reconciler's job.
    pub fn build(&mut self, entities: &[Entity]) -> BuildReport {
        let snapshot = entity::validate(entities);
        let mut report = BuildReport::default();
        for err in snapshot.rejected() {
            warn!("[builder] skipping entity: {err}");
        }
        for root in snapshot.accepted().iter().filter(|e| e.is_root()) {
            self.root_subtree(root, &snapshot, &mut report);
        }
        let mut skipped = snapshot.into_rejected();
        skipped.append(&mut report.skipped);
        report.skipped = skipped;
        info!(
            "[builder] built {} roots, {} containers, {} leaves",
            report.roots, report.containers, report.leaves
        );
        report
    }

    /// Create `root` and everything the snapshot places beneath it.
    pub(crate) fn root_subtree(
        &mut self,
        root: &Entity,
        snapshot: &Validated<'_>,
        report: &mut BuildReport,
    ) {
        match self.create_root(root) {
            Ok(true) => {
                report.roots += 1;
                self.populate(&root.path, snapshot, report);
            }
            Ok(false) => debug!("[builder] root '{}' already live", root.path),
            Err(err) => {
                warn!("[builder] root '{}' not created: {err}", root.path);
                report.skipped.push(err);
            }
        }
    }

    fn populate(&mut self, parent_path: &str, snapshot: &Validated<'_>, report: &mut BuildReport) {
        for child in snapshot.children_of(parent_path) {
            if child.is_leaf {
                match self.create_leaf(child) {
                    Ok(true) => report.leaves += 1,
                    Ok(false) => debug!("[builder] leaf {} already live", child.id),
                    Err(err) => {
                        warn!("[builder] leaf {} not created: {err}", child.id);
                        report.skipped.push(err);
                    }
                }
                continue;
            }
            match self.create_container(child) {
                Ok(true) => {
                    report.containers += 1;
                    self.populate(&child.path, snapshot, report);
                }
                Ok(false) => debug!("[builder] container '{}' already live", child.path),
                Err(err) => {
                    warn!("[builder] container '{}' not created: {err}", child.path);
                    report.skipped.push(err);
                }
            }
        }
    }

    /// Create and register a root container. Returns `false` when a
    /// container already lives at its path.
    pub fn create_root(&mut self, entity: &Entity) -> Result<bool> {
        if self.index.lookup_container(&entity.path).is_some() {
            return Ok(false);
        }
        let mut container = Container::from_entity(entity);
        container.parent = None;
        let key = container.key();
        self.index.insert_container(container)?;
        if let Some(root) = self.index.lookup_container(&entity.path) {
            self.space.register_root(root);
        }
        self.space.notify_changed(&key);
        debug!("[builder] root '{}' created", entity.path);
        Ok(true)
    }

    /// Create and register a container below its (live) parent. Returns
    /// `false` when a container already lives at its path.
    pub fn create_container(&mut self, entity: &Entity) -> Result<bool> {
        if self.index.lookup_container(&entity.path).is_some() {
            return Ok(false);
        }
        self.index.insert_container(Container::from_entity(entity))?;
        if let (Some(node), Some(parent)) = (
            self.index.lookup_container(&entity.path),
            self.index.lookup_container(&entity.parent_path),
        ) {
            self.space.register_container(node, parent);
        }
        self.space
            .notify_changed(&NodeKey::Container(entity.parent_path.clone()));
        debug!(
            "[builder] container '{}' created under '{}'",
            entity.path, entity.parent_path
        );
        Ok(true)
    }

    /// Create and register a leaf below its (live) parent. Returns `false`
    /// when a leaf with the same id already exists.
    pub fn create_leaf(&mut self, entity: &Entity) -> Result<bool> {
        if self.index.lookup_leaf(entity.id).is_some() {
            return Ok(false);
        }
        self.index.insert_leaf(Leaf::from_entity(entity, self.now))?;
        if let (Some(leaf), Some(parent)) = (
            self.index.lookup_leaf(entity.id),
            self.index.lookup_container(&entity.parent_path),
        ) {
            self.space.register_leaf(leaf, parent);
        }
        self.space
            .notify_changed(&NodeKey::Container(entity.parent_path.clone()));
        debug!(
            "[builder] leaf {} created under '{}'",
            entity.id, entity.parent_path
        );
        Ok(true)
    }
}
