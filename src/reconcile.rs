// CLASSIFICATION: COMMUNITY
// Filename: reconcile.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Diff-and-apply pass bringing the live tree in line with a new snapshot.
//!
//! The pass runs in a fixed order: roots, containers, leaves, then pruning.
//! Each stage relies on the previous one: containers need their roots,
//! leaves need their containers, and pruning only removes what no stage
//! claimed. Every individual edit is announced to the address space as soon
//! as it is applied.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::builder::{BuildReport, TreeBuilder};
use crate::entity::{self, Entity, Validated};
use crate::error::{MirrorError, Result};
use crate::index::{NodeKey, PathIndex};
use crate::space::AddressSpace;

/// Structural edits applied by one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    pub roots_created: usize,
    pub containers_created: usize,
    pub leaves_created: usize,
    pub renamed: usize,
    pub moved: usize,
    pub retyped: usize,
    pub leaves_removed: usize,
    pub containers_removed: usize,
    /// Entities skipped this pass; they are retried with the next snapshot.
    pub skipped: Vec<MirrorError>,
}

impl ReconcileReport {
    /// Whether the pass left the tree untouched.
    pub fn is_noop(&self) -> bool {
        self.edits() == 0
    }

    /// Number of structural edits applied.
    pub fn edits(&self) -> usize {
        self.roots_created
            + self.containers_created
            + self.leaves_created
            + self.renamed
            + self.moved
            + self.retyped
            + self.leaves_removed
            + self.containers_removed
    }

    fn absorb(&mut self, build: BuildReport) {
        self.roots_created += build.roots;
        self.containers_created += build.containers;
        self.leaves_created += build.leaves;
        self.skipped.extend(build.skipped);
    }
}

/// Applies snapshots to an existing tree.
pub struct Reconciler<'t, S: AddressSpace + ?Sized> {
    index: &'t mut PathIndex,
    space: &'t mut S,
    now: DateTime<Utc>,
}

impl<'t, S: AddressSpace + ?Sized> Reconciler<'t, S> {
    pub fn new(index: &'t mut PathIndex, space: &'t mut S, now: DateTime<Utc>) -> Self {
        Self { index, space, now }
    }

    fn builder(&mut self) -> TreeBuilder<'_, S> {
        TreeBuilder::new(self.index, self.space, self.now)
    }

    /// Bring the tree in line with `latest`.
    pub fn reconcile(&mut self, latest: &[Entity]) -> ReconcileReport {
        let snapshot = entity::validate(latest);
        let mut report = ReconcileReport::default();
        for err in snapshot.rejected() {
            warn!("[reconcile] skipping entity: {err}");
        }

        self.sync_roots(&snapshot, &mut report);
        self.sync_containers(&snapshot, &mut report);
        self.sync_leaves(&snapshot, &mut report);
        self.prune(&snapshot, &mut report);

        let mut skipped = snapshot.into_rejected();
        skipped.append(&mut report.skipped);
        report.skipped = skipped;
        if report.is_noop() {
            debug!("[reconcile] snapshot matches live tree");
        } else {
            info!(
                "[reconcile] created {}/{}/{}, renamed {}, moved {}, removed {}/{}",
                report.roots_created,
                report.containers_created,
                report.leaves_created,
                report.renamed,
                report.moved,
                report.leaves_removed,
                report.containers_removed
            );
        }
        report
    }

    fn sync_roots(&mut self, snapshot: &Validated<'_>, report: &mut ReconcileReport) {
        for root in snapshot.accepted().iter().filter(|e| e.is_root()) {
            let Some(existing) = self.index.lookup_container(&root.path) else {
                let mut build = BuildReport::default();
                self.builder().root_subtree(root, snapshot, &mut build);
                report.absorb(build);
                continue;
            };
            if !existing.is_root() {
                match self.promote_to_root(&root.path) {
                    Ok(()) => report.moved += 1,
                    Err(err) => {
                        report.skipped.push(err);
                        continue;
                    }
                }
            }
            if self.rename_container(root) {
                report.renamed += 1;
            }
        }
    }

    fn sync_containers(&mut self, snapshot: &Validated<'_>, report: &mut ReconcileReport) {
        // Ancestors first: once a parent is placed its live chain matches
        // the snapshot, so moving a child below it cannot form a cycle.
        let mut containers: Vec<&Entity> = snapshot
            .accepted()
            .iter()
            .copied()
            .filter(|e| !e.is_root() && !e.is_leaf)
            .collect();
        containers.sort_by_key(|e| snapshot.depth(&e.path));
        for entity in containers {
            let current_parent = match self.index.lookup_container(&entity.path) {
                None => {
                    if let Err(err) = self.materialize_container(entity, snapshot, report) {
                        warn!("[reconcile] container '{}' skipped: {err}", entity.path);
                        report.skipped.push(err);
                    }
                    continue;
                }
                Some(existing) => existing.parent.clone(),
            };
            if current_parent.as_deref() != Some(entity.parent_path.as_str()) {
                let moved = self
                    .materialize_parent(entity, snapshot, report)
                    .and_then(|()| self.move_container(&entity.path, &entity.parent_path));
                match moved {
                    Ok(()) => report.moved += 1,
                    Err(err) => {
                        warn!("[reconcile] container '{}' not moved: {err}", entity.path);
                        report.skipped.push(err);
                        continue;
                    }
                }
            }
            if self.rename_container(entity) {
                report.renamed += 1;
            }
        }
    }

    fn sync_leaves(&mut self, snapshot: &Validated<'_>, report: &mut ReconcileReport) {
        for entity in snapshot.accepted().iter().filter(|e| e.is_leaf) {
            let Some(existing) = self.index.lookup_leaf(entity.id) else {
                match self.builder().create_leaf(entity) {
                    Ok(_) => report.leaves_created += 1,
                    Err(err) => {
                        warn!("[reconcile] leaf {} skipped: {err}", entity.id);
                        report.skipped.push(err);
                    }
                }
                continue;
            };
            let old_parent = existing.parent_path.clone();
            let retype =
                existing.data_type != entity.data_type || existing.value_rank != entity.value_rank;
            let rename = existing.name != entity.name || existing.path != entity.path;

            if old_parent != entity.parent_path {
                match self.index.relink_leaf(entity.id, &entity.parent_path) {
                    Ok(()) => {
                        debug!(
                            "[reconcile] leaf {} moved from '{}' to '{}'",
                            entity.id, old_parent, entity.parent_path
                        );
                        self.space.notify_changed(&NodeKey::Leaf(entity.id));
                        self.space
                            .notify_changed(&NodeKey::Container(old_parent.clone()));
                        self.space
                            .notify_changed(&NodeKey::Container(entity.parent_path.clone()));
                        report.moved += 1;
                    }
                    Err(err) => {
                        warn!("[reconcile] leaf {} not moved: {err}", entity.id);
                        report.skipped.push(err);
                        continue;
                    }
                }
            }
            if let Some(leaf) = self.index.leaf_mut(entity.id) {
                if rename {
                    debug!(
                        "[reconcile] leaf {} renamed '{}' -> '{}'",
                        entity.id, leaf.name, entity.name
                    );
                    leaf.name = entity.name.clone();
                    leaf.path = entity.path.clone();
                    report.renamed += 1;
                }
                if retype {
                    leaf.data_type = entity.data_type;
                    leaf.value_rank = entity.value_rank;
                    leaf.value = entity.value_rank.zero(entity.data_type);
                    leaf.timestamp = self.now;
                    report.retyped += 1;
                }
                if rename || retype {
                    self.space.notify_changed(&NodeKey::Leaf(entity.id));
                }
            }
        }
    }

    fn prune(&mut self, snapshot: &Validated<'_>, report: &mut ReconcileReport) {
        let mut doomed_containers: HashSet<String> = self
            .index
            .containers()
            .filter(|c| !snapshot.declares_container(&c.path))
            .map(|c| c.path.clone())
            .collect();
        let mut doomed_leaves: HashSet<i64> = self
            .index
            .leaves()
            .filter(|l| !snapshot.declares_leaf(l.id))
            .map(|l| l.id)
            .collect();
        for path in doomed_containers.clone() {
            for key in self.index.descendants(&path) {
                match key {
                    NodeKey::Container(child) => {
                        doomed_containers.insert(child);
                    }
                    NodeKey::Leaf(id) => {
                        doomed_leaves.insert(id);
                    }
                }
            }
        }

        let mut leaves: Vec<i64> = doomed_leaves.into_iter().collect();
        leaves.sort_unstable();
        for id in leaves {
            let Some(leaf) = self.index.remove_leaf(id) else {
                continue;
            };
            self.space.unregister_node(&leaf.key());
            if !doomed_containers.contains(&leaf.parent_path) {
                self.space
                    .notify_changed(&NodeKey::Container(leaf.parent_path.clone()));
            }
            info!("[reconcile] leaf {} removed from '{}'", id, leaf.parent_path);
            report.leaves_removed += 1;
        }

        let mut containers: Vec<(usize, String)> = doomed_containers
            .iter()
            .map(|path| (self.index.depth(path), path.clone()))
            .collect();
        containers.sort_by(|a, b| b.cmp(a));
        for (_, path) in containers {
            match self.remove_container(&path, &doomed_containers) {
                Ok(true) => report.containers_removed += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!("[reconcile] container '{path}' not removed: {err}");
                    report.skipped.push(err);
                }
            }
        }
    }

    fn remove_container(&mut self, path: &str, doomed: &HashSet<String>) -> Result<bool> {
        let is_root = match self.index.lookup_container(path) {
            None => return Ok(false),
            Some(container) => {
                if container.is_root() {
                    self.space.detach_root(container);
                }
                container.is_root()
            }
        };
        let Some(removed) = self.index.remove_container(path)? else {
            return Ok(false);
        };
        self.space.unregister_node(&removed.key());
        if let Some(parent) = removed.parent.as_ref().filter(|p| !doomed.contains(*p)) {
            self.space
                .notify_changed(&NodeKey::Container(parent.clone()));
        }
        if is_root {
            info!("[reconcile] root '{path}' removed");
        } else {
            info!("[reconcile] container '{path}' removed");
        }
        Ok(true)
    }

    /// Create a missing container, first creating any missing ancestors the
    /// snapshot declares.
    fn materialize_container(
        &mut self,
        entity: &Entity,
        snapshot: &Validated<'_>,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        if self.index.lookup_container(&entity.path).is_some() {
            return Ok(());
        }
        self.materialize_parent(entity, snapshot, report)?;
        if self.builder().create_container(entity)? {
            report.containers_created += 1;
        }
        Ok(())
    }

    fn materialize_parent(
        &mut self,
        entity: &Entity,
        snapshot: &Validated<'_>,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        if self.index.lookup_container(&entity.parent_path).is_some() {
            return Ok(());
        }
        match snapshot.entity(&entity.parent_path) {
            Some(parent) if parent.is_root() => Err(MirrorError::structural(
                &entity.path,
                format!("root '{}' is not live", parent.path),
            )),
            Some(parent) => self.materialize_container(parent, snapshot, report),
            None => Err(MirrorError::structural(
                &entity.path,
                format!("parent '{}' is unknown", entity.parent_path),
            )),
        }
    }

    fn promote_to_root(&mut self, path: &str) -> Result<()> {
        let old_parent = self
            .index
            .lookup_container(path)
            .and_then(|c| c.parent.clone());
        self.index.relink_container(path, None)?;
        if let Some(root) = self.index.lookup_container(path) {
            self.space.register_root(root);
        }
        self.space.notify_changed(&NodeKey::Container(path.to_owned()));
        if let Some(old_parent) = old_parent {
            self.space.notify_changed(&NodeKey::Container(old_parent));
        }
        debug!("[reconcile] container '{path}' promoted to root");
        Ok(())
    }

    fn move_container(&mut self, path: &str, new_parent: &str) -> Result<()> {
        let (was_root, old_parent) = match self.index.lookup_container(path) {
            Some(container) => (container.is_root(), container.parent.clone()),
            None => return Err(MirrorError::NotFound(format!("container '{path}'"))),
        };
        self.index.relink_container(path, Some(new_parent))?;
        if was_root {
            if let Some(container) = self.index.lookup_container(path) {
                self.space.detach_root(container);
            }
        }
        self.space.notify_changed(&NodeKey::Container(path.to_owned()));
        if let Some(old_parent) = old_parent {
            self.space.notify_changed(&NodeKey::Container(old_parent));
        }
        self.space
            .notify_changed(&NodeKey::Container(new_parent.to_owned()));
        debug!("[reconcile] container '{path}' moved under '{new_parent}'");
        Ok(())
    }

    fn rename_container(&mut self, entity: &Entity) -> bool {
        let Some(container) = self.index.container_mut(&entity.path) else {
            return false;
        };
        container.kind = entity.kind;
        if container.name == entity.name {
            return false;
        }
        debug!(
            "[reconcile] container '{}' renamed '{}' -> '{}'",
            entity.path, container.name, entity.name
        );
        container.name = entity.name.clone();
        self.space
            .notify_changed(&NodeKey::Container(entity.path.clone()));
        true
    }
}
