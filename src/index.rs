// CLASSIFICATION: COMMUNITY
// Filename: index.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Arena of live containers and leaves.
//!
//! Containers are keyed by path and leaves by id. Parent and child links are
//! stored as keys into the same arena, so navigation works in both directions
//! without reference cycles. The index keeps the links consistent: a node can
//! only be inserted below a live container, and a container can only be
//! removed once it has no children left.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::{Entity, EntityKind};
use crate::error::{MirrorError, Result};
use crate::value::{DataType, ValueRank, Variant};

/// Stable key addressing a node in the arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "lowercase")]
pub enum NodeKey {
    Container(String),
    Leaf(i64),
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Container(path) => write!(f, "container '{path}'"),
            NodeKey::Leaf(id) => write!(f, "leaf {id}"),
        }
    }
}

/// Non-leaf node of the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Container {
    pub path: String,
    pub name: String,
    pub kind: EntityKind,
    /// Owning container, `None` for roots.
    pub parent: Option<String>,
    pub children: BTreeSet<NodeKey>,
}

impl Container {
    /// Fresh container for `entity`, not yet linked to any parent.
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            path: entity.path.clone(),
            name: entity.name.clone(),
            kind: entity.kind,
            parent: (!entity.is_root()).then(|| entity.parent_path.clone()),
            children: BTreeSet::new(),
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::Container(self.path.clone())
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Terminal node carrying a live value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaf {
    pub id: i64,
    pub path: String,
    pub name: String,
    pub parent_path: String,
    pub data_type: DataType,
    pub value_rank: ValueRank,
    pub value: Variant,
    pub timestamp: DateTime<Utc>,
}

impl Leaf {
    /// Fresh leaf for `entity` holding the zero value of its declared type.
    pub fn from_entity(entity: &Entity, now: DateTime<Utc>) -> Self {
        Self {
            id: entity.id,
            path: entity.path.clone(),
            name: entity.name.clone(),
            parent_path: entity.parent_path.clone(),
            data_type: entity.data_type,
            value_rank: entity.value_rank,
            value: entity.value_rank.zero(entity.data_type),
            timestamp: now,
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::Leaf(self.id)
    }
}

/// Bidirectional lookup from container paths and leaf ids to live nodes.
#[derive(Debug, Default)]
pub struct PathIndex {
    containers: HashMap<String, Container>,
    leaves: HashMap<i64, Leaf>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_container(&self, path: &str) -> Option<&Container> {
        self.containers.get(path)
    }

    pub fn lookup_leaf(&self, id: i64) -> Option<&Leaf> {
        self.leaves.get(&id)
    }

    pub(crate) fn container_mut(&mut self, path: &str) -> Option<&mut Container> {
        self.containers.get_mut(path)
    }

    pub(crate) fn leaf_mut(&mut self, id: i64) -> Option<&mut Leaf> {
        self.leaves.get_mut(&id)
    }

    /// Linear scan for a leaf by its display path.
    pub fn find_leaf_by_path(&self, path: &str) -> Option<&Leaf> {
        self.leaves.values().find(|leaf| leaf.path == path)
    }

    /// Insert `container` and link it below its parent.
    pub fn insert_container(&mut self, container: Container) -> Result<()> {
        if self.containers.contains_key(&container.path) {
            return Err(MirrorError::structural(
                &container.path,
                "container already indexed",
            ));
        }
        if let Some(parent) = &container.parent {
            let parent = self.containers.get_mut(parent).ok_or_else(|| {
                MirrorError::structural(
                    &container.path,
                    format!("parent container '{parent}' is not live"),
                )
            })?;
            parent.children.insert(container.key());
        }
        self.containers.insert(container.path.clone(), container);
        Ok(())
    }

    /// Insert `leaf` and link it below its parent container.
    pub fn insert_leaf(&mut self, leaf: Leaf) -> Result<()> {
        if self.leaves.contains_key(&leaf.id) {
            return Err(MirrorError::structural(
                &leaf.path,
                format!("leaf {} already indexed", leaf.id),
            ));
        }
        let parent = self.containers.get_mut(&leaf.parent_path).ok_or_else(|| {
            MirrorError::structural(
                &leaf.path,
                format!("parent container '{}' is not live", leaf.parent_path),
            )
        })?;
        parent.children.insert(leaf.key());
        self.leaves.insert(leaf.id, leaf);
        Ok(())
    }

    /// Remove a container that has no children left.
    pub fn remove_container(&mut self, path: &str) -> Result<Option<Container>> {
        match self.containers.get(path) {
            None => return Ok(None),
            Some(container) if !container.children.is_empty() => {
                return Err(MirrorError::structural(
                    path,
                    format!("container still has {} children", container.children.len()),
                ));
            }
            Some(_) => {}
        }
        let removed = self.containers.remove(path);
        if let Some(container) = &removed {
            self.unlink(container.parent.as_deref(), &container.key());
        }
        Ok(removed)
    }

    /// Remove a leaf and unlink it from its parent.
    pub fn remove_leaf(&mut self, id: i64) -> Option<Leaf> {
        let removed = self.leaves.remove(&id)?;
        self.unlink(Some(&removed.parent_path), &removed.key());
        Some(removed)
    }

    /// Re-attach a leaf below `new_parent`.
    pub fn relink_leaf(&mut self, id: i64, new_parent: &str) -> Result<()> {
        if !self.containers.contains_key(new_parent) {
            return Err(MirrorError::structural(
                new_parent,
                format!("cannot move leaf {id} below a missing container"),
            ));
        }
        let leaf = self
            .leaves
            .get_mut(&id)
            .ok_or_else(|| MirrorError::NotFound(format!("leaf {id}")))?;
        let old_parent = std::mem::replace(&mut leaf.parent_path, new_parent.to_owned());
        let key = NodeKey::Leaf(id);
        self.unlink(Some(&old_parent), &key);
        if let Some(parent) = self.containers.get_mut(new_parent) {
            parent.children.insert(key);
        }
        Ok(())
    }

    /// Re-attach a container below `new_parent`, or make it a root.
    pub fn relink_container(&mut self, path: &str, new_parent: Option<&str>) -> Result<()> {
        if let Some(target) = new_parent {
            if !self.containers.contains_key(target) {
                return Err(MirrorError::structural(
                    path,
                    format!("cannot move below missing container '{target}'"),
                ));
            }
            if target == path || self.is_ancestor(path, target) {
                return Err(MirrorError::structural(
                    path,
                    format!("moving below '{target}' would create a cycle"),
                ));
            }
        }
        let container = self
            .containers
            .get_mut(path)
            .ok_or_else(|| MirrorError::NotFound(format!("container '{path}'")))?;
        let old_parent = std::mem::replace(&mut container.parent, new_parent.map(str::to_owned));
        let key = container.key();
        self.unlink(old_parent.as_deref(), &key);
        if let Some(parent) = new_parent.and_then(|p| self.containers.get_mut(p)) {
            parent.children.insert(key);
        }
        Ok(())
    }

    /// Whether `ancestor` lies on the parent chain of container `path`.
    pub fn is_ancestor(&self, ancestor: &str, path: &str) -> bool {
        let mut current = self.containers.get(path).and_then(|c| c.parent.as_deref());
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.containers.get(parent).and_then(|c| c.parent.as_deref());
        }
        false
    }

    /// Every node below `path`, children listed before their parents.
    pub fn descendants(&self, path: &str) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.collect_descendants(path, &mut out);
        out
    }

    fn collect_descendants(&self, path: &str, out: &mut Vec<NodeKey>) {
        let Some(container) = self.containers.get(path) else {
            return;
        };
        for child in &container.children {
            if let NodeKey::Container(child_path) = child {
                self.collect_descendants(child_path, out);
            }
            out.push(child.clone());
        }
    }

    /// Number of ancestors above container `path`.
    pub fn depth(&self, path: &str) -> usize {
        let mut depth = 0;
        let mut current = self.containers.get(path).and_then(|c| c.parent.as_deref());
        while let Some(parent) = current {
            depth += 1;
            current = self.containers.get(parent).and_then(|c| c.parent.as_deref());
        }
        depth
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.leaves.values()
    }

    /// Root containers, sorted by path.
    pub fn roots(&self) -> Vec<&Container> {
        let mut roots: Vec<&Container> =
            self.containers.values().filter(|c| c.is_root()).collect();
        roots.sort_by(|a, b| a.path.cmp(&b.path));
        roots
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.leaves.is_empty()
    }

    fn unlink(&mut self, parent: Option<&str>, key: &NodeKey) {
        if let Some(parent) = parent.and_then(|p| self.containers.get_mut(p)) {
            parent.children.remove(key);
        }
    }
}
