// CLASSIFICATION: COMMUNITY
// Filename: entity.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Flat entity snapshots and their structural validation.
//!
//! A snapshot is the externally supplied description of the namespace: one
//! record per node, each pointing at its parent by path. Before a snapshot is
//! materialised it is checked so that every accepted entity has a parent
//! chain ending at a root of the same snapshot. Entities that fail the check
//! are skipped together with everything beneath them.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};
use crate::value::{DataType, ValueRank};

/// Role an entity plays in the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[serde(alias = "scada")]
    Root,
    #[serde(alias = "channel")]
    Group,
    Device,
    #[serde(alias = "measure")]
    Point,
}

/// One record of an entity snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub path: String,
    #[serde(default)]
    pub parent_path: String,
    pub name: String,
    #[serde(default)]
    pub is_leaf: bool,
    pub kind: EntityKind,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub value_rank: ValueRank,
}

impl Entity {
    fn new(id: i64, path: &str, parent_path: &str, name: &str, kind: EntityKind) -> Self {
        Self {
            id,
            path: path.to_owned(),
            parent_path: parent_path.to_owned(),
            name: name.to_owned(),
            is_leaf: kind == EntityKind::Point,
            kind,
            data_type: DataType::default(),
            value_rank: ValueRank::default(),
        }
    }

    /// Root container with no structural parent.
    pub fn root(id: i64, path: &str, name: &str) -> Self {
        Self::new(id, path, "", name, EntityKind::Root)
    }

    /// Grouping container below `parent_path`.
    pub fn group(id: i64, path: &str, parent_path: &str, name: &str) -> Self {
        Self::new(id, path, parent_path, name, EntityKind::Group)
    }

    /// Device container below `parent_path`.
    pub fn device(id: i64, path: &str, parent_path: &str, name: &str) -> Self {
        Self::new(id, path, parent_path, name, EntityKind::Device)
    }

    /// Leaf point below `parent_path`, declared as a scalar double.
    pub fn point(id: i64, path: &str, parent_path: &str, name: &str) -> Self {
        Self::new(id, path, parent_path, name, EntityKind::Point)
    }

    /// Override the declared type and rank of a leaf entity.
    #[must_use]
    pub fn with_type(mut self, data_type: DataType, value_rank: ValueRank) -> Self {
        self.data_type = data_type;
        self.value_rank = value_rank;
        self
    }

    /// Rename the entity, keeping its path and id.
    #[must_use]
    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Whether this entity describes a root container.
    pub fn is_root(&self) -> bool {
        self.kind == EntityKind::Root && !self.is_leaf
    }
}

/// Versioned list of entities published by the configuration source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Snapshot {
    /// Wrap `entities` as a snapshot at `revision`.
    pub fn new(revision: u64, entities: Vec<Entity>) -> Self {
        Self { revision, entities }
    }

    /// Decode a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode a snapshot from TOML text (`[[entities]]` tables).
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| MirrorError::Snapshot(e.to_string()))
    }

    /// Load a snapshot file, choosing the decoder from its extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| MirrorError::Snapshot(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&text),
            _ => Self::from_json(&text),
        }
    }
}

/// Sample namespace: one root, two groups and six points.
pub fn demo_entities() -> Vec<Entity> {
    vec![
        Entity::root(1, "1", "Simulated root"),
        Entity::group(11, "11", "1", "Channel 1"),
        Entity::device(12, "12", "1", "Device 2"),
        Entity::point(111, "111", "11", "Point 1"),
        Entity::point(112, "112", "11", "Point 2"),
        Entity::point(113, "113", "11", "Point 3"),
        Entity::point(114, "114", "11", "Point 4"),
        Entity::point(121, "121", "12", "Point 1"),
        Entity::point(122, "122", "12", "Point 2"),
    ]
}

/// Outcome of checking a snapshot before it is applied.
#[derive(Debug)]
pub struct Validated<'a> {
    accepted: Vec<&'a Entity>,
    by_path: HashMap<&'a str, &'a Entity>,
    children: HashMap<&'a str, Vec<&'a Entity>>,
    declared_containers: HashSet<&'a str>,
    declared_leaves: HashSet<i64>,
    rejected: Vec<MirrorError>,
}

impl<'a> Validated<'a> {
    /// Accepted entities in snapshot order.
    pub fn accepted(&self) -> &[&'a Entity] {
        &self.accepted
    }

    /// Accepted entity declared at `path`.
    pub fn entity(&self, path: &str) -> Option<&'a Entity> {
        self.by_path.get(path).copied()
    }

    /// Accepted entities whose parent is `parent_path`, in snapshot order.
    pub fn children_of(&self, parent_path: &str) -> &[&'a Entity] {
        self.children
            .get(parent_path)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of ancestors `path` has in the snapshot; zero for roots and
    /// for paths that were not accepted.
    pub fn depth(&self, path: &str) -> usize {
        let mut depth = 0;
        let mut current = self.by_path.get(path);
        while let Some(entity) = current.filter(|e| !e.is_root()) {
            depth += 1;
            current = self.by_path.get(entity.parent_path.as_str());
        }
        depth
    }

    /// Whether any entity, accepted or not, declares a container at `path`.
    pub fn declares_container(&self, path: &str) -> bool {
        self.declared_containers.contains(path)
    }

    /// Whether any entity, accepted or not, declares a leaf with `id`.
    pub fn declares_leaf(&self, id: i64) -> bool {
        self.declared_leaves.contains(&id)
    }

    /// Structural errors for the skipped entities.
    pub fn rejected(&self) -> &[MirrorError] {
        &self.rejected
    }

    /// Consume the validation result, keeping only its errors.
    pub fn into_rejected(self) -> Vec<MirrorError> {
        self.rejected
    }
}

#[derive(Debug, Clone)]
enum Verdict {
    Valid,
    Invalid,
}

/// Check `entities` for duplicate keys, dangling or leaf parents and cycles.
pub fn validate(entities: &[Entity]) -> Validated<'_> {
    let mut rejected = Vec::new();
    let mut by_path: HashMap<&str, &Entity> = HashMap::new();
    let mut declared_containers = HashSet::new();
    let mut declared_leaves = HashSet::new();
    let mut duplicates: HashSet<usize> = HashSet::new();

    for (idx, entity) in entities.iter().enumerate() {
        if entity.is_leaf {
            if !declared_leaves.insert(entity.id) {
                rejected.push(MirrorError::structural(
                    &entity.path,
                    format!("duplicate leaf id {}", entity.id),
                ));
                duplicates.insert(idx);
                continue;
            }
        } else {
            declared_containers.insert(entity.path.as_str());
        }
        if by_path.contains_key(entity.path.as_str()) {
            rejected.push(MirrorError::structural(&entity.path, "duplicate path"));
            duplicates.insert(idx);
            continue;
        }
        by_path.insert(entity.path.as_str(), entity);
    }

    let mut verdicts: HashMap<&str, Verdict> = HashMap::new();
    for (idx, entity) in entities.iter().enumerate() {
        if duplicates.contains(&idx) {
            continue;
        }
        resolve_chain(entity, &by_path, &mut verdicts, &mut rejected);
    }

    let accepted: Vec<&Entity> = entities
        .iter()
        .enumerate()
        .filter(|(idx, _)| !duplicates.contains(idx))
        .map(|(_, entity)| entity)
        .filter(|entity| matches!(verdicts.get(entity.path.as_str()), Some(Verdict::Valid)))
        .collect();
    let by_path = accepted
        .iter()
        .map(|entity| (entity.path.as_str(), *entity))
        .collect();
    let mut children: HashMap<&str, Vec<&Entity>> = HashMap::new();
    for entity in accepted.iter().filter(|entity| !entity.is_root()) {
        children
            .entry(entity.parent_path.as_str())
            .or_default()
            .push(*entity);
    }

    Validated {
        accepted,
        by_path,
        children,
        declared_containers,
        declared_leaves,
        rejected,
    }
}

fn resolve_chain<'a>(
    entity: &'a Entity,
    by_path: &HashMap<&'a str, &'a Entity>,
    verdicts: &mut HashMap<&'a str, Verdict>,
    rejected: &mut Vec<MirrorError>,
) {
    if verdicts.contains_key(entity.path.as_str()) {
        return;
    }

    // Walk towards the root until a known verdict, a root or a fault.
    let mut chain: Vec<&'a Entity> = Vec::new();
    let mut on_chain: HashSet<&'a str> = HashSet::new();
    let mut current = entity;
    let outcome = loop {
        if let Some(verdict) = verdicts.get(current.path.as_str()) {
            break match verdict {
                Verdict::Valid => Ok(()),
                Verdict::Invalid => Err(current.path.clone()),
            };
        }
        chain.push(current);
        on_chain.insert(current.path.as_str());

        if current.kind == EntityKind::Root {
            break if current.is_leaf {
                Err(fault(rejected, current, "root cannot be a leaf"))
            } else if !current.parent_path.is_empty() {
                Err(fault(rejected, current, "root declares a parent"))
            } else {
                Ok(())
            };
        }
        if current.parent_path.is_empty() {
            break Err(fault(rejected, current, "no parent and not a root"));
        }
        if on_chain.contains(current.parent_path.as_str()) {
            let reason = format!("cycle through '{}'", current.parent_path);
            break Err(fault(rejected, current, &reason));
        }
        match by_path.get(current.parent_path.as_str()) {
            None => {
                let reason = format!("parent '{}' is not in the snapshot", current.parent_path);
                break Err(fault(rejected, current, &reason));
            }
            Some(parent) if parent.is_leaf => {
                let reason = format!("parent '{}' is a leaf", current.parent_path);
                break Err(fault(rejected, current, &reason));
            }
            Some(parent) => current = parent,
        }
    };

    match outcome {
        Ok(()) => {
            for member in chain {
                verdicts.insert(member.path.as_str(), Verdict::Valid);
            }
        }
        Err(cause) => {
            for member in chain {
                if let std::collections::hash_map::Entry::Vacant(slot) =
                    verdicts.entry(member.path.as_str())
                {
                    slot.insert(Verdict::Invalid);
                    if member.path != cause {
                        rejected.push(MirrorError::structural(
                            &member.path,
                            format!("ancestor '{cause}' was rejected"),
                        ));
                    }
                }
            }
        }
    }
}

fn fault(rejected: &mut Vec<MirrorError>, entity: &Entity, reason: &str) -> String {
    rejected.push(MirrorError::structural(&entity.path, reason));
    entity.path.clone()
}
