// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Mirrors an externally owned, hierarchical entity list into a live tree
//! of containers and leaves, keeps it in step with fresh snapshots, and
//! answers the read, write and history callbacks of a protocol layer.

/// Snapshot entities and validation
pub mod entity;
/// Declared leaf types and runtime values
pub mod value;
/// Error taxonomy
pub mod error;

/// Arena of live nodes
pub mod index;
/// Boundary towards the protocol layer
pub mod space;
/// Initial construction of the tree
pub mod builder;
/// Incremental updates from fresh snapshots
pub mod reconcile;

/// Write validation
pub mod gate;
/// Time-range queries
pub mod history;
pub mod clock;

pub mod rng;
/// Snapshot and value sources
pub mod source;
pub mod schedule;
/// Periodic reconcile and value refresh
pub mod updater;

/// Locked facade over the tree
pub mod mirror;
pub mod config;

pub use crate::config::MirrorConfig;
pub use crate::entity::{Entity, EntityKind, Snapshot};
pub use crate::error::{MirrorError, Result};
pub use crate::index::{Container, Leaf, NodeKey, PathIndex};
pub use crate::mirror::{NodeMirror, NodeRef, NodeState};
pub use crate::space::{AddressSpace, LoggingSpace, RecordingSpace, SpaceEvent};
pub use crate::updater::{ReconcileTrigger, ValueUpdater};
pub use crate::value::{DataType, ValueRank, Variant};
