// CLASSIFICATION: COMMUNITY
// Filename: space.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Boundary towards the protocol layer that publishes the tree.
//!
//! The mirror never talks to sessions or transports. It tells an
//! [`AddressSpace`] which nodes appeared, disappeared or changed, and the
//! protocol layer decides how to surface that to its clients.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};

use crate::index::{Container, Leaf, NodeKey};

/// Registration and change-notification primitives supplied by the
/// protocol layer.
pub trait AddressSpace: Send {
    /// A root container now exists and is an event-notification source.
    fn register_root(&mut self, root: &Container);
    /// A container now exists below `parent`.
    fn register_container(&mut self, container: &Container, parent: &Container);
    /// A leaf now exists below `parent`.
    fn register_leaf(&mut self, leaf: &Leaf, parent: &Container);
    /// Stop routing event subscriptions through a root that is going away.
    fn detach_root(&mut self, root: &Container);
    /// A node no longer exists.
    fn unregister_node(&mut self, node: &NodeKey);
    /// Cached attributes of `node` (name, value, children) are stale.
    fn notify_changed(&mut self, node: &NodeKey);
}

/// One boundary call, as captured by [`RecordingSpace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceEvent {
    RegisterRoot { path: String },
    RegisterContainer { path: String, parent: String },
    RegisterLeaf { id: i64, parent: String },
    DetachRoot { path: String },
    Unregister(NodeKey),
    Changed(NodeKey),
}

impl SpaceEvent {
    /// Whether the event alters the set of live nodes.
    pub fn is_structural(&self) -> bool {
        !matches!(self, SpaceEvent::Changed(_))
    }
}

/// Address space that records every call in order.
///
/// Clones share the same log, so a test can keep one handle while the
/// mirror owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpace {
    events: Arc<Mutex<Vec<SpaceEvent>>>,
}

impl RecordingSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far.
    pub fn events(&self) -> Vec<SpaceEvent> {
        self.guard().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<SpaceEvent> {
        std::mem::take(&mut *self.guard())
    }

    fn guard(&self) -> MutexGuard<'_, Vec<SpaceEvent>> {
        // A panicking test thread must not hide the events it recorded.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, event: SpaceEvent) {
        self.guard().push(event);
    }
}

impl AddressSpace for RecordingSpace {
    fn register_root(&mut self, root: &Container) {
        self.push(SpaceEvent::RegisterRoot {
            path: root.path.clone(),
        });
    }

    fn register_container(&mut self, container: &Container, parent: &Container) {
        self.push(SpaceEvent::RegisterContainer {
            path: container.path.clone(),
            parent: parent.path.clone(),
        });
    }

    fn register_leaf(&mut self, leaf: &Leaf, parent: &Container) {
        self.push(SpaceEvent::RegisterLeaf {
            id: leaf.id,
            parent: parent.path.clone(),
        });
    }

    fn detach_root(&mut self, root: &Container) {
        self.push(SpaceEvent::DetachRoot {
            path: root.path.clone(),
        });
    }

    fn unregister_node(&mut self, node: &NodeKey) {
        self.push(SpaceEvent::Unregister(node.clone()));
    }

    fn notify_changed(&mut self, node: &NodeKey) {
        self.push(SpaceEvent::Changed(node.clone()));
    }
}

/// Address space that only logs, for running the core without a protocol
/// layer attached.
#[derive(Debug, Default)]
pub struct LoggingSpace;

impl AddressSpace for LoggingSpace {
    fn register_root(&mut self, root: &Container) {
        info!("[space] root '{}' ({}) registered", root.path, root.name);
    }

    fn register_container(&mut self, container: &Container, parent: &Container) {
        info!(
            "[space] container '{}' ({}) registered under '{}'",
            container.path, container.name, parent.path
        );
    }

    fn register_leaf(&mut self, leaf: &Leaf, parent: &Container) {
        info!(
            "[space] leaf {} '{}' registered under '{}'",
            leaf.id, leaf.name, parent.path
        );
    }

    fn detach_root(&mut self, root: &Container) {
        info!("[space] root '{}' detached from event routing", root.path);
    }

    fn unregister_node(&mut self, node: &NodeKey) {
        info!("[space] {node} unregistered");
    }

    fn notify_changed(&mut self, node: &NodeKey) {
        debug!("[space] {node} changed");
    }
}
