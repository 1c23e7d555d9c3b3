// CLASSIFICATION: COMMUNITY
// Filename: error.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Error taxonomy shared by the mirror, its reconciler and the inbound
//! read/write/history callbacks.

use thiserror::Error;

/// Errors surfaced by mirror operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MirrorError {
    /// An entity's parent chain cannot be resolved to a known root.
    #[error("structural error at '{path}': {reason}")]
    Structural {
        /// Path of the entity that was skipped.
        path: String,
        /// Why the entity could not be placed in the tree.
        reason: String,
    },
    /// A write payload does not fit the leaf's declared type or rank.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared type and rank of the target leaf.
        expected: String,
        /// Runtime shape of the rejected payload.
        found: String,
    },
    /// A history query lacks one of its time bounds.
    #[error("history operation unsupported: {0}")]
    UnsupportedQuery(String),
    /// Refreshing a single leaf value failed.
    #[error("transient update failure for leaf {id}: {reason}")]
    TransientUpdate {
        /// Identifier of the leaf that could not be refreshed.
        id: i64,
        /// Description of the underlying failure.
        reason: String,
    },
    /// No live node matches the requested identifier or path.
    #[error("node {0} not found")]
    NotFound(String),
    /// The tree lock was poisoned by a panicking holder.
    #[error("mirror lock poisoned")]
    LockPoisoned,
    /// Configuration could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(String),
    /// An entity snapshot could not be read or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),
    /// A background worker thread could not be started.
    #[error("failed to spawn worker: {0}")]
    Spawn(String),
}

impl MirrorError {
    pub(crate) fn structural(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Structural {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn transient(id: i64, reason: impl Into<String>) -> Self {
        Self::TransientUpdate {
            id,
            reason: reason.into(),
        }
    }

    /// Returns true for errors the caller should report as a rejection
    /// rather than an internal failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. } | Self::UnsupportedQuery(_))
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

/// Convenience alias for mirror results.
pub type Result<T> = std::result::Result<T, MirrorError>;
