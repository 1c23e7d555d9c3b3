// CLASSIFICATION: COMMUNITY
// Filename: gate.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Type and rank validation for inbound value writes.

use crate::error::{MirrorError, Result};
use crate::index::Leaf;
use crate::value::{DataType, ValueRank, Variant};

/// Largest integer magnitude an `f64` represents exactly.
const F64_EXACT: u64 = 1 << 53;
/// Largest integer magnitude an `f32` represents exactly.
const F32_EXACT: u64 = 1 << 24;

/// Checks proposed values against a leaf's declared type and rank.
///
/// The gate never mutates the leaf; committing an accepted value is up to
/// the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteGate;

impl WriteGate {
    pub fn new() -> Self {
        Self
    }

    /// Validate `proposed` for `leaf`, returning the value coerced to the
    /// declared type.
    pub fn validate_write(&self, leaf: &Leaf, proposed: Variant) -> Result<Variant> {
        let mismatch = || MirrorError::TypeMismatch {
            expected: format!("{} {}", leaf.data_type, leaf.value_rank),
            found: proposed.shape(),
        };
        let accepted = match leaf.value_rank {
            ValueRank::Scalar => coerce_scalar(leaf.data_type, &proposed),
            ValueRank::OneDimension => coerce_vector(leaf.data_type, &proposed),
            ValueRank::TwoDimensions => coerce_matrix(leaf.data_type, &proposed),
        };
        accepted.ok_or_else(mismatch)
    }
}

fn coerce_vector(target: DataType, value: &Variant) -> Option<Variant> {
    let Variant::Array(items) = value else {
        return None;
    };
    items
        .iter()
        .map(|item| coerce_scalar(target, item))
        .collect::<Option<Vec<_>>>()
        .map(Variant::Array)
}

fn coerce_matrix(target: DataType, value: &Variant) -> Option<Variant> {
    let Variant::Array(rows) = value else {
        return None;
    };
    let width = match rows.first() {
        Some(Variant::Array(first)) => first.len(),
        Some(_) => return None,
        None => return Some(Variant::Array(Vec::new())),
    };
    rows.iter()
        .map(|row| match row {
            Variant::Array(cells) if cells.len() == width => coerce_vector(target, row),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(Variant::Array)
}

/// Convert a scalar to `target` when no information is lost.
fn coerce_scalar(target: DataType, value: &Variant) -> Option<Variant> {
    match (target, value) {
        (_, Variant::Array(_)) => None,
        (DataType::Boolean, Variant::Boolean(v)) => Some(Variant::Boolean(*v)),
        (DataType::String, Variant::String(v)) => Some(Variant::String(v.clone())),
        (DataType::Double, v) => to_f64(v).map(Variant::Double),
        (DataType::Float, v) => to_f32(v).map(Variant::Float),
        (DataType::Int64, v) => integer(v).map(Variant::Int64),
        (DataType::Int32, v) => integer(v)
            .and_then(|n| i32::try_from(n).ok())
            .map(Variant::Int32),
        (DataType::UInt32, v) => integer(v)
            .and_then(|n| u32::try_from(n).ok())
            .map(Variant::UInt32),
        (DataType::Boolean | DataType::String, _) => None,
    }
}

fn integer(value: &Variant) -> Option<i64> {
    match value {
        Variant::Int32(v) => Some(i64::from(*v)),
        Variant::Int64(v) => Some(*v),
        Variant::UInt32(v) => Some(i64::from(*v)),
        _ => None,
    }
}

fn to_f64(value: &Variant) -> Option<f64> {
    match value {
        Variant::Double(v) => Some(*v),
        Variant::Float(v) => Some(f64::from(*v)),
        other => integer(other)
            .filter(|n| n.unsigned_abs() <= F64_EXACT)
            .map(|n| n as f64),
    }
}

fn to_f32(value: &Variant) -> Option<f32> {
    match value {
        Variant::Float(v) => Some(*v),
        Variant::Double(v) => {
            let narrowed = *v as f32;
            (f64::from(narrowed) == *v || v.is_nan()).then_some(narrowed)
        }
        other => integer(other)
            .filter(|n| n.unsigned_abs() <= F32_EXACT)
            .map(|n| n as f32),
    }
}
