// CLASSIFICATION: COMMUNITY
// Filename: value.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

//! Declared leaf types and the runtime values stored in leaves.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar type a leaf declares for its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    #[serde(rename = "uint32")]
    UInt32,
    Float,
    #[default]
    Double,
    String,
}

impl DataType {
    /// Zero value of this type.
    pub fn zero(self) -> Variant {
        match self {
            DataType::Boolean => Variant::Boolean(false),
            DataType::Int32 => Variant::Int32(0),
            DataType::Int64 => Variant::Int64(0),
            DataType::UInt32 => Variant::UInt32(0),
            DataType::Float => Variant::Float(0.0),
            DataType::Double => Variant::Double(0.0),
            DataType::String => Variant::String(String::new()),
        }
    }

    /// Whether values of this type are numbers.
    pub fn is_numeric(self) -> bool {
        !matches!(self, DataType::Boolean | DataType::String)
    }

    fn name(self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt32 => "uint32",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::String => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cardinality a leaf declares for its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueRank {
    #[default]
    Scalar,
    OneDimension,
    TwoDimensions,
}

impl ValueRank {
    /// Declared array dimensions; zero means "any length".
    pub fn array_dimensions(self) -> Vec<u32> {
        match self {
            ValueRank::Scalar => Vec::new(),
            ValueRank::OneDimension => vec![0],
            ValueRank::TwoDimensions => vec![0, 0],
        }
    }

    /// Initial value for a leaf of this rank holding `data_type` elements.
    pub fn zero(self, data_type: DataType) -> Variant {
        match self {
            ValueRank::Scalar => data_type.zero(),
            ValueRank::OneDimension | ValueRank::TwoDimensions => Variant::Array(Vec::new()),
        }
    }
}

impl fmt::Display for ValueRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRank::Scalar => f.write_str("scalar"),
            ValueRank::OneDimension => f.write_str("array[1]"),
            ValueRank::TwoDimensions => f.write_str("array[2]"),
        }
    }
}

/// Runtime value carried by a leaf or a write request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Variant {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    #[serde(rename = "uint32")]
    UInt32(u32),
    Float(f32),
    Double(f64),
    String(String),
    Array(Vec<Variant>),
}

impl Variant {
    /// Scalar type of this value, `None` for arrays.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Variant::Boolean(_) => Some(DataType::Boolean),
            Variant::Int32(_) => Some(DataType::Int32),
            Variant::Int64(_) => Some(DataType::Int64),
            Variant::UInt32(_) => Some(DataType::UInt32),
            Variant::Float(_) => Some(DataType::Float),
            Variant::Double(_) => Some(DataType::Double),
            Variant::String(_) => Some(DataType::String),
            Variant::Array(_) => None,
        }
    }

    /// Numeric view of a scalar value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variant::Int32(v) => Some(f64::from(*v)),
            Variant::Int64(v) => Some(*v as f64),
            Variant::UInt32(v) => Some(f64::from(*v)),
            Variant::Float(v) => Some(f64::from(*v)),
            Variant::Double(v) => Some(*v),
            Variant::Boolean(_) | Variant::String(_) | Variant::Array(_) => None,
        }
    }

    /// Short description of the value's runtime shape, e.g. `array<double>`.
    pub fn shape(&self) -> String {
        match self {
            Variant::Array(items) => match items.first() {
                Some(first) => format!("array<{}>", first.shape()),
                None => "array<>".to_owned(),
            },
            scalar => scalar
                .data_type()
                .map(|ty| ty.to_string())
                .unwrap_or_default(),
        }
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Variant::Double(value)
    }
}

impl From<i32> for Variant {
    fn from(value: i32) -> Self {
        Variant::Int32(value)
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Boolean(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_owned())
    }
}
