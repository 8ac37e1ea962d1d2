//! Common types used across InsightFlow
//!
//! Uploaded datasets are schemaless: every cell is a dynamically typed scalar and a row is an
//! ordered map from column name to that scalar. The declared column type is inferred once at upload
//! time and is never trusted by consumers without checking the actual cell value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

/// Largest integer magnitude an `f64` represents exactly
pub(crate) const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// One dataset row keyed by column name, in source column order
pub type Row = IndexMap<String, ScalarValue>;

/// A single dynamically typed cell value
///
/// Serialized as a plain JSON scalar. Integers are kept apart from floats so that values round-trip
/// without gaining a fractional part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// Whether the cell holds a numeric value (a NaN float still counts as numeric)
    pub fn is_number(&self) -> bool {
        matches!(self, ScalarValue::Int(_) | ScalarValue::Float(_))
    }

    /// Numeric value as `f64`, `None` for non-numeric cells
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScalarValue::Int(v) => Some(*v as f64),
            ScalarValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Column type implied by this value
    pub fn column_type(&self) -> ColumnType {
        match self {
            ScalarValue::Int(_) | ScalarValue::Float(_) => ColumnType::Number,
            ScalarValue::Text(_) => ColumnType::String,
            ScalarValue::Bool(_) => ColumnType::Boolean,
            ScalarValue::Null => ColumnType::Unknown,
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

/// Declared (inferred) type of a dataset column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    String,
    Boolean,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Number => write!(f, "number"),
            ColumnType::String => write!(f, "string"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Column metadata: name plus declared type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Number)
    }
}

/// Serialize an `f64` the way the dashboard expects numbers: integral values as JSON integers,
/// everything else as floats.
///
/// Use with `#[serde(serialize_with = "insightflow_common::types::serialize_number")]`.
pub fn serialize_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}
