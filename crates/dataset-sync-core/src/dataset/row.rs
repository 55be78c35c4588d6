//! Row identifiers, field values, and the row payload type.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::schema::FieldType;

/// Stable integer key uniquely identifying a row within a dataset.
///
/// Using a newtype makes it harder to mix row identifiers up with other
/// integer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub i64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RowId {
    fn from(raw: i64) -> Self {
        RowId(raw)
    }
}

/// A single field value carried by a row.
///
/// `Point` covers the x/y geometry payloads of spatial datasets; everything
/// else is the usual scalar menu. `Null` is only valid for nullable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent value (nullable fields only).
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    Text(String),
    /// UTC timestamp, stored as RFC3339.
    Timestamp(DateTime<Utc>),
    /// Planar point geometry.
    Point {
        /// X coordinate (easting/longitude).
        x: f64,
        /// Y coordinate (northing/latitude).
        y: f64,
    },
}

impl FieldValue {
    /// The field type this value inhabits, or `None` for `Null`.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(_) => Some(FieldType::Bool),
            FieldValue::Int(_) => Some(FieldType::Integer),
            FieldValue::Float(_) => Some(FieldType::Float),
            FieldValue::Text(_) => Some(FieldType::Text),
            FieldValue::Timestamp(_) => Some(FieldType::Timestamp),
            FieldValue::Point { .. } => Some(FieldType::Point),
        }
    }

    /// Whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// One dataset row: identifier, last-edited timestamp, and named payload
/// values.
///
/// The identifier and last-edited fields are carried in their own slots
/// rather than in `values`; the payload map holds everything else the schema
/// names, geometry included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row identifier, unique within the dataset.
    pub id: RowId,
    /// When this row was last edited. Drives update detection.
    pub edited_at: DateTime<Utc>,
    /// Named payload values, keyed by field name.
    pub values: BTreeMap<String, FieldValue>,
}

impl Row {
    /// Create a row with an empty payload.
    pub fn new(id: impl Into<RowId>, edited_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            edited_at,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style helper to attach a payload value.
    pub fn with_value(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }
}
