//! Schema definitions and row validation.
//!
//! A [`TableSchema`] names every field of a dataset and designates the
//! identifier field (integer, non-nullable), the last-edited field
//! (timestamp, non-nullable), and optionally a geometry field (point).
//! Schemas are self-validating: construction and every load from disk go
//! through [`TableSchema::validate`], so downstream code can rely on the
//! designated fields existing with the right types.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::dataset::row::Row;

/// Field types storable in a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Float,
    /// UTF-8 string.
    Text,
    /// UTC timestamp.
    Timestamp,
    /// Planar point geometry.
    Point,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Bool => "bool",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Text => "text",
            FieldType::Timestamp => "timestamp",
            FieldType::Point => "point",
        };
        write!(f, "{name}")
    }
}

/// A single field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name as stored in the dataset.
    pub name: String,
    /// Field type.
    pub field_type: FieldType,
    /// Whether the field accepts null values.
    pub nullable: bool,
}

impl fmt::Display for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?: {}", self.name, self.field_type)
        } else {
            write!(f, "{}: {}", self.name, self.field_type)
        }
    }
}

/// Errors raised by schema validation and row-vs-schema checks.
#[derive(Debug, Snafu)]
pub enum SchemaError {
    /// Two fields share a name.
    #[snafu(display("Duplicate field {field} in schema"))]
    DuplicateField {
        /// The duplicated field name.
        field: String,
    },

    /// The designated identifier field is not in the field list.
    #[snafu(display("Identifier field {field} is not defined in the schema"))]
    MissingIdField {
        /// The missing identifier field name.
        field: String,
    },

    /// The identifier field exists but is not a non-nullable integer.
    #[snafu(display("Identifier field {field} must be a non-nullable integer"))]
    IdFieldType {
        /// The identifier field name.
        field: String,
    },

    /// The designated last-edited field is not in the field list.
    #[snafu(display("Last-edited field {field} is not defined in the schema"))]
    MissingEditedField {
        /// The missing last-edited field name.
        field: String,
    },

    /// The last-edited field exists but is not a non-nullable timestamp.
    #[snafu(display("Last-edited field {field} must be a non-nullable timestamp"))]
    EditedFieldType {
        /// The last-edited field name.
        field: String,
    },

    /// The designated geometry field is not in the field list.
    #[snafu(display("Geometry field {field} is not defined in the schema"))]
    MissingGeometryField {
        /// The missing geometry field name.
        field: String,
    },

    /// The geometry field exists but is not a point field.
    #[snafu(display("Geometry field {field} must have type point"))]
    GeometryFieldType {
        /// The geometry field name.
        field: String,
    },

    /// A row carries a value for a field the schema does not know, or for
    /// one of the designated identifier/last-edited fields (those live in
    /// their own row slots).
    #[snafu(display("Row {id} carries unknown field {field}"))]
    UnknownField {
        /// The offending row id.
        id: i64,
        /// The unknown field name.
        field: String,
    },

    /// A non-nullable payload field is absent or null in a row.
    #[snafu(display("Row {id} is missing a value for non-nullable field {field}"))]
    MissingValue {
        /// The offending row id.
        id: i64,
        /// The field lacking a value.
        field: String,
    },

    /// A row value does not match the declared field type.
    #[snafu(display("Row {id} field {field} has type {found}, expected {expected}"))]
    ValueTypeMismatch {
        /// The offending row id.
        id: i64,
        /// The field with the mismatched value.
        field: String,
        /// Declared type in the schema.
        expected: FieldType,
        /// Actual type of the row value.
        found: FieldType,
    },
}

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema of a dataset: field list plus designated special fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    fields: Vec<FieldDef>,
    id_field: String,
    edited_field: String,
    geometry_field: Option<String>,
}

impl TableSchema {
    /// Build a schema, validating the field list and the designated fields.
    pub fn new(
        fields: Vec<FieldDef>,
        id_field: impl Into<String>,
        edited_field: impl Into<String>,
        geometry_field: Option<String>,
    ) -> SchemaResult<Self> {
        let schema = Self {
            fields,
            id_field: id_field.into(),
            edited_field: edited_field.into(),
            geometry_field,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Re-check all schema invariants.
    ///
    /// Called by `new` and again whenever a schema is deserialized from
    /// disk, since serde bypasses the constructor.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut seen: HashMap<&str, &FieldDef> = HashMap::new();
        for field in &self.fields {
            if seen.insert(field.name.as_str(), field).is_some() {
                return DuplicateFieldSnafu {
                    field: field.name.clone(),
                }
                .fail();
            }
        }

        match seen.get(self.id_field.as_str()) {
            None => {
                return MissingIdFieldSnafu {
                    field: self.id_field.clone(),
                }
                .fail();
            }
            Some(def) if def.field_type != FieldType::Integer || def.nullable => {
                return IdFieldTypeSnafu {
                    field: self.id_field.clone(),
                }
                .fail();
            }
            Some(_) => {}
        }

        match seen.get(self.edited_field.as_str()) {
            None => {
                return MissingEditedFieldSnafu {
                    field: self.edited_field.clone(),
                }
                .fail();
            }
            Some(def) if def.field_type != FieldType::Timestamp || def.nullable => {
                return EditedFieldTypeSnafu {
                    field: self.edited_field.clone(),
                }
                .fail();
            }
            Some(_) => {}
        }

        if let Some(geometry) = &self.geometry_field {
            match seen.get(geometry.as_str()) {
                None => {
                    return MissingGeometryFieldSnafu {
                        field: geometry.clone(),
                    }
                    .fail();
                }
                Some(def) if def.field_type != FieldType::Point => {
                    return GeometryFieldTypeSnafu {
                        field: geometry.clone(),
                    }
                    .fail();
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// All field definitions, in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Name of the identifier field.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Name of the last-edited timestamp field.
    pub fn edited_field(&self) -> &str {
        &self.edited_field
    }

    /// Name of the geometry field, if this dataset is spatial.
    pub fn geometry_field(&self) -> Option<&str> {
        self.geometry_field.as_deref()
    }

    /// Payload field definitions: everything except the identifier and
    /// last-edited fields (geometry included).
    pub fn payload_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(|f| f.name != self.id_field && f.name != self.edited_field)
    }

    /// Check a row's payload against this schema.
    ///
    /// - Every payload value must belong to a known payload field.
    /// - Non-nullable payload fields must be present and non-null.
    /// - Value types must match the declared field types.
    pub fn validate_row(&self, row: &Row) -> SchemaResult<()> {
        for name in row.values.keys() {
            let known = self
                .payload_fields()
                .any(|f| f.name.as_str() == name.as_str());
            if !known {
                return UnknownFieldSnafu {
                    id: row.id.0,
                    field: name.clone(),
                }
                .fail();
            }
        }

        for def in self.payload_fields() {
            match row.values.get(&def.name) {
                None => {
                    if !def.nullable {
                        return MissingValueSnafu {
                            id: row.id.0,
                            field: def.name.clone(),
                        }
                        .fail();
                    }
                }
                Some(value) => match value.field_type() {
                    None => {
                        if !def.nullable {
                            return MissingValueSnafu {
                                id: row.id.0,
                                field: def.name.clone(),
                            }
                            .fail();
                        }
                    }
                    Some(found) => {
                        if found != def.field_type {
                            return ValueTypeMismatchSnafu {
                                id: row.id.0,
                                field: def.name.clone(),
                                expected: def.field_type,
                                found,
                            }
                            .fail();
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
