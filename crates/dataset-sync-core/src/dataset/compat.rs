//! Source/target schema compatibility for synchronization.
//!
//! Rule: **no payload divergence**. A target can only be synchronized from a
//! source whose payload field set matches exactly:
//! - same payload field names (order-insensitive, case-sensitive)
//! - same field type per name
//! - same `nullable` flag
//! - both sides designate the same geometry field, or neither does.
//!
//! The identifier and last-edited fields are exempt: each side may name them
//! differently, since they travel in dedicated row slots rather than in the
//! payload.

use std::collections::HashMap;

use snafu::prelude::*;

use crate::dataset::schema::{FieldDef, FieldType, TableSchema};

/// Errors raised when a source schema cannot drive a target.
#[derive(Debug, Snafu)]
pub enum CompatError {
    /// The target lacks a payload field the source carries.
    #[snafu(display("Target schema is missing payload field {field}"))]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// The target carries a payload field the source does not.
    #[snafu(display("Target schema has extra payload field {field} not present in source"))]
    ExtraField {
        /// The extra field name.
        field: String,
    },

    /// A payload field exists on both sides with different types.
    #[snafu(display(
        "Type mismatch for payload field {field}: source has {source_type}, target has {target_type}"
    ))]
    TypeMismatch {
        /// The mismatched field name.
        field: String,
        /// Type on the source side.
        source_type: FieldType,
        /// Type on the target side.
        target_type: FieldType,
    },

    /// A payload field exists on both sides with different nullability.
    #[snafu(display("Nullability mismatch for payload field {field}"))]
    NullabilityMismatch {
        /// The mismatched field name.
        field: String,
    },

    /// The two sides disagree on which field carries geometry.
    #[snafu(display(
        "Geometry designation mismatch: source has {source_geometry:?}, target has {target_geometry:?}"
    ))]
    GeometryMismatch {
        /// Geometry field named by the source, if any.
        source_geometry: Option<String>,
        /// Geometry field named by the target, if any.
        target_geometry: Option<String>,
    },
}

/// Result alias for compatibility checks.
pub type CompatResult<T> = Result<T, CompatError>;

fn payload_by_name(schema: &TableSchema) -> HashMap<&str, &FieldDef> {
    schema
        .payload_fields()
        .map(|f| (f.name.as_str(), f))
        .collect()
}

/// Enforce the no-payload-divergence rule between a source and a target.
///
/// Checks missing fields and type/nullability mismatches in one pass over
/// the source payload, then sweeps the target for extra fields, then
/// compares the geometry designations. Name-based and case-sensitive, like
/// the rest of the schema layer.
pub fn ensure_sync_compatible(source: &TableSchema, target: &TableSchema) -> CompatResult<()> {
    let source_fields = payload_by_name(source);
    let target_fields = payload_by_name(target);

    // 1) Missing fields and per-field mismatches in one pass.
    for (name, sfield) in &source_fields {
        match target_fields.get(name) {
            None => {
                return MissingFieldSnafu {
                    field: (*name).to_string(),
                }
                .fail();
            }
            Some(tfield) => {
                if sfield.field_type != tfield.field_type {
                    return TypeMismatchSnafu {
                        field: (*name).to_string(),
                        source_type: sfield.field_type,
                        target_type: tfield.field_type,
                    }
                    .fail();
                }
                if sfield.nullable != tfield.nullable {
                    return NullabilityMismatchSnafu {
                        field: (*name).to_string(),
                    }
                    .fail();
                }
            }
        }
    }

    // 2) Extra fields on the target.
    for name in target_fields.keys() {
        if !source_fields.contains_key(name) {
            return ExtraFieldSnafu {
                field: (*name).to_string(),
            }
            .fail();
        }
    }

    // 3) Geometry designations must agree.
    if source.geometry_field() != target.geometry_field() {
        return GeometryMismatchSnafu {
            source_geometry: source.geometry_field().map(str::to_string),
            target_geometry: target.geometry_field().map(str::to_string),
        }
        .fail();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, field_type: FieldType, nullable: bool) -> FieldDef {
        FieldDef {
            name: name.to_string(),
            field_type,
            nullable,
        }
    }

    fn schema(
        id_field: &str,
        payload: Vec<(&str, FieldType, bool)>,
        geometry: Option<&str>,
    ) -> TableSchema {
        let mut fields = vec![
            field(id_field, FieldType::Integer, false),
            field("edited_at", FieldType::Timestamp, false),
        ];
        fields.extend(
            payload
                .into_iter()
                .map(|(name, field_type, nullable)| field(name, field_type, nullable)),
        );
        TableSchema::new(
            fields,
            id_field,
            "edited_at",
            geometry.map(str::to_string),
        )
        .expect("valid schema")
    }

    #[test]
    fn matching_payloads_are_compatible() {
        let source = schema("oid", vec![("name", FieldType::Text, false)], None);
        let target = schema("oid", vec![("name", FieldType::Text, false)], None);
        ensure_sync_compatible(&source, &target).expect("schemas should be compatible");
    }

    #[test]
    fn id_field_names_may_differ() {
        let source = schema("oid", vec![("name", FieldType::Text, false)], None);
        let target = schema("objectid", vec![("name", FieldType::Text, false)], None);
        ensure_sync_compatible(&source, &target).expect("id field names are exempt");
    }

    #[test]
    fn missing_field_errors() {
        let source = schema(
            "oid",
            vec![
                ("name", FieldType::Text, false),
                ("value", FieldType::Float, false),
            ],
            None,
        );
        let target = schema("oid", vec![("name", FieldType::Text, false)], None);
        let err = ensure_sync_compatible(&source, &target).unwrap_err();
        assert!(matches!(err, CompatError::MissingField { field } if field == "value"));
    }

    #[test]
    fn extra_field_errors() {
        let source = schema("oid", vec![("name", FieldType::Text, false)], None);
        let target = schema(
            "oid",
            vec![
                ("name", FieldType::Text, false),
                ("extra", FieldType::Integer, false),
            ],
            None,
        );
        let err = ensure_sync_compatible(&source, &target).unwrap_err();
        assert!(matches!(err, CompatError::ExtraField { field } if field == "extra"));
    }

    #[test]
    fn type_mismatch_errors() {
        let source = schema("oid", vec![("value", FieldType::Float, false)], None);
        let target = schema("oid", vec![("value", FieldType::Integer, false)], None);
        let err = ensure_sync_compatible(&source, &target).unwrap_err();
        assert!(matches!(
            err,
            CompatError::TypeMismatch {
                field,
                source_type: FieldType::Float,
                target_type: FieldType::Integer,
            } if field == "value"
        ));
    }

    #[test]
    fn nullability_mismatch_errors() {
        let source = schema("oid", vec![("name", FieldType::Text, false)], None);
        let target = schema("oid", vec![("name", FieldType::Text, true)], None);
        let err = ensure_sync_compatible(&source, &target).unwrap_err();
        assert!(matches!(err, CompatError::NullabilityMismatch { field } if field == "name"));
    }

    #[test]
    fn field_names_are_case_sensitive() {
        let source = schema("oid", vec![("Name", FieldType::Text, false)], None);
        let target = schema("oid", vec![("name", FieldType::Text, false)], None);
        let err = ensure_sync_compatible(&source, &target).unwrap_err();
        assert!(matches!(err, CompatError::MissingField { field } if field == "Name"));
    }

    #[test]
    fn geometry_designation_must_agree() {
        let source = schema(
            "oid",
            vec![("shape", FieldType::Point, true)],
            Some("shape"),
        );
        let target = schema("oid", vec![("shape", FieldType::Point, true)], None);
        let err = ensure_sync_compatible(&source, &target).unwrap_err();
        assert!(matches!(err, CompatError::GeometryMismatch { .. }));
    }

    #[test]
    fn matching_geometry_designation_is_compatible() {
        let source = schema(
            "oid",
            vec![("shape", FieldType::Point, true)],
            Some("shape"),
        );
        let target = schema(
            "oid",
            vec![("shape", FieldType::Point, true)],
            Some("shape"),
        );
        ensure_sync_compatible(&source, &target).expect("matching geometry designation");
    }
}
