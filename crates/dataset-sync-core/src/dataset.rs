//! Dataset model: rows, field values, schemas, and compatibility checks.
//!
//! A dataset is an ordered collection of rows, each identified by an integer
//! [`RowId`] and stamped with a last-edited timestamp. The schema names every
//! field, designates the identifier and last-edited fields, and optionally a
//! geometry field for spatial datasets.

pub mod compat;
pub mod row;
pub mod schema;

pub use compat::{CompatError, ensure_sync_compatible};
pub use row::{FieldValue, Row, RowId};
pub use schema::{FieldDef, FieldType, SchemaError, TableSchema};
