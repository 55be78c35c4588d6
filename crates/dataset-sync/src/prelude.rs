//! Wrapper prelude.
//!
//! The `dataset-sync` crate is the supported public entry point. Downstream
//! code should prefer importing from this prelude instead of depending on
//! internal core module paths.

pub use crate::predicate;
pub use crate::{
    ApplyReport, ChangeSet, DatasetLocation, FieldDef, FieldType, FieldValue, Row, RowId,
    SyncError, SyncPhase, Synchronizer, Table, TableError, TableSchema,
};
