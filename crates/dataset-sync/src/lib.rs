//! # dataset-sync
//!
//! Change-detection and synchronization for tabular datasets keyed by an
//! integer row identifier and a last-edited timestamp.
//!
//! This crate is the supported public entry point and provides a small,
//! stable surface over `dataset-sync-core`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dataset_sync::prelude::*;
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

/// Predicate namespace (wrapper-only).
pub mod predicate {
    pub use dataset_sync_core::predicate::IdPredicate;
}

pub use dataset_sync_core::dataset::{
    CompatError, FieldDef, FieldType, FieldValue, Row, RowId, SchemaError, TableSchema,
};
pub use dataset_sync_core::storage::DatasetLocation;
pub use dataset_sync_core::sync::{ApplyReport, ChangeSet, SyncError, SyncPhase, Synchronizer};
pub use dataset_sync_core::table::{EditSession, Table, TableError};
