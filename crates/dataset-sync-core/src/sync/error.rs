//! Error types and SNAFU context selectors for the synchronizer.
//!
//! Centralizes the `SyncError` enum used by the public API so the
//! construction, diff, and apply paths attach context through selectors
//! instead of re-wrapping by hand.

use std::fmt;

use snafu::prelude::*;

use crate::dataset::CompatError;
use crate::table::TableError;

/// The three batch phases of an apply pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Replacing target rows with newer source rows.
    Updates,
    /// Inserting source-only rows into the target.
    Inserts,
    /// Deleting target-only rows.
    Deletes,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Updates => "updates",
            SyncPhase::Inserts => "inserts",
            SyncPhase::Deletes => "deletes",
        };
        write!(f, "{name}")
    }
}

/// Errors from synchronizer operations.
///
/// Construction errors (`OpenSource`, `OpenTarget`, `SchemaIncompatible`)
/// mean nothing was applied. An `Apply` error names the phase that failed;
/// earlier phases are already committed and a retry recomputes the
/// remaining delta from current state.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SyncError {
    /// The source dataset could not be opened.
    #[snafu(display("Cannot open source dataset: {source}"))]
    OpenSource {
        /// Underlying dataset error (boxed to keep the variant small).
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    /// The target dataset could not be opened.
    #[snafu(display("Cannot open target dataset: {source}"))]
    OpenTarget {
        /// Underlying dataset error (boxed to keep the variant small).
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    /// Source and target schemas cannot drive a sync.
    #[snafu(display("Source and target schemas are incompatible: {source}"))]
    SchemaIncompatible {
        /// Underlying compatibility error.
        source: CompatError,
    },

    /// Reading the source dataset failed while computing a diff.
    #[snafu(display("Cannot read source dataset for diff: {source}"))]
    ReadSource {
        /// Underlying dataset error (boxed to keep the variant small).
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    /// Reading the target dataset failed while computing a diff.
    #[snafu(display("Cannot read target dataset for diff: {source}"))]
    ReadTarget {
        /// Underlying dataset error (boxed to keep the variant small).
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    /// A batch phase failed while applying changes to the target.
    #[snafu(display("Applying {phase} to target dataset failed: {source}"))]
    Apply {
        /// The phase that failed.
        phase: SyncPhase,
        /// Underlying dataset error (boxed to keep the variant small).
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },
}

/// Result alias for synchronizer operations.
pub type SyncResult<T> = Result<T, SyncError>;
