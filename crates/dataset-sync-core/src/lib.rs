//! Core engine for change-detection dataset synchronization.
//!
//! This crate provides the foundational pieces for `dataset-sync`:
//!
//! - A typed row/schema model for tabular datasets keyed by an integer
//!   row identifier and a last-edited timestamp (`dataset` module).
//! - Typed id predicates used for batch reads, replacing string-built
//!   filter clauses (`predicate` module).
//! - A local-filesystem dataset backend with atomic, all-or-nothing
//!   batch writes behind a scoped edit session (`storage` and `table`
//!   modules).
//! - A `Synchronizer` that computes a three-way diff (inserts, updates,
//!   deletes) between a source and a target dataset and applies it to
//!   the target in coarse-grained transactional phases (`sync` module).
//!
//! Higher-level crates (for example, the CLI driver) are expected to
//! depend on this core crate rather than re-implementing the diff and
//! storage logic.
#![deny(missing_docs)]
pub mod dataset;
pub mod predicate;
pub mod storage;
pub mod sync;
pub mod table;
