//! Change detection and synchronization between two datasets.
//!
//! A [`Synchronizer`] is bound to one (source, target) pair for its whole
//! life. `diff()` reads an id→last-edited snapshot from each side and derives
//! a [`ChangeSet`] by set algebra; the result is memoized until `apply()`
//! consumes it. `apply()` converges the target in three coarse-grained batch
//! phases — updates, then inserts, then deletes — each one batch read from
//! the source plus one scoped edit session on the target. The source is never
//! mutated.
//!
//! There is no coordination with concurrent writers: if either dataset
//! changes between `diff()` and `apply()`, the last writer wins at the
//! storage layer. The memoized diff is reset at the start of `apply()`, so
//! after any outcome — success or a failed phase — the next `diff()`
//! recomputes from current state instead of resuming a stale plan.

pub mod change_set;
pub mod error;
pub mod report;

pub use change_set::ChangeSet;
pub use error::{SyncError, SyncPhase, SyncResult};
pub use report::ApplyReport;

use std::mem;

use snafu::prelude::*;

use crate::dataset::ensure_sync_compatible;
use crate::predicate::IdPredicate;
use crate::storage::DatasetLocation;
use crate::sync::error::{
    ApplySnafu, OpenSourceSnafu, OpenTargetSnafu, ReadSourceSnafu, ReadTargetSnafu,
    SchemaIncompatibleSnafu,
};
use crate::table::Table;

/// Memoization state of the diff, reset by every `apply()`.
#[derive(Debug)]
enum DiffState {
    /// No diff on hand; the next `diff()` or `apply()` computes one.
    NotComputed,
    /// A memoized diff awaiting `apply()` or re-read.
    Computed(ChangeSet),
}

/// Converges a target dataset to its source by applying a three-way diff.
#[derive(Debug)]
pub struct Synchronizer {
    source: Table,
    target: Table,
    diff: DiffState,
}

impl Synchronizer {
    /// Bind a synchronizer to an already-opened (source, target) pair.
    ///
    /// Fails fast with [`SyncError::SchemaIncompatible`] when the payload
    /// schemas cannot drive a sync; nothing is applied in that case.
    pub fn new(source: Table, target: Table) -> SyncResult<Self> {
        ensure_sync_compatible(source.schema(), target.schema())
            .context(SchemaIncompatibleSnafu)?;

        Ok(Self {
            source,
            target,
            diff: DiffState::NotComputed,
        })
    }

    /// Open both datasets and bind a synchronizer to them.
    ///
    /// A missing dataset surfaces as [`SyncError::OpenSource`] or
    /// [`SyncError::OpenTarget`] before anything else happens.
    pub async fn connect(
        source: DatasetLocation,
        target: DatasetLocation,
    ) -> SyncResult<Self> {
        let source = Table::open(source).await.context(OpenSourceSnafu)?;
        let target = Table::open(target).await.context(OpenTargetSnafu)?;
        Self::new(source, target)
    }

    /// The source dataset handle.
    pub fn source(&self) -> &Table {
        &self.source
    }

    /// The target dataset handle.
    pub fn target(&self) -> &Table {
        &self.target
    }

    /// Compute (or return the memoized) change set.
    ///
    /// On first call after construction or after an `apply()`, both datasets
    /// are re-read from storage and the diff is derived from the fresh
    /// snapshots; read failures surface immediately and nothing is cached.
    /// Until the next `apply()`, repeated calls return the identical change
    /// set without touching storage.
    pub async fn diff(&mut self) -> SyncResult<&ChangeSet> {
        if matches!(self.diff, DiffState::NotComputed) {
            let change = self.compute_diff().await?;
            self.diff = DiffState::Computed(change);
        }

        match &self.diff {
            DiffState::Computed(change) => Ok(change),
            // Set two lines up; reaching this arm is a state-machine bug.
            DiffState::NotComputed => unreachable!("diff state was just computed"),
        }
    }

    /// Apply the change set to the target in three batch phases.
    ///
    /// Consumes the memoized diff (computing one first if needed) and resets
    /// the state to not-computed *before* writing, so every exit path —
    /// success or a failed phase — leaves the cache cleared and a retry
    /// recomputes the remaining delta instead of resuming this plan.
    ///
    /// Phases run in the fixed order updates → inserts → deletes; the sets
    /// are disjoint, so the order carries no correctness weight, but
    /// reports and logs depend on it. Each phase is one batch read from the
    /// source (single predicate scan, not per-row round trips) and one edit
    /// session on the target, committed atomically. A failing phase leaves
    /// earlier phases committed; the target is then partially converged and
    /// re-invocation works from current state.
    ///
    /// Returns the ids actually acted upon per category: planned rows whose
    /// source row vanished in the diff→apply window are skipped, not
    /// reported.
    pub async fn apply(&mut self) -> SyncResult<ApplyReport> {
        let plan = match mem::replace(&mut self.diff, DiffState::NotComputed) {
            DiffState::Computed(change) => change,
            DiffState::NotComputed => self.compute_diff().await?,
        };

        let mut report = ApplyReport::default();

        // 1) Updates: replace target rows with their newer source versions.
        if let Some(predicate) = IdPredicate::from_ids(plan.updates.iter().copied()) {
            let rows = self.source.scan(Some(&predicate));
            if !rows.is_empty() {
                let mut edit = self.target.edit();
                let mut updated = Vec::with_capacity(rows.len());
                for row in rows {
                    let id = row.id;
                    edit.update(row).context(ApplySnafu {
                        phase: SyncPhase::Updates,
                    })?;
                    updated.push(id);
                }
                edit.commit().await.context(ApplySnafu {
                    phase: SyncPhase::Updates,
                })?;
                report.updated = updated;
            }
        }

        // 2) Inserts: copy source-only rows over.
        if let Some(predicate) = IdPredicate::from_ids(plan.inserts.iter().copied()) {
            let rows = self.source.scan(Some(&predicate));
            if !rows.is_empty() {
                let mut edit = self.target.edit();
                let mut inserted = Vec::with_capacity(rows.len());
                for row in rows {
                    let id = row.id;
                    edit.insert(row).context(ApplySnafu {
                        phase: SyncPhase::Inserts,
                    })?;
                    inserted.push(id);
                }
                edit.commit().await.context(ApplySnafu {
                    phase: SyncPhase::Inserts,
                })?;
                report.inserted = inserted;
            }
        }

        // 3) Deletes: drop target-only rows. No source read needed.
        if !plan.deletes.is_empty() {
            let mut edit = self.target.edit();
            let mut deleted = Vec::with_capacity(plan.deletes.len());
            for &id in &plan.deletes {
                edit.delete(id).context(ApplySnafu {
                    phase: SyncPhase::Deletes,
                })?;
                deleted.push(id);
            }
            edit.commit().await.context(ApplySnafu {
                phase: SyncPhase::Deletes,
            })?;
            report.deleted = deleted;
        }

        Ok(report)
    }

    /// Re-read both datasets and derive a fresh change set.
    ///
    /// The compatibility check runs again after the reload: a schema that
    /// changed on disk since construction must not silently drive a sync.
    async fn compute_diff(&mut self) -> SyncResult<ChangeSet> {
        self.source.reload().await.context(ReadSourceSnafu)?;
        self.target.reload().await.context(ReadTargetSnafu)?;

        ensure_sync_compatible(self.source.schema(), self.target.schema())
            .context(SchemaIncompatibleSnafu)?;

        Ok(ChangeSet::between(
            &self.source.edited_index(),
            &self.target.edited_index(),
        ))
    }
}
