//! Change sets: the three-way diff between two datasets.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dataset::RowId;

/// The three disjoint id-sets describing how to converge a target dataset
/// to its source.
///
/// Invariant: the sets are pairwise disjoint by construction —
/// `inserts` ⊆ source − target, `deletes` ⊆ target − source, and `updates`
/// ⊆ source ∩ target, so no id can land in two sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Ids present in the source but absent from the target.
    pub inserts: BTreeSet<RowId>,
    /// Ids present in both where the source timestamp is strictly newer.
    pub updates: BTreeSet<RowId>,
    /// Ids present in the target but absent from the source.
    pub deletes: BTreeSet<RowId>,
}

impl ChangeSet {
    /// Compute the diff between two id→last-edited snapshots.
    ///
    /// An id common to both sides becomes an update only when the source
    /// timestamp is *strictly* newer; equal timestamps mean unchanged, so
    /// re-running a completed sync stays a no-op. A source timestamp older
    /// than the target's (clock skew on the writer) is skipped silently —
    /// timestamps are assumed monotonically non-decreasing per id.
    pub fn between(
        source: &BTreeMap<RowId, DateTime<Utc>>,
        target: &BTreeMap<RowId, DateTime<Utc>>,
    ) -> ChangeSet {
        let mut change = ChangeSet::default();

        for (&id, &source_edited) in source {
            match target.get(&id) {
                None => {
                    change.inserts.insert(id);
                }
                Some(&target_edited) if source_edited > target_edited => {
                    change.updates.insert(id);
                }
                Some(_) => {}
            }
        }

        for &id in target.keys() {
            if !source.contains_key(&id) {
                change.deletes.insert(id);
            }
        }

        change
    }

    /// Whether the diff carries no work at all.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Total number of ids across the three sets.
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }
}
