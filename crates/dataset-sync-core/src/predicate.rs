//! Typed id predicates for batch reads.
//!
//! Filters over row identifiers are built as values instead of WHERE-clause
//! strings, so the single-id and multi-id paths cannot drift apart through
//! string formatting. [`IdPredicate::where_clause`] renders the SQL surface
//! for providers that still speak filter strings; in-process scans evaluate
//! [`IdPredicate::matches`] directly.

use std::collections::BTreeSet;

use crate::dataset::RowId;

/// A predicate over row identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdPredicate {
    /// Exactly one id.
    Equals(RowId),
    /// Membership in a set of ids.
    In(BTreeSet<RowId>),
}

impl IdPredicate {
    /// Build a predicate from a collection of ids.
    ///
    /// Returns `None` for an empty collection (no predicate means "select
    /// nothing" to callers here, so they skip the read entirely), `Equals`
    /// for exactly one id, and `In` otherwise. Duplicates collapse.
    pub fn from_ids<I>(ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = RowId>,
    {
        let mut set: BTreeSet<RowId> = ids.into_iter().collect();
        match set.len() {
            0 => None,
            1 => set.pop_first().map(IdPredicate::Equals),
            _ => Some(IdPredicate::In(set)),
        }
    }

    /// Whether `id` satisfies this predicate.
    pub fn matches(&self, id: RowId) -> bool {
        match self {
            IdPredicate::Equals(only) => *only == id,
            IdPredicate::In(set) => set.contains(&id),
        }
    }

    /// Number of ids this predicate selects.
    pub fn len(&self) -> usize {
        match self {
            IdPredicate::Equals(_) => 1,
            IdPredicate::In(set) => set.len(),
        }
    }

    /// Predicates built via [`IdPredicate::from_ids`] are never empty, but
    /// an `In` constructed directly can be.
    pub fn is_empty(&self) -> bool {
        match self {
            IdPredicate::Equals(_) => false,
            IdPredicate::In(set) => set.is_empty(),
        }
    }

    /// Render the predicate as a SQL-style filter over `id_field`.
    ///
    /// Single id: `id_field = 7`. Multiple ids: `id_field IN (1,2,3)`,
    /// ascending. Both forms select exactly the ids this predicate holds.
    pub fn where_clause(&self, id_field: &str) -> String {
        match self {
            IdPredicate::Equals(id) => format!("{id_field} = {id}"),
            IdPredicate::In(set) => {
                let ids = set
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{id_field} IN ({ids})")
            }
        }
    }
}
