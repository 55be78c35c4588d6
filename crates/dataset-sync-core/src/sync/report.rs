//! Apply reports: what a sync pass actually did.

use serde::Serialize;

use crate::dataset::RowId;

/// Ids acted upon by one [`crate::sync::Synchronizer::apply`] pass, per
/// category, in apply order.
///
/// Planned ids whose source row vanished between diff and apply are absent
/// here; the report records effects, not intentions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Ids whose target rows were replaced with newer source rows.
    pub updated: Vec<RowId>,
    /// Ids inserted into the target.
    pub inserted: Vec<RowId>,
    /// Ids deleted from the target.
    pub deleted: Vec<RowId>,
}

impl ApplyReport {
    /// Total number of rows touched.
    pub fn total(&self) -> usize {
        self.updated.len() + self.inserted.len() + self.deleted.len()
    }

    /// Whether the pass changed nothing.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_add_up() {
        let report = ApplyReport {
            updated: vec![RowId(1)],
            inserted: vec![RowId(2), RowId(3)],
            deleted: vec![],
        };
        assert_eq!(report.total(), 3);
        assert!(!report.is_empty());
        assert!(ApplyReport::default().is_empty());
    }
}
