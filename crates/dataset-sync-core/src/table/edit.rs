//! Scoped edit sessions over a dataset.
//!
//! An [`EditSession`] is the transactional edit scope of the backend: it
//! stages a batch of writes against a working copy of the rows and publishes
//! them with a single atomic document replacement on commit. The session
//! borrows the table mutably, so it is released on every exit path; dropping
//! it without committing discards all staged writes and leaves both disk and
//! the in-memory table untouched.

use std::collections::BTreeMap;

use snafu::prelude::*;

use crate::dataset::{Row, RowId};
use crate::table::{DuplicateRowSnafu, InvalidRowSnafu, RowMissingSnafu, Table, TableResult};

/// A batch of staged writes against one dataset.
#[derive(Debug)]
pub struct EditSession<'a> {
    table: &'a mut Table,
    staged: BTreeMap<RowId, Row>,
}

impl<'a> EditSession<'a> {
    pub(crate) fn begin(table: &'a mut Table) -> Self {
        let staged = table
            .rows()
            .map(|row| (row.id, row.clone()))
            .collect();
        Self { table, staged }
    }

    /// Stage an insert. The row must validate against the schema and its id
    /// must not be present yet.
    pub fn insert(&mut self, row: Row) -> TableResult<()> {
        self.table.schema().validate_row(&row).context(InvalidRowSnafu)?;
        if self.staged.contains_key(&row.id) {
            return DuplicateRowSnafu { id: row.id }.fail();
        }
        self.staged.insert(row.id, row);
        Ok(())
    }

    /// Stage an update, replacing the existing row with the same id.
    pub fn update(&mut self, row: Row) -> TableResult<()> {
        self.table.schema().validate_row(&row).context(InvalidRowSnafu)?;
        if !self.staged.contains_key(&row.id) {
            return RowMissingSnafu { id: row.id }.fail();
        }
        self.staged.insert(row.id, row);
        Ok(())
    }

    /// Stage a delete by id.
    pub fn delete(&mut self, id: RowId) -> TableResult<()> {
        match self.staged.remove(&id) {
            Some(_) => Ok(()),
            None => RowMissingSnafu { id }.fail(),
        }
    }

    /// Number of rows the dataset would hold after this batch.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Publish the staged batch.
    ///
    /// One atomic write replaces the dataset document; only after the write
    /// succeeds does the in-memory table adopt the staged rows. On error the
    /// table keeps its previous state and the batch is lost, never half
    /// applied.
    pub async fn commit(self) -> TableResult<()> {
        self.table.publish(self.staged).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::FieldValue;
    use crate::storage::DatasetLocation;
    use crate::table::TableError;
    use crate::table::test_util::*;
    use tempfile::TempDir;

    async fn seeded_table(location: DatasetLocation) -> Result<Table, Box<dyn std::error::Error>> {
        let mut table = Table::create(location, make_schema()).await?;
        let mut edit = table.edit();
        edit.insert(make_row(1, 100, "one"))?;
        edit.insert(make_row(2, 200, "two"))?;
        edit.commit().await?;
        Ok(table)
    }

    #[tokio::test]
    async fn commit_persists_staged_batch() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());
        let table = seeded_table(location.clone()).await?;
        assert_eq!(table.len(), 2);

        // A fresh handle sees the committed rows.
        let reopened = Table::open(location).await?;
        assert_eq!(reopened.len(), 2);
        assert!(reopened.get(RowId(1)).is_some());
        assert!(reopened.get(RowId(2)).is_some());
        Ok(())
    }

    #[tokio::test]
    async fn dropped_session_discards_staged_writes() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());
        let mut table = seeded_table(location.clone()).await?;

        {
            let mut edit = table.edit();
            edit.insert(make_row(3, 300, "three"))?;
            edit.delete(RowId(1))?;
            // No commit.
        }

        assert_eq!(table.len(), 2);
        let reopened = Table::open(location).await?;
        assert_eq!(reopened.len(), 2);
        assert!(reopened.get(RowId(3)).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());
        let mut table = seeded_table(location).await?;

        let mut edit = table.edit();
        let err = edit.insert(make_row(1, 999, "dup")).unwrap_err();
        assert!(matches!(err, TableError::DuplicateRow { id } if id == RowId(1)));
        Ok(())
    }

    #[tokio::test]
    async fn update_rejects_missing_row() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());
        let mut table = seeded_table(location).await?;

        let mut edit = table.edit();
        let err = edit.update(make_row(42, 999, "ghost")).unwrap_err();
        assert!(matches!(err, TableError::RowMissing { id } if id == RowId(42)));
        Ok(())
    }

    #[tokio::test]
    async fn delete_rejects_missing_row() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());
        let mut table = seeded_table(location).await?;

        let mut edit = table.edit();
        let err = edit.delete(RowId(42)).unwrap_err();
        assert!(matches!(err, TableError::RowMissing { id } if id == RowId(42)));
        Ok(())
    }

    #[tokio::test]
    async fn insert_rejects_row_violating_schema() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());
        let mut table = seeded_table(location).await?;

        let bad = Row::new(5, utc(500)).with_value("name", FieldValue::Int(5));
        let mut edit = table.edit();
        let err = edit.insert(bad).unwrap_err();
        assert!(matches!(err, TableError::InvalidRow { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn update_replaces_payload_and_timestamp() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());
        let mut table = seeded_table(location.clone()).await?;

        let mut edit = table.edit();
        edit.update(make_row(1, 150, "renamed"))?;
        edit.commit().await?;

        let row = table.get(RowId(1)).expect("row present");
        assert_eq!(row.edited_at, utc(150));
        assert_eq!(
            row.values.get("name"),
            Some(&FieldValue::Text("renamed".to_string()))
        );

        let reopened = Table::open(location).await?;
        assert_eq!(reopened.get(RowId(1)).expect("row present").edited_at, utc(150));
        Ok(())
    }

    #[tokio::test]
    async fn staged_len_tracks_batch() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());
        let mut table = seeded_table(location).await?;

        let mut edit = table.edit();
        assert_eq!(edit.staged_len(), 2);
        edit.insert(make_row(3, 300, "three"))?;
        assert_eq!(edit.staged_len(), 3);
        edit.delete(RowId(1))?;
        edit.delete(RowId(2))?;
        assert_eq!(edit.staged_len(), 1);
        Ok(())
    }
}
