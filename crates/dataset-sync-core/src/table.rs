//! Local dataset backend.
//!
//! A [`Table`] is a dataset persisted as a single JSON document under its
//! root directory. The on-disk document holds the schema plus all rows
//! ordered by id; the in-memory handle keeps rows in a `BTreeMap` rebuilt on
//! `open`/`reload`. All writes go through an [`EditSession`], which stages a
//! batch of inserts/updates/deletes and publishes them with one atomic
//! write-then-rename, so a batch lands entirely or not at all.

mod edit;

pub use edit::EditSession;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::{Backtrace, prelude::*};

use crate::dataset::{Row, RowId, SchemaError, TableSchema};
use crate::predicate::IdPredicate;
use crate::storage::{self, DatasetLocation, StorageError};

/// Errors from dataset-level operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableError {
    /// The dataset does not exist at the given location.
    #[snafu(display("Dataset not found at {path}"))]
    DatasetMissing {
        /// The dataset document path that was not found.
        path: String,
        /// Underlying storage error.
        source: StorageError,
    },

    /// Creating a dataset where one already exists.
    #[snafu(display("Dataset already exists at {path}"))]
    DatasetExists {
        /// The dataset document path that already exists.
        path: String,
        /// Underlying storage error.
        source: StorageError,
    },

    /// The dataset document could not be parsed or serialized.
    #[snafu(display("Corrupt dataset at {path}: {msg}"))]
    CorruptDataset {
        /// The dataset document path.
        path: String,
        /// What went wrong.
        msg: String,
        /// Backtrace captured when the error occurred.
        backtrace: Backtrace,
    },

    /// The dataset schema failed validation.
    #[snafu(display("Invalid dataset schema: {source}"))]
    Schema {
        /// Underlying schema error.
        source: SchemaError,
    },

    /// A row did not validate against the dataset schema.
    #[snafu(display("Row rejected by dataset schema: {source}"))]
    InvalidRow {
        /// Underlying schema error.
        source: SchemaError,
    },

    /// Inserting a row whose id is already present.
    #[snafu(display("Duplicate row id {id} on insert"))]
    DuplicateRow {
        /// The duplicated row id.
        id: RowId,
    },

    /// Updating or deleting a row that does not exist.
    #[snafu(display("Row {id} not found"))]
    RowMissing {
        /// The missing row id.
        id: RowId,
    },

    /// Storage failure while reading or writing the dataset document.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// Underlying storage error.
        source: StorageError,
    },
}

/// Result alias for dataset operations.
pub type TableResult<T> = Result<T, TableError>;

/// On-disk shape of a dataset document.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DatasetDocument {
    pub(crate) schema: TableSchema,
    pub(crate) rows: Vec<Row>,
}

/// An open dataset: schema plus rows addressable by id.
#[derive(Debug)]
pub struct Table {
    location: DatasetLocation,
    schema: TableSchema,
    rows: BTreeMap<RowId, Row>,
}

impl Table {
    /// File name of the dataset document under the dataset root.
    pub const DATASET_FILE_NAME: &str = "dataset.json";

    fn dataset_rel_path() -> &'static Path {
        Path::new(Self::DATASET_FILE_NAME)
    }

    fn document_path(location: &DatasetLocation) -> String {
        match location {
            DatasetLocation::Local(root) => {
                root.join(Self::DATASET_FILE_NAME).display().to_string()
            }
        }
    }

    /// Create an empty dataset at `location`.
    ///
    /// Fails with [`TableError::DatasetExists`] if a dataset document is
    /// already present, and never touches an existing one.
    pub async fn create(location: DatasetLocation, schema: TableSchema) -> TableResult<Table> {
        schema.validate().context(SchemaSnafu)?;

        let document = DatasetDocument {
            schema: schema.clone(),
            rows: Vec::new(),
        };
        let json = serialize_document(&document, &Self::document_path(&location))?;

        match storage::write_new(&location, Self::dataset_rel_path(), &json).await {
            Ok(()) => {}
            Err(source @ StorageError::AlreadyExists { .. }) => {
                return Err(source).context(DatasetExistsSnafu {
                    path: Self::document_path(&location),
                });
            }
            Err(source) => return Err(source).context(StorageSnafu),
        }

        Ok(Table {
            location,
            schema,
            rows: BTreeMap::new(),
        })
    }

    /// Open the dataset at `location`.
    ///
    /// A missing document maps to [`TableError::DatasetMissing`]; a document
    /// that fails to parse, carries an invalid schema, duplicate ids, or
    /// rows violating the schema maps to the corresponding error. Nothing is
    /// cached across failures.
    pub async fn open(location: DatasetLocation) -> TableResult<Table> {
        let path = Self::document_path(&location);

        let json = match storage::read_to_string(&location, Self::dataset_rel_path()).await {
            Ok(json) => json,
            Err(source @ StorageError::NotFound { .. }) => {
                return Err(source).context(DatasetMissingSnafu { path });
            }
            Err(source) => return Err(source).context(StorageSnafu),
        };

        let document: DatasetDocument =
            serde_json::from_str(&json).map_err(|e| TableError::CorruptDataset {
                path: path.clone(),
                msg: format!("failed to parse dataset document: {e}"),
                backtrace: Backtrace::capture(),
            })?;

        document.schema.validate().context(SchemaSnafu)?;

        let mut rows = BTreeMap::new();
        for row in document.rows {
            document.schema.validate_row(&row).context(InvalidRowSnafu)?;
            let id = row.id;
            if rows.insert(id, row).is_some() {
                return CorruptDatasetSnafu {
                    path: path.clone(),
                    msg: format!("duplicate row id {id} in dataset document"),
                }
                .fail();
            }
        }

        Ok(Table {
            location,
            schema: document.schema,
            rows,
        })
    }

    /// Re-read the dataset document, replacing the in-memory state.
    ///
    /// Used before computing a diff so the snapshot reflects what is on
    /// disk right now, not what this handle loaded earlier.
    pub async fn reload(&mut self) -> TableResult<()> {
        let fresh = Table::open(self.location.clone()).await?;
        self.schema = fresh.schema;
        self.rows = fresh.rows;
        Ok(())
    }

    /// The dataset schema.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// The dataset location.
    pub fn location(&self) -> &DatasetLocation {
        &self.location
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in ascending id order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    /// Look up a row by id.
    pub fn get(&self, id: RowId) -> Option<&Row> {
        self.rows.get(&id)
    }

    /// Snapshot of id to last-edited timestamp for every row.
    ///
    /// This is the input to diff computation: one pass, no payload clones.
    pub fn edited_index(&self) -> BTreeMap<RowId, DateTime<Utc>> {
        self.rows
            .iter()
            .map(|(&id, row)| (id, row.edited_at))
            .collect()
    }

    /// Batch-read the rows matching `predicate` (all rows when `None`).
    ///
    /// One pass over the dataset regardless of how many ids the predicate
    /// holds; the single-id and multi-id forms go through the same path.
    pub fn scan(&self, predicate: Option<&IdPredicate>) -> Vec<Row> {
        self.rows
            .values()
            .filter(|row| predicate.map_or(true, |p| p.matches(row.id)))
            .cloned()
            .collect()
    }

    /// Begin a scoped edit session against this dataset.
    ///
    /// The session stages writes in memory; nothing reaches disk until
    /// [`EditSession::commit`]. Dropping the session without committing
    /// discards every staged write.
    pub fn edit(&mut self) -> EditSession<'_> {
        EditSession::begin(self)
    }

    /// Persist `rows` as the new dataset document, then adopt them as the
    /// in-memory state. Called by [`EditSession::commit`].
    pub(crate) async fn publish(&mut self, rows: BTreeMap<RowId, Row>) -> TableResult<()> {
        let document = DatasetDocument {
            schema: self.schema.clone(),
            rows: rows.values().cloned().collect(),
        };
        let json = serialize_document(&document, &Self::document_path(&self.location))?;

        storage::write_atomic(&self.location, Self::dataset_rel_path(), &json)
            .await
            .context(StorageSnafu)?;

        self.rows = rows;
        Ok(())
    }
}

fn serialize_document(document: &DatasetDocument, path: &str) -> TableResult<Vec<u8>> {
    serde_json::to_vec_pretty(document).map_err(|e| TableError::CorruptDataset {
        path: path.to_string(),
        msg: format!("failed to serialize dataset document: {e}"),
        backtrace: Backtrace::capture(),
    })
}

#[cfg(test)]
pub(crate) mod test_util {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::dataset::{FieldDef, FieldType, FieldValue, Row, TableSchema};

    pub(crate) type TestResult = Result<(), Box<dyn std::error::Error>>;

    pub(crate) fn utc(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    pub(crate) fn make_schema() -> TableSchema {
        TableSchema::new(
            vec![
                FieldDef {
                    name: "oid".to_string(),
                    field_type: FieldType::Integer,
                    nullable: false,
                },
                FieldDef {
                    name: "edited_at".to_string(),
                    field_type: FieldType::Timestamp,
                    nullable: false,
                },
                FieldDef {
                    name: "name".to_string(),
                    field_type: FieldType::Text,
                    nullable: false,
                },
                FieldDef {
                    name: "shape".to_string(),
                    field_type: FieldType::Point,
                    nullable: true,
                },
            ],
            "oid",
            "edited_at",
            Some("shape".to_string()),
        )
        .expect("valid test schema")
    }

    pub(crate) fn make_row(id: i64, edited_secs: i64, name: &str) -> Row {
        Row::new(id, utc(edited_secs))
            .with_value("name", FieldValue::Text(name.to_string()))
            .with_value(
                "shape",
                FieldValue::Point {
                    x: id as f64,
                    y: -(id as f64),
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use crate::dataset::FieldValue;
    use tempfile::TempDir;

    #[tokio::test]
    async fn create_then_open_round_trips_schema() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());

        Table::create(location.clone(), make_schema()).await?;
        let table = Table::open(location).await?;

        assert_eq!(table.schema(), &make_schema());
        assert!(table.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn create_refuses_existing_dataset() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());

        Table::create(location.clone(), make_schema()).await?;
        let err = Table::create(location, make_schema())
            .await
            .expect_err("second create should fail");
        assert!(matches!(err, TableError::DatasetExists { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn open_missing_dataset_errors() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());

        let err = Table::open(location)
            .await
            .expect_err("open should fail on empty dir");
        assert!(matches!(err, TableError::DatasetMissing { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn open_rejects_garbage_document() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());

        tokio::fs::write(tmp.path().join(Table::DATASET_FILE_NAME), b"not json").await?;

        let err = Table::open(location)
            .await
            .expect_err("open should fail on garbage");
        assert!(matches!(err, TableError::CorruptDataset { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn open_rejects_duplicate_row_ids() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());

        let document = DatasetDocument {
            schema: make_schema(),
            rows: vec![make_row(1, 10, "a"), make_row(1, 20, "b")],
        };
        tokio::fs::write(
            tmp.path().join(Table::DATASET_FILE_NAME),
            serde_json::to_vec(&document)?,
        )
        .await?;

        let err = Table::open(location)
            .await
            .expect_err("open should fail on duplicate ids");
        assert!(matches!(err, TableError::CorruptDataset { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn open_rejects_rows_violating_schema() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());

        let bad_row = Row::new(1, utc(10)).with_value("name", FieldValue::Int(3));
        let document = DatasetDocument {
            schema: make_schema(),
            rows: vec![bad_row],
        };
        tokio::fs::write(
            tmp.path().join(Table::DATASET_FILE_NAME),
            serde_json::to_vec(&document)?,
        )
        .await?;

        let err = Table::open(location)
            .await
            .expect_err("open should fail on invalid row");
        assert!(matches!(err, TableError::InvalidRow { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn edited_index_maps_ids_to_timestamps() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());

        let mut table = Table::create(location, make_schema()).await?;
        let mut edit = table.edit();
        edit.insert(make_row(1, 100, "a"))?;
        edit.insert(make_row(2, 200, "b"))?;
        edit.commit().await?;

        let index = table.edited_index();
        assert_eq!(index.len(), 2);
        assert_eq!(index[&RowId(1)], utc(100));
        assert_eq!(index[&RowId(2)], utc(200));
        Ok(())
    }

    #[tokio::test]
    async fn scan_filters_by_predicate() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());

        let mut table = Table::create(location, make_schema()).await?;
        let mut edit = table.edit();
        for id in 1..=4 {
            edit.insert(make_row(id, id * 10, "row"))?;
        }
        edit.commit().await?;

        let all = table.scan(None);
        assert_eq!(all.len(), 4);

        let predicate = IdPredicate::from_ids([RowId(2), RowId(4)]).expect("non-empty");
        let some = table.scan(Some(&predicate));
        let ids: Vec<_> = some.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RowId(2), RowId(4)]);

        let one = IdPredicate::from_ids([RowId(3)]).expect("non-empty");
        let only: Vec<_> = table.scan(Some(&one)).iter().map(|r| r.id).collect();
        assert_eq!(only, vec![RowId(3)]);
        Ok(())
    }

    #[tokio::test]
    async fn reload_picks_up_external_changes() -> TestResult {
        let tmp = TempDir::new()?;
        let location = DatasetLocation::local(tmp.path());

        let mut table = Table::create(location.clone(), make_schema()).await?;

        // Second handle writes a row behind the first handle's back.
        let mut other = Table::open(location).await?;
        let mut edit = other.edit();
        edit.insert(make_row(9, 90, "late"))?;
        edit.commit().await?;

        assert!(table.is_empty());
        table.reload().await?;
        assert_eq!(table.len(), 1);
        assert!(table.get(RowId(9)).is_some());
        Ok(())
    }
}
