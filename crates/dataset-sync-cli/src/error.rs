use dataset_sync_core::sync::SyncError;
use dataset_sync_core::table::TableError;

use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Cannot read schema file {path}: {source}"))]
    SchemaFileRead {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display(
        "Schema file {path} is not a valid schema document: {source}. \
         Expected JSON with fields, id_field, edited_field, and optional geometry_field."
    ))]
    SchemaFileParse {
        path: String,
        source: serde_json::Error,
    },

    #[snafu(display(
        "Failed to create dataset at {table}. \
         Ensure the directory is writable and holds no dataset yet."
    ))]
    CreateDataset {
        table: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Failed to open dataset at {table}: {source}"))]
    OpenDataset {
        table: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Sync from {source_table} to {target_table} failed: {source}"))]
    Sync {
        source_table: String,
        target_table: String,
        #[snafu(source(from(SyncError, Box::new)))]
        source: Box<SyncError>,
    },

    #[snafu(display("Failed to render output: {source}"))]
    RenderOutput { source: serde_json::Error },
}
