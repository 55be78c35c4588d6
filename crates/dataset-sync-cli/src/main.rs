//! CLI driver for dataset synchronization.

mod error;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use snafu::ResultExt;

use dataset_sync_core::dataset::TableSchema;
use dataset_sync_core::storage::DatasetLocation;
use dataset_sync_core::sync::Synchronizer;
use dataset_sync_core::table::Table;

use crate::error::{
    CliResult, CreateDatasetSnafu, OpenDatasetSnafu, RenderOutputSnafu, SchemaFileParseSnafu,
    SchemaFileReadSnafu, SyncSnafu,
};

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an empty dataset from a JSON schema file
    Create {
        #[arg(long)]
        table: PathBuf,

        /// Path to a JSON schema document
        #[arg(long)]
        schema: PathBuf,
    },

    /// Print a dataset's schema and rows
    Show {
        #[arg(long)]
        table: PathBuf,
    },

    /// Compute the change set between a source and a target dataset
    Diff {
        #[arg(long)]
        source: PathBuf,

        #[arg(long)]
        target: PathBuf,
    },

    /// Diff and apply: converge the target dataset to the source
    Sync {
        #[arg(long)]
        source: PathBuf,

        #[arg(long)]
        target: PathBuf,

        /// Print elapsed time for the sync
        #[arg(long, default_value_t = false)]
        timing: bool,
    },
}

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

async fn read_schema_file(path: &Path) -> CliResult<TableSchema> {
    let text = tokio::fs::read_to_string(path)
        .await
        .context(SchemaFileReadSnafu {
            path: path.display().to_string(),
        })?;

    serde_json::from_str(&text).context(SchemaFileParseSnafu {
        path: path.display().to_string(),
    })
}

async fn cmd_create(table: &Path, schema: &Path) -> CliResult<()> {
    let schema = read_schema_file(schema).await?;

    Table::create(DatasetLocation::local(table), schema)
        .await
        .context(CreateDatasetSnafu {
            table: table.display().to_string(),
        })?;

    println!("Created dataset at {}", table.display());
    Ok(())
}

async fn cmd_show(table_root: &Path) -> CliResult<()> {
    let table = Table::open(DatasetLocation::local(table_root))
        .await
        .context(OpenDatasetSnafu {
            table: table_root.display().to_string(),
        })?;

    let schema = table.schema();
    println!("Dataset at {}", table_root.display());
    println!(
        "Fields (id: {}, edited: {}{}):",
        schema.id_field(),
        schema.edited_field(),
        match schema.geometry_field() {
            Some(geometry) => format!(", geometry: {geometry}"),
            None => String::new(),
        }
    );
    for field in schema.fields() {
        println!("  {field}");
    }

    println!("Rows: {}", table.len());
    for row in table.rows() {
        let rendered = serde_json::to_string(row).context(RenderOutputSnafu)?;
        println!("{rendered}");
    }
    Ok(())
}

async fn connect(source: &Path, target: &Path) -> CliResult<Synchronizer> {
    Synchronizer::connect(
        DatasetLocation::local(source),
        DatasetLocation::local(target),
    )
    .await
    .context(SyncSnafu {
        source_table: source.display().to_string(),
        target_table: target.display().to_string(),
    })
}

async fn cmd_diff(source: &Path, target: &Path) -> CliResult<()> {
    let mut sync = connect(source, target).await?;

    let change = sync.diff().await.context(SyncSnafu {
        source_table: source.display().to_string(),
        target_table: target.display().to_string(),
    })?;

    let rendered = serde_json::to_string_pretty(change).context(RenderOutputSnafu)?;
    println!("{rendered}");
    println!(
        "{} to update, {} to insert, {} to delete",
        change.updates.len(),
        change.inserts.len(),
        change.deletes.len()
    );
    Ok(())
}

async fn cmd_sync(source: &Path, target: &Path, timing: bool) -> CliResult<()> {
    let start = Instant::now();
    let mut sync = connect(source, target).await?;

    let report = sync.apply().await.context(SyncSnafu {
        source_table: source.display().to_string(),
        target_table: target.display().to_string(),
    })?;

    println!("Updated {} rows", report.updated.len());
    println!("Inserted {} rows", report.inserted.len());
    println!("Deleted {} rows", report.deleted.len());
    if timing {
        println!("Elapsed: {} ms", start.elapsed().as_millis());
    }
    Ok(())
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Create { table, schema } => cmd_create(&table, &schema).await,
        Command::Show { table } => cmd_show(&table).await,
        Command::Diff { source, target } => cmd_diff(&source, &target).await,
        Command::Sync {
            source,
            target,
            timing,
        } => cmd_sync(&source, &target, timing).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
