//! Command-line interface for flatsync
//!
//! # Usage Examples
//!
//! ## Import
//! ```bash
//! # CSV import, provisioning the table from inferred column types
//! flatsync import people.csv \
//!   --db app.db --table people --create-table
//!
//! # Tab-separated import with a mapping/validation profile
//! flatsync import people.tsv \
//!   --db app.db --delimiter tab --profile people.yaml \
//!   --continue-on-error
//!
//! # Row-by-row streaming import for large files
//! flatsync import big.csv \
//!   --db app.db --table events --create-table --stream
//! ```
//!
//! ## Export
//! ```bash
//! # Whole table as pretty-printed JSON with a schema description
//! flatsync export \
//!   --db app.db --table people --format structured-record \
//!   --pretty --include-schema -o people.json
//!
//! # Query result as CSV
//! flatsync export \
//!   --db app.db --query "SELECT name, age FROM people WHERE age > 30" \
//!   -o adults.csv
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use flatsync::{
    run_export, run_import, run_stream_import, DataFormat, ExportOptions, ImportOptions,
    ImportProfile, ProgressInfo, ProgressSink,
};
use flatsync_sqlite::SqliteStore;

#[derive(Parser)]
#[command(name = "flatsync")]
#[command(about = "A tool for bulk-importing and exporting flat data files against SQLite")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a data file into a database table
    Import {
        #[command(flatten)]
        args: ImportArgs,
    },

    /// Export a table or query result to a data file
    Export {
        #[command(flatten)]
        args: ExportArgs,
    },
}

#[derive(Parser, Clone)]
struct ImportArgs {
    /// Path of the file to import
    input: PathBuf,

    /// SQLite database file to import into
    #[arg(long, env = "FLATSYNC_DB")]
    db: PathBuf,

    /// Payload format
    #[arg(long, value_enum, default_value_t = DataFormat::DelimitedText)]
    format: DataFormat,

    /// Destination table (a profile mapping's target table takes precedence)
    #[arg(long)]
    table: Option<String>,

    /// Rows per write transaction
    #[arg(long, default_value = "1000")]
    batch_size: usize,

    /// Leading data rows to discard after parsing
    #[arg(long, default_value = "0")]
    skip_rows: usize,

    /// Field delimiter for delimited text ("tab" or "\t" for TSV)
    #[arg(long, default_value = ",")]
    delimiter: String,

    /// Declared payload encoding (only utf8 is supported)
    #[arg(long, default_value = "utf8")]
    encoding: String,

    /// Drop and recreate the destination table from the inferred schema
    #[arg(long)]
    create_table: bool,

    /// Drop the destination table before importing (normally combined with --create-table)
    #[arg(long)]
    drop_table: bool,

    /// Collect validation and write failures as warnings instead of aborting
    #[arg(long)]
    continue_on_error: bool,

    /// Parse and validate only - don't actually write data
    #[arg(long)]
    dry_run: bool,

    /// Read delimited text row by row instead of buffering the whole file
    #[arg(long)]
    stream: bool,

    /// Sheet to read for spreadsheet payloads
    #[arg(long)]
    sheet: Option<String>,

    /// YAML profile with a column mapping and validation rules
    #[arg(long, value_name = "PATH")]
    profile: Option<PathBuf>,
}

#[derive(Parser, Clone)]
struct ExportArgs {
    /// SQLite database file to export from
    #[arg(long, env = "FLATSYNC_DB")]
    db: PathBuf,

    /// Path of the file to write
    #[arg(short, long)]
    output: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = DataFormat::DelimitedText)]
    format: DataFormat,

    /// Table to export with a full scan
    #[arg(long)]
    table: Option<String>,

    /// SQL query to export instead of a whole table
    #[arg(long)]
    query: Option<String>,

    /// Field delimiter for delimited text ("tab" or "\t" for TSV)
    #[arg(long, default_value = ",")]
    delimiter: String,

    /// Pretty-print structured output
    #[arg(long)]
    pretty: bool,

    /// Include a schema description in the output
    #[arg(long)]
    include_schema: bool,

    /// Sheet name for spreadsheet output
    #[arg(long)]
    sheet: Option<String>,

    /// YAML profile with a column mapping
    #[arg(long, value_name = "PATH")]
    profile: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import { args } => run_import_command(args).await?,
        Commands::Export { args } => run_export_command(args).await?,
    }

    Ok(())
}

/// Translate the `--delimiter` flag into a single byte.
fn parse_delimiter(raw: &str) -> anyhow::Result<u8> {
    if raw == "tab" || raw == "\\t" {
        return Ok(b'\t');
    }
    match raw.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => anyhow::bail!("delimiter must be a single ASCII character, got {raw:?}"),
    }
}

/// Progress sink that forwards each batch snapshot to the log.
struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, progress: &ProgressInfo) {
        tracing::info!(
            status = ?progress.status,
            processed = progress.processed_rows,
            total = progress.total_rows,
            percentage = progress.percentage,
            "progress"
        );
    }
}

async fn run_import_command(args: ImportArgs) -> anyhow::Result<()> {
    let store = SqliteStore::open(&args.db)?;

    let mut options = ImportOptions {
        format: args.format,
        table_name: args.table.clone(),
        batch_size: args.batch_size,
        skip_rows: args.skip_rows,
        delimiter: parse_delimiter(&args.delimiter)?,
        encoding: args.encoding.clone(),
        create_table: args.create_table,
        drop_table: args.drop_table,
        continue_on_error: args.continue_on_error,
        dry_run: args.dry_run,
        sheet_name: args.sheet.clone(),
        progress: Some(Arc::new(LogProgress)),
        ..Default::default()
    };

    if let Some(ref path) = args.profile {
        let profile = ImportProfile::from_file(path)?;
        options.mapping = profile.mapping;
        options.validation = profile.validation;
    }

    if args.dry_run {
        tracing::info!("Running in dry-run mode - no data will be written");
    }

    let result = if args.stream {
        let file = fs::File::open(&args.input)
            .with_context(|| format!("failed to open {}", args.input.display()))?;
        run_stream_import(&store, BufReader::new(file), &options).await
    } else {
        let payload = fs::read(&args.input)
            .with_context(|| format!("failed to read {}", args.input.display()))?;
        run_import(&store, &payload, &options).await
    };

    for warning in &result.warnings {
        tracing::warn!("{warning}");
    }
    for error in &result.errors {
        tracing::warn!("{error}");
    }
    if !result.success {
        anyhow::bail!("import failed: {}", result.message);
    }

    tracing::info!(
        rows = result.rows_imported,
        table_created = result.table_created,
        "{}",
        result.message
    );
    Ok(())
}

async fn run_export_command(args: ExportArgs) -> anyhow::Result<()> {
    let store = SqliteStore::open(&args.db)?;

    let mut options = ExportOptions {
        format: args.format,
        table_name: args.table.clone(),
        query: args.query.clone(),
        delimiter: parse_delimiter(&args.delimiter)?,
        pretty: args.pretty,
        include_schema: args.include_schema,
        sheet_name: args.sheet.clone(),
        progress: Some(Arc::new(LogProgress)),
        ..Default::default()
    };

    if let Some(ref path) = args.profile {
        let profile = ImportProfile::from_file(path)?;
        options.mapping = profile.mapping;
    }

    let mut output = run_export(&store, &options).await;
    if !output.result.success {
        anyhow::bail!("export failed: {}", output.result.message);
    }

    fs::write(&args.output, &output.bytes)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    output.result.file_path = Some(args.output.clone());

    tracing::info!(
        rows = output.result.rows_exported,
        bytes = output.bytes.len(),
        path = %args.output.display(),
        "{}",
        output.result.message
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
    }

    #[test]
    fn test_cli_parses_import() {
        let cli = Cli::try_parse_from([
            "flatsync",
            "import",
            "people.csv",
            "--db",
            "app.db",
            "--table",
            "people",
            "--create-table",
        ])
        .unwrap();
        match cli.command {
            Commands::Import { args } => {
                assert_eq!(args.input, PathBuf::from("people.csv"));
                assert_eq!(args.table.as_deref(), Some("people"));
                assert!(args.create_table);
                assert_eq!(args.batch_size, 1000);
                assert_eq!(args.format, DataFormat::DelimitedText);
            }
            _ => panic!("expected import command"),
        }
    }

    #[test]
    fn test_cli_parses_export() {
        let cli = Cli::try_parse_from([
            "flatsync",
            "export",
            "--db",
            "app.db",
            "--output",
            "out.json",
            "--format",
            "structured-record",
            "--pretty",
        ])
        .unwrap();
        match cli.command {
            Commands::Export { args } => {
                assert_eq!(args.output, PathBuf::from("out.json"));
                assert_eq!(args.format, DataFormat::StructuredRecord);
                assert!(args.pretty);
                assert!(args.table.is_none());
            }
            _ => panic!("expected export command"),
        }
    }
}
