//! The buffered import pipeline: parse, map, validate, provision, write.

use std::sync::Arc;

use flatsync_core::{
    CancelToken, DataStore, EngineError, EngineResult, ImportResult, ProgressInfo, ProgressSink,
    Record, TableMapping, ValidationRule, Value,
};
use tracing::{debug, info, warn};

use crate::format::statement::quote_identifier;
use crate::format::{self, DataFormat, ParsedPayload, SheetCodec};
use crate::validate::Validator;
use crate::{infer, map, provision};

/// Caller-supplied per-record hook, applied after column mapping and before
/// validation.
pub type RecordTransform = Box<dyn Fn(Record) -> Record + Send + Sync>;

/// Configuration for one import run.
pub struct ImportOptions {
    /// Payload format
    pub format: DataFormat,

    /// Destination table; a mapping's `target_table` takes precedence
    pub table_name: Option<String>,

    /// Records per transaction
    pub batch_size: usize,

    /// Data rows to discard after parsing (header rows are never counted)
    pub skip_rows: usize,

    /// Field delimiter for delimited text
    pub delimiter: u8,

    /// Declared payload encoding; only UTF-8 is supported
    pub encoding: String,

    /// Provision the destination table (unconditional drop, then create
    /// from the inferred schema)
    pub create_table: bool,

    /// Drop the destination table before writing. Without `create_table`
    /// the run then fails its table existence check, so this is normally
    /// combined with it.
    pub drop_table: bool,

    /// Column renames and key declarations
    pub mapping: Option<TableMapping>,

    /// Validation rules, applied before any write
    pub validation: Vec<ValidationRule>,

    /// Drop failing records (validation) and failing rows (write) instead
    /// of aborting
    pub continue_on_error: bool,

    /// Parse, map, and validate only; no statement reaches the store.
    /// Counts are reported as if written.
    pub dry_run: bool,

    /// Sheet to read for spreadsheet payloads; the codec's first sheet
    /// when absent
    pub sheet_name: Option<String>,

    /// Per-record hook, run after mapping
    pub transform: Option<RecordTransform>,

    /// Progress sink, called once per batch and once at the end
    pub progress: Option<Arc<dyn ProgressSink>>,

    /// Cooperative cancellation, checked between batches
    pub cancel: Option<CancelToken>,

    /// Codec for spreadsheet payloads
    pub sheet_codec: Option<Arc<dyn SheetCodec>>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            format: DataFormat::DelimitedText,
            table_name: None,
            batch_size: 1000,
            skip_rows: 0,
            delimiter: b',',
            encoding: "utf8".to_string(),
            create_table: false,
            drop_table: false,
            mapping: None,
            validation: Vec::new(),
            continue_on_error: false,
            dry_run: false,
            sheet_name: None,
            transform: None,
            progress: None,
            cancel: None,
            sheet_codec: None,
        }
    }
}

/// Mutable run bookkeeping, shared by the buffered and streaming paths.
///
/// Kept separate from the fallible pipeline so that an abort still reports
/// whatever was committed before it.
#[derive(Default)]
pub(crate) struct RunState {
    pub(crate) total: u64,
    pub(crate) processed: u64,
    pub(crate) rows_imported: u64,
    pub(crate) table_created: bool,
    pub(crate) errors: Vec<String>,
    pub(crate) warnings: Vec<String>,
    pub(crate) message: String,
}

/// Run a buffered import.
///
/// Never returns an error: failures fold into a failed [`ImportResult`]
/// carrying whatever was committed before the abort, and the final progress
/// snapshot mirrors the outcome.
pub async fn run_import(
    store: &dyn DataStore,
    payload: &[u8],
    options: &ImportOptions,
) -> ImportResult {
    info!(
        format = %options.format,
        bytes = payload.len(),
        dry_run = options.dry_run,
        "starting import"
    );

    let mut state = RunState::default();
    let outcome = import_inner(store, payload, options, &mut state).await;
    finalize(state, options, outcome)
}

/// Fold a pipeline outcome and its accumulated state into the terminal
/// result, emitting the final progress snapshot.
pub(crate) fn finalize(
    state: RunState,
    options: &ImportOptions,
    outcome: EngineResult<()>,
) -> ImportResult {
    match outcome {
        Ok(()) => {
            report(options, &ProgressInfo::completed(state.total));
            info!(
                rows = state.rows_imported,
                table_created = state.table_created,
                "import finished"
            );
            ImportResult {
                success: true,
                message: state.message,
                rows_imported: state.rows_imported,
                table_created: state.table_created,
                errors: state.errors,
                warnings: state.warnings,
            }
        }
        Err(e) => {
            let message = e.to_string();
            report(
                options,
                &ProgressInfo::failed(state.total, state.processed, message.as_str()),
            );
            warn!(error = %message, rows = state.rows_imported, "import failed");
            ImportResult {
                success: false,
                message,
                rows_imported: state.rows_imported,
                table_created: state.table_created,
                errors: state.errors,
                warnings: state.warnings,
            }
        }
    }
}

async fn import_inner(
    store: &dyn DataStore,
    payload: &[u8],
    options: &ImportOptions,
    state: &mut RunState,
) -> EngineResult<()> {
    format::check_encoding(&options.encoding)?;

    let parsed = format::parse_payload(
        options.format,
        payload,
        options.delimiter,
        options.sheet_name.as_deref(),
        options.sheet_codec.as_deref(),
    )?;

    let mut records = match parsed {
        ParsedPayload::Statements(sql) => {
            if options.dry_run {
                debug!("dry run, skipping statement batch");
            } else {
                debug!(bytes = sql.len(), "executing statement batch");
                store.exec(&sql).await?;
            }
            state.message = "executed statement batch".to_string();
            return Ok(());
        }
        ParsedPayload::Records(records) => records,
    };
    debug!(records = records.len(), "parsed payload");

    if options.skip_rows > 0 {
        records.drain(..options.skip_rows.min(records.len()));
    }

    if let Some(mapping) = &options.mapping {
        records = map::apply_mapping(records, mapping);
    }
    if let Some(transform) = &options.transform {
        records = records.into_iter().map(|r| transform(r)).collect();
    }

    let validator = Validator::compile(&options.validation)?;
    let validated = validator.run(records, options.continue_on_error)?;
    let records = validated.records;
    state.warnings = validated.warnings;
    if !state.warnings.is_empty() {
        warn!(dropped = state.warnings.len(), "records dropped by validation");
    }
    state.total = records.len() as u64;

    let table = target_table(options.mapping.as_ref(), options.table_name.as_deref())?;

    if options.create_table {
        if records.is_empty() {
            return Err(EngineError::Schema(
                "cannot infer a schema from an empty record set".to_string(),
            ));
        }
        let schema = infer::infer_schema(&records);
        if options.dry_run {
            debug!(table, "dry run, skipping table provisioning");
        } else {
            provision::provision_table(store, &table, &schema, options.mapping.as_ref()).await?;
            state.table_created = true;
        }
    } else {
        if options.drop_table && !options.dry_run {
            store
                .exec(&provision::drop_table_sql(&table))
                .await
                .map_err(|e| EngineError::Schema(format!("failed to drop table {table}: {e}")))?;
        }
        if !store.table_exists(&table).await? {
            return Err(EngineError::Schema(format!(
                "table {table} does not exist (enable create_table to provision it)"
            )));
        }
    }

    if !records.is_empty() {
        let columns: Vec<String> = records[0].columns().map(str::to_string).collect();
        let statement = build_insert(&table, &columns);
        let batch_size = options.batch_size.max(1);

        for (batch_idx, chunk) in records.chunks(batch_size).enumerate() {
            check_cancelled(options)?;

            let rows: Vec<Vec<Value>> = chunk.iter().map(|r| r.project(&columns)).collect();
            if options.dry_run {
                debug!(rows = rows.len(), "dry run, skipping batch write");
                state.rows_imported += rows.len() as u64;
            } else {
                let outcome = store
                    .write_batch(&statement, &rows, options.continue_on_error)
                    .await?;
                state.rows_imported += outcome.rows_written;
                for row_error in outcome.row_errors {
                    state.errors.push(format!(
                        "row {}: {}",
                        batch_idx * batch_size + row_error.row + 1,
                        row_error.message
                    ));
                }
            }

            state.processed += chunk.len() as u64;
            report(
                options,
                &ProgressInfo::processing(state.total, state.processed),
            );
            debug!(
                processed = state.processed,
                total = state.total,
                "batch done"
            );
        }
    }

    state.message = if options.dry_run {
        format!("dry run: validated {} rows for {table}", state.rows_imported)
    } else {
        format!("imported {} rows into {table}", state.rows_imported)
    };
    Ok(())
}

/// Resolve the destination table name. A mapping's non-empty `target_table`
/// wins over the options-level name.
pub(crate) fn target_table(
    mapping: Option<&TableMapping>,
    table_name: Option<&str>,
) -> EngineResult<String> {
    if let Some(mapping) = mapping {
        if !mapping.target_table.is_empty() {
            return Ok(mapping.target_table.clone());
        }
    }
    table_name
        .map(str::to_string)
        .ok_or_else(|| EngineError::Schema("no destination table name given".to_string()))
}

pub(crate) fn build_insert(table: &str, columns: &[String]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

pub(crate) fn report(options: &ImportOptions, progress: &ProgressInfo) {
    if let Some(sink) = &options.progress {
        sink.report(progress);
    }
}

pub(crate) fn check_cancelled(options: &ImportOptions) -> EngineResult<()> {
    match &options.cancel {
        Some(token) if token.is_cancelled() => Err(EngineError::Cancelled),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatsync_sqlite::SqliteStore;

    #[test]
    fn test_default_options() {
        let options = ImportOptions::default();
        assert_eq!(options.batch_size, 1000);
        assert_eq!(options.delimiter, b',');
        assert_eq!(options.encoding, "utf8");
        assert!(!options.create_table);
        assert!(!options.continue_on_error);
    }

    #[test]
    fn test_target_table_precedence() {
        let mapping = TableMapping::new("mapped");
        assert_eq!(
            target_table(Some(&mapping), Some("plain")).unwrap(),
            "mapped"
        );
        assert_eq!(target_table(None, Some("plain")).unwrap(), "plain");
        assert!(matches!(
            target_table(None, None),
            Err(EngineError::Schema(_))
        ));
    }

    #[test]
    fn test_build_insert() {
        let columns = vec!["id".to_string(), "name".to_string()];
        assert_eq!(
            build_insert("people", &columns),
            "INSERT INTO \"people\" (\"id\", \"name\") VALUES (?1, ?2)"
        );
    }

    #[test]
    fn test_statement_batch_reports_zero_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        let options = ImportOptions {
            format: DataFormat::RawStatement,
            ..Default::default()
        };
        let payload = b"CREATE TABLE t (x INTEGER); INSERT INTO t (x) VALUES (7);";

        let result = tokio_test::block_on(run_import(&store, payload, &options));
        assert!(result.success, "{}", result.message);
        assert_eq!(result.rows_imported, 0);

        let row = tokio_test::block_on(store.get("SELECT x FROM t", &[]))
            .unwrap()
            .unwrap();
        assert_eq!(row.get("x"), Some(&Value::Integer(7)));
    }

    #[test]
    fn test_missing_table_without_provisioning() {
        let store = SqliteStore::open_in_memory().unwrap();
        let options = ImportOptions {
            table_name: Some("absent".to_string()),
            ..Default::default()
        };

        let result = tokio_test::block_on(run_import(&store, b"a\n1\n", &options));
        assert!(!result.success);
        assert_eq!(result.rows_imported, 0);
        assert!(result.message.contains("does not exist"));
    }

    #[test]
    fn test_create_table_needs_records() {
        let store = SqliteStore::open_in_memory().unwrap();
        let options = ImportOptions {
            table_name: Some("t".to_string()),
            create_table: true,
            ..Default::default()
        };

        let result = tokio_test::block_on(run_import(&store, b"a,b\n", &options));
        assert!(!result.success);
        assert!(result.message.contains("empty record set"));
    }

    #[test]
    fn test_pre_cancelled_token_writes_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let options = ImportOptions {
            table_name: Some("t".to_string()),
            create_table: true,
            cancel: Some(cancel),
            ..Default::default()
        };

        let result = tokio_test::block_on(run_import(&store, b"a\n1\n2\n", &options));
        assert!(!result.success);
        assert_eq!(result.message, "operation cancelled");
        assert_eq!(result.rows_imported, 0);
    }

    #[test]
    fn test_skip_rows_drops_leading_records() {
        let store = SqliteStore::open_in_memory().unwrap();
        let options = ImportOptions {
            table_name: Some("t".to_string()),
            create_table: true,
            skip_rows: 2,
            ..Default::default()
        };

        let result = tokio_test::block_on(run_import(&store, b"a\n1\n2\n3\n", &options));
        assert!(result.success, "{}", result.message);
        assert_eq!(result.rows_imported, 1);

        let rows = tokio_test::block_on(store.all("SELECT a FROM t", &[])).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), Some(&Value::Integer(3)));
    }
}
