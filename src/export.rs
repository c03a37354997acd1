//! Export: fetch from the store, map columns, encode into a payload.

use std::sync::Arc;

use flatsync_core::{
    DataStore, EngineError, EngineResult, ExportResult, ProgressInfo, ProgressSink, Record,
    TableMapping, Value,
};
use tracing::{info, warn};

use crate::format::statement::quote_identifier;
use crate::format::{delimited, sheet, statement, structured, DataFormat, SheetCodec};
use crate::{infer, map, provision};

/// Configuration for one export run.
pub struct ExportOptions {
    /// Output format
    pub format: DataFormat,

    /// Source table, read with a full scan; ignored when `query` is set
    pub table_name: Option<String>,

    /// Caller-supplied read query, overriding `table_name`
    pub query: Option<String>,

    /// Field delimiter for delimited text
    pub delimiter: u8,

    /// Pretty-print structured output
    pub pretty: bool,

    /// Wrap structured output in a schema envelope, or prepend a
    /// create-table statement to raw-statement output
    pub include_schema: bool,

    /// Column renames applied to fetched records
    pub mapping: Option<TableMapping>,

    /// Sheet name for spreadsheet output; `Sheet1` when absent
    pub sheet_name: Option<String>,

    /// Progress sink, called once with the terminal snapshot
    pub progress: Option<Arc<dyn ProgressSink>>,

    /// Codec for spreadsheet output
    pub sheet_codec: Option<Arc<dyn SheetCodec>>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: DataFormat::DelimitedText,
            table_name: None,
            query: None,
            delimiter: b',',
            pretty: false,
            include_schema: false,
            mapping: None,
            sheet_name: None,
            progress: None,
            sheet_codec: None,
        }
    }
}

/// An export's terminal result plus the encoded payload.
///
/// The engine returns the full output buffer; writing it somewhere and
/// recording `file_path` on the result is the front-end's job.
pub struct ExportOutput {
    pub result: ExportResult,
    pub bytes: Vec<u8>,
}

/// Run an export.
///
/// Never returns an error: failures fold into a failed [`ExportResult`]
/// with an empty payload, and a single terminal progress snapshot mirrors
/// the outcome.
pub async fn run_export(store: &dyn DataStore, options: &ExportOptions) -> ExportOutput {
    info!(format = %options.format, "starting export");

    match export_inner(store, options).await {
        Ok((bytes, rows)) => {
            report(options, &ProgressInfo::completed(rows));
            info!(rows, bytes = bytes.len(), "export finished");
            ExportOutput {
                result: ExportResult {
                    success: true,
                    message: format!("exported {rows} rows as {}", options.format),
                    rows_exported: rows,
                    file_path: None,
                },
                bytes,
            }
        }
        Err(e) => {
            let message = e.to_string();
            report(options, &ProgressInfo::failed(0, 0, message.as_str()));
            warn!(error = %message, "export failed");
            ExportOutput {
                result: ExportResult::failed(message),
                bytes: Vec::new(),
            }
        }
    }
}

async fn export_inner(
    store: &dyn DataStore,
    options: &ExportOptions,
) -> EngineResult<(Vec<u8>, u64)> {
    let (records, rows) = fetch(store, options).await?;

    let records = match &options.mapping {
        Some(mapping) => map::apply_mapping(records, mapping),
        None => records,
    };

    let bytes = match options.format {
        DataFormat::DelimitedText => delimited::encode(&records, options.delimiter)?.into_bytes(),
        DataFormat::StructuredRecord => {
            if options.include_schema {
                let schema = infer::infer_schema(&records);
                structured::encode_with_schema(&records, &schema, options.pretty)?.into_bytes()
            } else {
                structured::encode(&records, options.pretty)?.into_bytes()
            }
        }
        DataFormat::RawStatement => {
            let table = statement_table(options);
            let mut sql = String::new();
            if options.include_schema {
                let schema = infer::infer_schema(&records);
                sql.push_str(&provision::create_table_sql(
                    &table,
                    &schema,
                    options.mapping.as_ref(),
                ));
                sql.push_str(";\n");
            }
            sql.push_str(&statement::encode(&table, &records));
            sql.into_bytes()
        }
        DataFormat::Spreadsheet => {
            let codec = options.sheet_codec.as_deref().ok_or_else(|| {
                EngineError::Format(
                    "spreadsheet format requires a registered sheet codec".to_string(),
                )
            })?;
            let sheet = options.sheet_name.as_deref().unwrap_or(sheet::DEFAULT_SHEET);
            codec.encode(sheet, &records)?
        }
    };

    Ok((bytes, rows))
}

/// Fetch the source records and, separately, the row count for the summary.
///
/// The count comes from a second query (a COUNT for table sources, a second
/// fetch for custom queries) rather than from the record set in hand.
async fn fetch(
    store: &dyn DataStore,
    options: &ExportOptions,
) -> EngineResult<(Vec<Record>, u64)> {
    if let Some(query) = &options.query {
        let records = store.all(query, &[]).await?;
        let rows = store.all(query, &[]).await?.len() as u64;
        return Ok((records, rows));
    }

    if let Some(table) = &options.table_name {
        if !store.table_exists(table).await? {
            return Err(EngineError::Schema(format!("table {table} does not exist")));
        }
        let quoted = quote_identifier(table);
        let records = store
            .all(&format!("SELECT * FROM {quoted}"), &[])
            .await?;
        let rows = store
            .get(&format!("SELECT COUNT(*) AS n FROM {quoted}"), &[])
            .await?
            .and_then(|row| row.get("n").and_then(Value::as_integer))
            .map(|n| n as u64)
            .unwrap_or(records.len() as u64);
        return Ok((records, rows));
    }

    Err(EngineError::Schema(
        "export needs a table name or a query".to_string(),
    ))
}

/// Table name spelled into generated insert statements.
fn statement_table(options: &ExportOptions) -> String {
    if let Some(mapping) = &options.mapping {
        if !mapping.target_table.is_empty() {
            return mapping.target_table.clone();
        }
    }
    options
        .table_name
        .clone()
        .unwrap_or_else(|| "data".to_string())
}

fn report(options: &ExportOptions, progress: &ProgressInfo) {
    if let Some(sink) = &options.progress {
        sink.report(progress);
    }
}
