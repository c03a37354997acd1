//! Streaming import: delimited text from a reader, bounded memory.
//!
//! The buffered path materializes the whole record set before writing; this
//! path consumes the reader incrementally and never holds more than one
//! batch of records. Validation runs per record with uniqueness tracked
//! across the stream, and the schema, when provisioning is requested, is
//! inferred from the first batch only. Total row count is unknown until the
//! stream ends, so processing snapshots carry a zero total.

use std::io::Read;

use flatsync_core::{
    DataStore, EngineError, EngineResult, ImportResult, ProgressInfo, Record, Value,
};
use tracing::{debug, info, warn};

use crate::format::{self, DataFormat};
use crate::import::{
    build_insert, check_cancelled, finalize, report, target_table, ImportOptions, RunState,
};
use crate::validate::Validator;
use crate::{infer, map, provision};

/// Run a streaming import from a reader.
///
/// Only the delimited-text format streams; other formats need the whole
/// payload to parse and belong on [`run_import`](crate::import::run_import).
/// Like the buffered path, this never returns an error: failures fold into
/// a failed [`ImportResult`].
pub async fn run_stream_import<R>(
    store: &dyn DataStore,
    reader: R,
    options: &ImportOptions,
) -> ImportResult
where
    R: Read + Send,
{
    info!(dry_run = options.dry_run, "starting streaming import");

    let mut state = RunState::default();
    let outcome = stream_inner(store, reader, options, &mut state).await;
    if outcome.is_ok() {
        // the stream has ended, so the final snapshot carries the real total
        state.total = state.processed;
    }
    finalize(state, options, outcome)
}

async fn stream_inner<R>(
    store: &dyn DataStore,
    reader: R,
    options: &ImportOptions,
    state: &mut RunState,
) -> EngineResult<()>
where
    R: Read + Send,
{
    format::check_encoding(&options.encoding)?;
    if options.format != DataFormat::DelimitedText {
        return Err(EngineError::Format(format!(
            "streaming import supports only delimited text, not {}",
            options.format
        )));
    }

    let table = target_table(options.mapping.as_ref(), options.table_name.as_deref())?;

    if !options.create_table {
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

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::Format(format!("malformed delimited text: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let validator = Validator::compile(&options.validation)?;
    let mut seen = validator.tracker();

    let batch_size = options.batch_size.max(1);
    let mut batch: Vec<Record> = Vec::with_capacity(batch_size);
    let mut columns: Option<Vec<String>> = None;
    let mut statement = String::new();
    let mut skipped = 0usize;
    let mut row_number = 0u64;

    for row in reader.records() {
        let row = row.map_err(|e| EngineError::Format(format!("malformed delimited text: {e}")))?;
        if skipped < options.skip_rows {
            skipped += 1;
            continue;
        }
        row_number += 1;

        let mut record = Record::with_capacity(headers.len());
        for (idx, name) in headers.iter().enumerate() {
            record.push(
                name.clone(),
                Value::Text(row.get(idx).unwrap_or("").to_string()),
            );
        }

        let record = match &options.mapping {
            Some(mapping) => map::apply_to_record(record, mapping),
            None => record,
        };
        let record = match &options.transform {
            Some(transform) => transform(record),
            None => record,
        };

        if let Err(message) = validator.validate_record(&record, &mut seen) {
            let message = format!("row {row_number}: {message}");
            if options.continue_on_error {
                state.warnings.push(message);
                continue;
            }
            return Err(EngineError::Validation(message));
        }

        batch.push(record);
        if batch.len() >= batch_size {
            flush_batch(
                store,
                options,
                state,
                &table,
                &mut columns,
                &mut statement,
                &mut batch,
            )
            .await?;
        }
    }

    if !batch.is_empty() {
        flush_batch(
            store,
            options,
            state,
            &table,
            &mut columns,
            &mut statement,
            &mut batch,
        )
        .await?;
    }

    if options.create_table && columns.is_none() {
        return Err(EngineError::Schema(
            "cannot infer a schema from an empty record set".to_string(),
        ));
    }
    if !state.warnings.is_empty() {
        warn!(dropped = state.warnings.len(), "records dropped by validation");
    }

    state.message = if options.dry_run {
        format!(
            "dry run: validated {} streamed rows for {table}",
            state.rows_imported
        )
    } else {
        format!("imported {} streamed rows into {table}", state.rows_imported)
    };
    Ok(())
}

async fn flush_batch(
    store: &dyn DataStore,
    options: &ImportOptions,
    state: &mut RunState,
    table: &str,
    columns: &mut Option<Vec<String>>,
    statement: &mut String,
    batch: &mut Vec<Record>,
) -> EngineResult<()> {
    if batch.is_empty() {
        return Ok(());
    }
    check_cancelled(options)?;

    // the first batch fixes the column set and, when provisioning, supplies
    // the inference sample
    let first_flush = columns.is_none();
    if first_flush && options.create_table {
        let schema = infer::infer_schema(batch);
        if options.dry_run {
            debug!(table, "dry run, skipping table provisioning");
        } else {
            provision::provision_table(store, table, &schema, options.mapping.as_ref()).await?;
            state.table_created = true;
        }
    }
    let columns = columns.get_or_insert_with(|| batch[0].columns().map(str::to_string).collect());
    if first_flush {
        *statement = build_insert(table, columns);
    }

    let rows: Vec<Vec<Value>> = batch.iter().map(|r| r.project(columns)).collect();
    let batch_start = state.processed;
    if options.dry_run {
        debug!(rows = rows.len(), "dry run, skipping batch write");
        state.rows_imported += rows.len() as u64;
    } else {
        let outcome = store
            .write_batch(statement, &rows, options.continue_on_error)
            .await?;
        state.rows_imported += outcome.rows_written;
        for row_error in outcome.row_errors {
            state.errors.push(format!(
                "row {}: {}",
                batch_start + row_error.row as u64 + 1,
                row_error.message
            ));
        }
    }

    state.processed += batch.len() as u64;
    report(options, &ProgressInfo::processing(0, state.processed));
    debug!(processed = state.processed, "batch done");
    batch.clear();
    Ok(())
}
