//! Delimited-text parsing and encoding.
//!
//! The parser is quote-aware throughout: doubled quotes unescape inside
//! quoted fields and a quoted field may span an embedded newline. The first
//! row supplies column names; data rows align to them positionally, with
//! missing trailing values becoming empty text and surplus values dropped.

use flatsync_core::{EngineError, EngineResult, Record, Value};

fn parse_err(e: csv::Error) -> EngineError {
    EngineError::Format(format!("malformed delimited text: {e}"))
}

/// Parse delimited text into records using its header row.
pub fn parse(text: &str, delimiter: u8) -> EngineResult<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(parse_err)?;
        let mut record = Record::with_capacity(headers.len());
        for (idx, name) in headers.iter().enumerate() {
            let cell = row.get(idx).unwrap_or("");
            record.push(name.clone(), Value::Text(cell.to_string()));
        }
        records.push(record);
    }
    Ok(records)
}

/// Encode records as delimited text.
///
/// The header comes from the first record's columns; every row is written
/// positionally against it. Values are quoted when they contain the
/// delimiter, a quote, or a newline, with embedded quotes doubled. Zero
/// records encode to an empty body.
pub fn encode(records: &[Record], delimiter: u8) -> EngineResult<String> {
    let Some(first) = records.first() else {
        return Ok(String::new());
    };
    let columns: Vec<String> = first.columns().map(str::to_string).collect();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(&columns)
        .map_err(|e| EngineError::Format(format!("failed to encode delimited text: {e}")))?;

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|c| record.get(c).map(Value::to_string).unwrap_or_default())
            .collect();
        writer
            .write_record(&row)
            .map_err(|e| EngineError::Format(format!("failed to encode delimited text: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| EngineError::Format(format!("failed to encode delimited text: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| EngineError::Format(format!("failed to encode delimited text: {e}")))
}
