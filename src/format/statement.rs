//! Raw SQL statement encoding.

use flatsync_core::{Record, Value};

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a value as a SQL literal.
///
/// Text is single-quoted with embedded quotes doubled, blobs become `X'..'`
/// hex literals, and non-finite reals degrade to NULL (they have no literal
/// form).
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) if r.is_finite() => r.to_string(),
        Value::Real(_) => "NULL".to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}

/// Encode records as one INSERT statement per record, newline-terminated.
///
/// Each record carries its own column list, so rows with differing shapes
/// produce differing statements. Zero records produce an empty string.
pub fn encode(table: &str, records: &[Record]) -> String {
    let quoted_table = quote_identifier(table);
    let mut out = String::new();
    for record in records {
        let columns: Vec<String> = record.columns().map(quote_identifier).collect();
        let values: Vec<String> = record.iter().map(|(_, v)| literal(v)).collect();
        out.push_str(&format!(
            "INSERT INTO {} ({}) VALUES ({});\n",
            quoted_table,
            columns.join(", "),
            values.join(", ")
        ));
    }
    out
}
