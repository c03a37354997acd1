//! Column type inference for table provisioning.

use flatsync_core::{Record, Value};

/// Non-blank samples examined per column before settling on a type.
const MAX_SAMPLES: usize = 100;

/// Storage type a column is provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// SQL type name used in generated DDL.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

/// Infer a schema from parsed records.
///
/// Columns appear in first-seen order across the whole record set, so
/// records with differing shapes contribute the union of their columns.
/// Each column's type comes from sampling its values: all-integer samples
/// give INTEGER, all-numeric give REAL, all-boolean-like give INTEGER
/// (stored as 0/1), anything else gives TEXT. Blank values are skipped
/// while sampling; a column with no non-blank samples falls back to TEXT.
pub fn infer_schema(records: &[Record]) -> Vec<(String, ColumnType)> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for name in record.columns() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }

    columns
        .into_iter()
        .map(|name| {
            let column_type = infer_column(records, &name);
            (name, column_type)
        })
        .collect()
}

fn infer_column(records: &[Record], column: &str) -> ColumnType {
    let samples: Vec<&Value> = records
        .iter()
        .filter_map(|record| record.get(column))
        .filter(|value| !value.is_blank())
        .take(MAX_SAMPLES)
        .collect();

    if samples.is_empty() {
        return ColumnType::Text;
    }
    if samples.iter().all(|v| is_integer_like(v)) {
        return ColumnType::Integer;
    }
    if samples.iter().all(|v| is_real_like(v)) {
        return ColumnType::Real;
    }
    if samples.iter().all(|v| is_boolean_like(v)) {
        return ColumnType::Integer;
    }
    ColumnType::Text
}

fn is_integer_like(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Text(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_real_like(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Real(r) => r.is_finite(),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(|r| r.is_finite())
            .unwrap_or(false),
        _ => false,
    }
}

fn is_boolean_like(value: &Value) -> bool {
    match value {
        Value::Integer(0) | Value::Integer(1) => true,
        Value::Text(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "false" | "0" | "1"
        ),
        _ => false,
    }
}
