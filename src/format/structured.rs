//! Structured-record (JSON) parsing and encoding.

use crate::infer::ColumnType;
use flatsync_core::{EngineError, EngineResult, Record, Value};

/// Wrapper keys probed, in order, when the top level is an object.
const WRAPPER_KEYS: [&str; 4] = ["data", "records", "rows", "items"];

/// Parse a structured payload into records.
///
/// Accepted shapes: a top-level array of objects, a wrapper object holding
/// a named record array (one of the well-known keys, or a sole array-valued
/// key), or a single bare object treated as one record. Anything else is a
/// format error.
pub fn parse(text: &str) -> EngineResult<Vec<Record>> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| EngineError::Format(format!("invalid structured payload: {e}")))?;

    match value {
        serde_json::Value::Array(items) => records_from_array(items),
        serde_json::Value::Object(mut map) => {
            for key in WRAPPER_KEYS {
                match map.remove(key) {
                    Some(serde_json::Value::Array(items)) => return records_from_array(items),
                    Some(other) => {
                        map.insert(key.to_string(), other);
                    }
                    None => {}
                }
            }

            // a wrapper with one array-valued field of any name
            if map.len() == 1 && map.values().next().map(|v| v.is_array()).unwrap_or(false) {
                let items = match map.into_iter().next() {
                    Some((_, serde_json::Value::Array(items))) => items,
                    _ => Vec::new(),
                };
                return records_from_array(items);
            }

            Ok(vec![record_from_object(&map)])
        }
        other => Err(EngineError::Format(format!(
            "structured payload must be an object or an array of objects, got {}",
            json_kind(&other)
        ))),
    }
}

fn records_from_array(items: Vec<serde_json::Value>) -> EngineResult<Vec<Record>> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            serde_json::Value::Object(map) => Ok(record_from_object(map)),
            other => Err(EngineError::Format(format!(
                "structured payload: element {idx} is {}, expected an object",
                json_kind(other)
            ))),
        })
        .collect()
}

fn record_from_object(map: &serde_json::Map<String, serde_json::Value>) -> Record {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Encode records as a JSON array of objects.
pub fn encode(records: &[Record], pretty: bool) -> EngineResult<String> {
    let doc = serde_json::Value::Array(records.iter().map(record_to_object).collect());
    to_string(&doc, pretty)
}

/// Encode records wrapped in a schema envelope.
///
/// The envelope carries the inferred column types and an export timestamp
/// alongside the rows:
/// `{"schema": {"columns": [...]}, "exported_at": ..., "data": [...]}`.
pub fn encode_with_schema(
    records: &[Record],
    schema: &[(String, ColumnType)],
    pretty: bool,
) -> EngineResult<String> {
    let columns: Vec<serde_json::Value> = schema
        .iter()
        .map(|(name, column_type)| {
            serde_json::json!({ "name": name, "type": column_type.as_sql() })
        })
        .collect();

    let doc = serde_json::json!({
        "schema": { "columns": columns },
        "exported_at": chrono::Utc::now().to_rfc3339(),
        "data": records.iter().map(record_to_object).collect::<Vec<_>>(),
    });
    to_string(&doc, pretty)
}

fn record_to_object(record: &Record) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = record
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_json()))
        .collect();
    serde_json::Value::Object(map)
}

fn to_string(doc: &serde_json::Value, pretty: bool) -> EngineResult<String> {
    let result = if pretty {
        serde_json::to_string_pretty(doc)
    } else {
        serde_json::to_string(doc)
    };
    result.map_err(|e| EngineError::Format(format!("failed to encode structured output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top_level_array() {
        let records = parse(r#"[{"a": 1}, {"a": 2}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("a"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_parse_wrapper_object() {
        let records = parse(r#"{"data": [{"a": 1}, {"a": 2}]}"#).unwrap();
        assert_eq!(records.len(), 2);

        let records = parse(r#"{"rows": [{"x": "y"}]}"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_sole_array_key_wrapper() {
        let records = parse(r#"{"people": [{"a": 1}]}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("a"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_parse_bare_object_is_one_record() {
        let records = parse(r#"{"a": 1, "b": "x"}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("b"), Some(&Value::Text("x".to_string())));
    }

    #[test]
    fn test_parse_non_array_wrapper_key_treated_as_record() {
        // "data" is present but not an array, so the object is one record
        let records = parse(r#"{"data": 5, "note": "x"}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("data"), Some(&Value::Integer(5)));
    }

    #[test]
    fn test_parse_scalar_top_level_fails() {
        let err = parse("42").unwrap_err();
        assert!(matches!(err, EngineError::Format(_)));
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn test_parse_array_of_scalars_fails() {
        let err = parse("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("element 0"));
    }

    #[test]
    fn test_parse_value_typing() {
        let records =
            parse(r#"[{"i": 3, "r": 0.5, "b": true, "s": "x", "n": null, "o": {"k": 1}}]"#)
                .unwrap();
        let record = &records[0];
        assert_eq!(record.get("i"), Some(&Value::Integer(3)));
        assert_eq!(record.get("r"), Some(&Value::Real(0.5)));
        assert_eq!(record.get("b"), Some(&Value::Integer(1)));
        assert_eq!(record.get("s"), Some(&Value::Text("x".to_string())));
        assert_eq!(record.get("n"), Some(&Value::Null));
        assert_eq!(record.get("o"), Some(&Value::Text(r#"{"k":1}"#.to_string())));
    }

    #[test]
    fn test_encode_compact_and_pretty() {
        let mut record = Record::new();
        record.push("a", Value::Integer(1));

        let compact = encode(std::slice::from_ref(&record), false).unwrap();
        assert_eq!(compact, r#"[{"a":1}]"#);

        let pretty = encode(&[record], true).unwrap();
        assert!(pretty.contains('\n'));
        assert!(pretty.contains("\"a\": 1"));
    }

    #[test]
    fn test_encode_with_schema_envelope() {
        let mut record = Record::new();
        record.push("id", Value::Integer(1));
        let schema = vec![("id".to_string(), ColumnType::Integer)];

        let out = encode_with_schema(&[record], &schema, false).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["schema"]["columns"][0]["name"], "id");
        assert_eq!(doc["schema"]["columns"][0]["type"], "INTEGER");
        assert_eq!(doc["data"][0]["id"], 1);
        assert!(doc["exported_at"].is_string());
    }

    #[test]
    fn test_encode_round_trips_through_parse() {
        let mut record = Record::new();
        record.push("a", Value::Integer(1));
        record.push("b", Value::Null);
        let out = encode(&[record.clone()], false).unwrap();
        let back = parse(&out).unwrap();
        assert_eq!(back, vec![record]);
    }
}
