//! Column renaming driven by a [`TableMapping`].

use flatsync_core::{Record, TableMapping};

/// Rename one record's columns.
///
/// Unmapped columns keep their names and order. When two source columns map
/// to the same target the later one wins, leaving a single column.
pub fn apply_to_record(record: Record, mapping: &TableMapping) -> Record {
    if !mapping.renames_columns() {
        return record;
    }

    let mut out = Record::with_capacity(record.len());
    for (name, value) in record.into_entries() {
        out.set(mapping.target_column(&name).to_string(), value);
    }
    out
}

/// Rename columns across a record set.
pub fn apply_mapping(records: Vec<Record>, mapping: &TableMapping) -> Vec<Record> {
    if !mapping.renames_columns() {
        return records;
    }
    records
        .into_iter()
        .map(|record| apply_to_record(record, mapping))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatsync_core::Value;

    #[test]
    fn test_rename_preserves_order() {
        let mut mapping = TableMapping::new("people");
        mapping
            .column_mapping
            .insert("fullName".to_string(), "name".to_string());

        let mut record = Record::new();
        record.push("id", Value::Integer(1));
        record.push("fullName", Value::Text("Alice".to_string()));
        record.push("email", Value::Text("a@b".to_string()));

        let out = apply_to_record(record, &mapping);
        let columns: Vec<&str> = out.columns().collect();
        assert_eq!(columns, vec!["id", "name", "email"]);
        assert_eq!(out.get("name"), Some(&Value::Text("Alice".to_string())));
        assert_eq!(out.get("fullName"), None);
    }

    #[test]
    fn test_colliding_targets_keep_last_value() {
        let mut mapping = TableMapping::new("t");
        mapping
            .column_mapping
            .insert("a".to_string(), "x".to_string());
        mapping
            .column_mapping
            .insert("b".to_string(), "x".to_string());

        let mut record = Record::new();
        record.push("a", Value::Integer(1));
        record.push("b", Value::Integer(2));

        let out = apply_to_record(record, &mapping);
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("x"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_no_renames_is_identity() {
        let mapping = TableMapping::new("t");
        let mut record = Record::new();
        record.push("a", Value::Integer(1));
        let records = apply_mapping(vec![record.clone()], &mapping);
        assert_eq!(records, vec![record]);
    }
}
