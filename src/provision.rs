//! Table provisioning: generated DDL and the drop-then-create flow.

use flatsync_core::{DataStore, EngineError, EngineResult, TableMapping};
use tracing::info;

use crate::format::statement::quote_identifier;
use crate::infer::ColumnType;

/// DDL that drops a table if it exists.
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(table))
}

/// DDL that creates a table from an inferred schema.
///
/// A mapping can contribute a primary key and foreign keys. Either is
/// emitted only when every column it names is present in the schema, so a
/// mapping written for a wider data set degrades to plain columns instead
/// of producing DDL the store would reject.
pub fn create_table_sql(
    table: &str,
    schema: &[(String, ColumnType)],
    mapping: Option<&TableMapping>,
) -> String {
    let mut parts: Vec<String> = schema
        .iter()
        .map(|(name, column_type)| {
            format!("{} {}", quote_identifier(name), column_type.as_sql())
        })
        .collect();

    let has_column = |name: &str| schema.iter().any(|(n, _)| n == name);

    if let Some(mapping) = mapping {
        if !mapping.primary_key.is_empty()
            && mapping.primary_key.iter().all(|c| has_column(c))
        {
            let keys: Vec<String> = mapping
                .primary_key
                .iter()
                .map(|c| quote_identifier(c))
                .collect();
            parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        let mut fk_columns: Vec<&String> = mapping
            .foreign_keys
            .keys()
            .filter(|c| has_column(c))
            .collect();
        fk_columns.sort();
        for column in fk_columns {
            if let Some(reference) = mapping.foreign_keys.get(column) {
                parts.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    quote_identifier(column),
                    quote_identifier(&reference.table),
                    quote_identifier(&reference.column)
                ));
            }
        }
    }

    format!(
        "CREATE TABLE {} ({})",
        quote_identifier(table),
        parts.join(", ")
    )
}

/// Drop and recreate a table from an inferred schema.
///
/// Provisioning is unconditional: an existing table of the same name is
/// replaced, so re-running an import converges on the payload's schema.
pub async fn provision_table(
    store: &dyn DataStore,
    table: &str,
    schema: &[(String, ColumnType)],
    mapping: Option<&TableMapping>,
) -> EngineResult<()> {
    store
        .exec(&drop_table_sql(table))
        .await
        .map_err(|e| EngineError::Schema(format!("failed to drop table {table}: {e}")))?;

    let ddl = create_table_sql(table, schema, mapping);
    info!(table, columns = schema.len(), "creating table");
    store
        .exec(&ddl)
        .await
        .map_err(|e| EngineError::Schema(format!("failed to create table {table}: {e}")))?;
    Ok(())
}
