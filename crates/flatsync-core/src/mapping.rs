//! Table and column mapping configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reference to a column in another table, for foreign key declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced table
    pub table: String,

    /// Referenced column
    pub column: String,
}

impl ForeignKeyRef {
    /// Create a new foreign key reference.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Rename/reshape instructions for one import or export operation.
///
/// A mapping is caller-owned and immutable for the duration of a run. Column
/// renames apply to the columns they name; unmapped columns pass through
/// unchanged. Key declarations only take effect when the destination table is
/// provisioned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMapping {
    /// Source table name (informational; exports read from `target_table`
    /// or the caller's query)
    #[serde(default)]
    pub source_table: Option<String>,

    /// Destination table name. Takes precedence over the options-level
    /// table name when both are set.
    pub target_table: String,

    /// Source column name to target column name
    #[serde(default)]
    pub column_mapping: HashMap<String, String>,

    /// Primary key column list, applied when provisioning
    #[serde(default)]
    pub primary_key: Vec<String>,

    /// Foreign keys by column, applied when provisioning
    #[serde(default)]
    pub foreign_keys: HashMap<String, ForeignKeyRef>,
}

impl TableMapping {
    /// Create a mapping that only names the destination table.
    pub fn new(target_table: impl Into<String>) -> Self {
        Self {
            target_table: target_table.into(),
            ..Self::default()
        }
    }

    /// Resolve a source column name to its target name.
    pub fn target_column<'a>(&'a self, source: &'a str) -> &'a str {
        self.column_mapping
            .get(source)
            .map(String::as_str)
            .unwrap_or(source)
    }

    /// Whether this mapping renames any columns.
    pub fn renames_columns(&self) -> bool {
        !self.column_mapping.is_empty()
    }
}
