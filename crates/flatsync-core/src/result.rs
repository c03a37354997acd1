//! Structured results returned by import and export runs.
//!
//! Public entry points never raise past their boundary: failures fold into
//! these results, and translating them into exit codes or transport
//! responses is the front-end's job.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one import run. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Whether the run completed without a fatal error
    pub success: bool,

    /// Human-readable summary
    pub message: String,

    /// Rows committed to the store across all batches
    pub rows_imported: u64,

    /// Whether the destination table was provisioned by this run
    pub table_created: bool,

    /// Per-row write errors collected under continue-on-error
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    /// Validation messages for rows dropped under continue-on-error
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ImportResult {
    /// A failed result with zero rows affected.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            rows_imported: 0,
            table_created: false,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Outcome of one export run. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    /// Whether the run completed without a fatal error
    pub success: bool,

    /// Human-readable summary
    pub message: String,

    /// Rows present in the encoded output
    pub rows_exported: u64,

    /// Where the front-end wrote the output, once it has
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl ExportResult {
    /// A failed result with zero rows exported.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            rows_exported: 0,
            file_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_import_result() {
        let r = ImportResult::failed("schema error: no table");
        assert!(!r.success);
        assert_eq!(r.rows_imported, 0);
        assert!(!r.table_created);
    }

    #[test]
    fn test_empty_lists_skipped_in_serialization() {
        let r = ImportResult {
            success: true,
            message: "done".to_string(),
            rows_imported: 3,
            table_created: true,
            errors: Vec::new(),
            warnings: vec!["row 2: out of range".to_string()],
        };
        let raw = serde_json::to_string(&r).unwrap();
        assert!(!raw.contains("errors"));
        assert!(raw.contains("warnings"));
    }
}
