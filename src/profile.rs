//! Import profile files: a mapping and validation rules bundled for CLI use.

use std::path::Path;

use anyhow::Context;
use flatsync_core::{TableMapping, ValidationRule};
use serde::{Deserialize, Serialize};

/// Profile contents, loaded from YAML (JSON parses too, being a subset).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportProfile {
    /// Column renames and key declarations
    #[serde(default)]
    pub mapping: Option<TableMapping>,

    /// Validation rules
    #[serde(default)]
    pub validation: Vec<ValidationRule>,
}

impl ImportProfile {
    /// Load a profile from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("failed to parse profile {}", path.display()))
    }

    /// Parse a profile from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}
