//! Declarative per-column validation rules.
//!
//! A list of [`ValidationRule`]s forms the validator's program. The rule
//! grammar is serde-driven so rule sets can live in profile files next to
//! the mapping they accompany.

use serde::{Deserialize, Serialize};

/// Rule parameters, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuleKind {
    /// Value must be present: null and empty text fail.
    Required,

    /// Value must not repeat within the import set for this column.
    /// Comparison is by text rendering; blank values are exempt.
    Unique,

    /// Non-null values must match a regular expression.
    Pattern {
        /// Regular expression applied to the value's text rendering
        pattern: String,
    },

    /// Non-blank values must coerce to a number within `[min, max]`.
    Range {
        /// Lower bound (inclusive); unbounded when absent
        #[serde(default)]
        min: Option<f64>,
        /// Upper bound (inclusive); unbounded when absent
        #[serde(default)]
        max: Option<f64>,
    },

    /// Non-blank values must render to a member of the allowed set.
    Enum {
        /// Allowed values, compared by text rendering
        values: Vec<serde_json::Value>,
    },
}

impl RuleKind {
    /// Name of the rule kind, as spelled in rule files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Unique => "unique",
            Self::Pattern { .. } => "pattern",
            Self::Range { .. } => "range",
            Self::Enum { .. } => "enum",
        }
    }
}

/// One validation rule bound to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Column the rule applies to
    pub column: String,

    /// Rule kind and parameters
    #[serde(flatten)]
    pub kind: RuleKind,

    /// Custom failure message, replacing the default
    #[serde(default)]
    pub message: Option<String>,
}

impl ValidationRule {
    /// Create a `required` rule.
    pub fn required(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            kind: RuleKind::Required,
            message: None,
        }
    }

    /// Create a `unique` rule.
    pub fn unique(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            kind: RuleKind::Unique,
            message: None,
        }
    }

    /// Create a `pattern` rule.
    pub fn pattern(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            kind: RuleKind::Pattern {
                pattern: pattern.into(),
            },
            message: None,
        }
    }

    /// Create a `range` rule.
    pub fn range(column: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            column: column.into(),
            kind: RuleKind::Range { min, max },
            message: None,
        }
    }

    /// Create an `enum` rule from allowed values.
    pub fn one_of(column: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        Self {
            column: column.into(),
            kind: RuleKind::Enum { values },
            message: None,
        }
    }

    /// Attach a custom failure message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
