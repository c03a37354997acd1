//! Rule compilation and record validation.

use std::collections::HashSet;

use flatsync_core::{EngineError, EngineResult, Record, RuleKind, ValidationRule, Value};

/// A compiled rule set, ready to check records.
///
/// Compilation happens once per run so regular expressions parse once and
/// enum values render once. A bad pattern surfaces as a validation error
/// before any record is looked at.
#[derive(Debug)]
pub struct Validator {
    rules: Vec<CompiledRule>,
}

#[derive(Debug)]
struct CompiledRule {
    column: String,
    kind: CompiledKind,
    message: Option<String>,
}

#[derive(Debug)]
enum CompiledKind {
    Required,
    Unique,
    Pattern(regex::Regex),
    Range { min: Option<f64>, max: Option<f64> },
    Enum(Vec<String>),
}

/// Values already seen by `unique` rules, one set per rule.
///
/// Kept outside the validator so streaming callers can thread it across
/// batches.
#[derive(Debug, Default)]
pub struct UniqueSeen {
    sets: Vec<HashSet<String>>,
}

impl UniqueSeen {
    fn for_rules(count: usize) -> Self {
        Self {
            sets: vec![HashSet::new(); count],
        }
    }

    fn contains(&self, rule: usize, key: &str) -> bool {
        self.sets.get(rule).map(|s| s.contains(key)).unwrap_or(false)
    }

    fn insert(&mut self, rule: usize, key: String) {
        if let Some(set) = self.sets.get_mut(rule) {
            set.insert(key);
        }
    }
}

/// Records that survived validation, plus warnings for the ones that did not.
#[derive(Debug)]
pub struct Validated {
    pub records: Vec<Record>,
    pub warnings: Vec<String>,
}

impl Validator {
    /// Compile a rule list.
    pub fn compile(rules: &[ValidationRule]) -> EngineResult<Self> {
        let rules = rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Whether any rules are active.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fresh uniqueness state sized for this rule set.
    pub fn tracker(&self) -> UniqueSeen {
        UniqueSeen::for_rules(self.rules.len())
    }

    /// Check one record against every rule.
    ///
    /// Returns the first failure message. Values a `unique` rule would
    /// remember are committed only when the whole record passes, so a
    /// rejected record does not reserve its values against later rows.
    pub fn validate_record(
        &self,
        record: &Record,
        seen: &mut UniqueSeen,
    ) -> Result<(), String> {
        let mut passed_unique: Vec<(usize, String)> = Vec::new();

        for (idx, rule) in self.rules.iter().enumerate() {
            let value = record.get(&rule.column);
            match &rule.kind {
                CompiledKind::Required => {
                    if value.map(Value::is_blank).unwrap_or(true) {
                        return Err(rule.failure(format!(
                            "required column {} is missing or blank",
                            rule.column
                        )));
                    }
                }
                CompiledKind::Unique => {
                    if let Some(v) = value.filter(|v| !v.is_blank()) {
                        let key = v.to_string();
                        if seen.contains(idx, &key) {
                            return Err(rule.failure(format!(
                                "duplicate value '{key}' in column {}",
                                rule.column
                            )));
                        }
                        passed_unique.push((idx, key));
                    }
                }
                CompiledKind::Pattern(regex) => {
                    if let Some(v) = value.filter(|v| !v.is_null()) {
                        let rendered = v.to_string();
                        if !regex.is_match(&rendered) {
                            return Err(rule.failure(format!(
                                "value '{rendered}' in column {} does not match pattern",
                                rule.column
                            )));
                        }
                    }
                }
                CompiledKind::Range { min, max } => {
                    if let Some(v) = value.filter(|v| !v.is_blank()) {
                        match v.coerce_number() {
                            Some(n) => {
                                let below = min.map(|m| n < m).unwrap_or(false);
                                let above = max.map(|m| n > m).unwrap_or(false);
                                if below || above {
                                    return Err(rule.failure(format!(
                                        "value {n} in column {} is out of range",
                                        rule.column
                                    )));
                                }
                            }
                            None => {
                                return Err(rule.failure(format!(
                                    "value '{v}' in column {} is not numeric",
                                    rule.column
                                )))
                            }
                        }
                    }
                }
                CompiledKind::Enum(allowed) => {
                    if let Some(v) = value.filter(|v| !v.is_blank()) {
                        let rendered = v.to_string();
                        if !allowed.iter().any(|a| a == &rendered) {
                            return Err(rule.failure(format!(
                                "value '{rendered}' in column {} is not an allowed value",
                                rule.column
                            )));
                        }
                    }
                }
            }
        }

        for (idx, key) in passed_unique {
            seen.insert(idx, key);
        }
        Ok(())
    }

    /// Validate a record set.
    ///
    /// In strict mode the first failing record aborts the run with a
    /// validation error. With `continue_on_error` the failing record is
    /// dropped and reported as a warning, and the rest proceed. Row numbers
    /// in messages are 1-based data rows.
    pub fn run(&self, records: Vec<Record>, continue_on_error: bool) -> EngineResult<Validated> {
        if self.rules.is_empty() {
            return Ok(Validated {
                records,
                warnings: Vec::new(),
            });
        }

        let mut seen = self.tracker();
        let mut kept = Vec::with_capacity(records.len());
        let mut warnings = Vec::new();

        for (idx, record) in records.into_iter().enumerate() {
            match self.validate_record(&record, &mut seen) {
                Ok(()) => kept.push(record),
                Err(message) => {
                    let message = format!("row {}: {message}", idx + 1);
                    if continue_on_error {
                        warnings.push(message);
                    } else {
                        return Err(EngineError::Validation(message));
                    }
                }
            }
        }

        Ok(Validated {
            records: kept,
            warnings,
        })
    }
}

impl CompiledRule {
    fn compile(rule: &ValidationRule) -> EngineResult<Self> {
        let kind = match &rule.kind {
            RuleKind::Required => CompiledKind::Required,
            RuleKind::Unique => CompiledKind::Unique,
            RuleKind::Pattern { pattern } => {
                let regex = regex::Regex::new(pattern).map_err(|e| {
                    EngineError::Validation(format!(
                        "invalid pattern for column {}: {e}",
                        rule.column
                    ))
                })?;
                CompiledKind::Pattern(regex)
            }
            RuleKind::Range { min, max } => CompiledKind::Range {
                min: *min,
                max: *max,
            },
            RuleKind::Enum { values } => CompiledKind::Enum(
                values
                    .iter()
                    .map(|v| Value::from_json(v).to_string())
                    .collect(),
            ),
        };
        Ok(Self {
            column: rule.column.clone(),
            kind,
            message: rule.message.clone(),
        })
    }

    fn failure(&self, default: String) -> String {
        self.message.clone().unwrap_or(default)
    }
}
