//! Constraint validation and the determinism cache.
//!
//! Pre/post-conditions and invariants are boolean expressions evaluated
//! against a set of bindings. Every constraint is checked, with no
//! short-circuit, so all error-severity violations are reported together.
//! The determinism cache records a hash of normalized outputs per
//! `(task id, input hash)` pair; a later call with the same key and a
//! differing output hash is a hard violation.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ast::Expression;
use crate::eval::context::ExecutionContext;
use crate::eval::expression::{ExpressionEvaluator, Value};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize,
)]
pub enum ConstraintType {
    Precondition,
    Postcondition,
    Invariant,
    Determinism,
    Performance,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, Serialize, Deserialize,
)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRecord {
    pub name: String,
    pub kind: ConstraintType,
    pub expression: Expression,
    pub severity: Severity,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub constraint: String,
    pub message: String,
}

/// Outcome of one validation pass. `passed` reflects error-severity
/// violations only; warnings never fail the call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Violation>,
}

impl ValidationResult {
    fn passing() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConstraintError {
    #[error("determinism violation in task '{task}': identical inputs produced differing outputs")]
    DeterminismViolation { task: String },
    #[error("{stage} validation failed with {} violation(s)", violations.len())]
    ValidationFailed {
        stage: String,
        violations: Vec<Violation>,
    },
}

/// Process-scoped determinism cache, passed by handle so independent
/// runtime instances never implicitly share state. Append-only except for
/// the violation check.
#[derive(Debug, Clone, Default)]
pub struct DeterminismCache {
    entries: Arc<DashMap<(String, String), String>>,
}

impl DeterminismCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[derive(Debug)]
pub struct ConstraintChecker {
    constraints: Vec<ConstraintRecord>,
    cache: DeterminismCache,
    enabled: bool,
}

impl Default for ConstraintChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintChecker {
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
            cache: DeterminismCache::new(),
            enabled: true,
        }
    }

    /// Shares an existing determinism cache handle.
    pub fn with_cache(cache: DeterminismCache) -> Self {
        Self {
            constraints: Vec::new(),
            cache,
            enabled: true,
        }
    }

    pub fn cache(&self) -> &DeterminismCache {
        &self.cache
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        kind: ConstraintType,
        expression: Expression,
    ) {
        self.add_constraint_with(name, kind, expression, Severity::Error, None);
    }

    pub fn add_constraint_with(
        &mut self,
        name: impl Into<String>,
        kind: ConstraintType,
        expression: Expression,
        severity: Severity,
        message: Option<&str>,
    ) {
        self.constraints.push(ConstraintRecord {
            name: name.into(),
            kind,
            expression,
            severity,
            message: message.map(str::to_string),
        });
    }

    /// A disabled checker always passes.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn validate_preconditions(&self, bindings: &HashMap<String, Value>) -> ValidationResult {
        self.validate(ConstraintType::Precondition, bindings)
    }

    pub fn validate_postconditions(&self, bindings: &HashMap<String, Value>) -> ValidationResult {
        self.validate(ConstraintType::Postcondition, bindings)
    }

    pub fn validate_invariants(&self, bindings: &HashMap<String, Value>) -> ValidationResult {
        self.validate(ConstraintType::Invariant, bindings)
    }

    fn validate(&self, kind: ConstraintType, bindings: &HashMap<String, Value>) -> ValidationResult {
        if !self.enabled {
            return ValidationResult::passing();
        }

        let context = ExecutionContext::from_bindings(bindings.clone());
        let evaluator = ExpressionEvaluator::new();
        let mut result = ValidationResult::passing();

        // Every constraint is checked; nothing short-circuits.
        for record in self.constraints.iter().filter(|record| record.kind == kind) {
            match evaluator.eval_condition(&record.expression, &context) {
                Ok(true) => {}
                Ok(false) => {
                    let violation = Violation {
                        constraint: record.name.clone(),
                        message: record
                            .message
                            .clone()
                            .unwrap_or_else(|| format!("constraint '{}' not satisfied", record.name)),
                    };
                    match record.severity {
                        Severity::Error => {
                            result.passed = false;
                            result.violations.push(violation);
                        }
                        Severity::Warning => result.warnings.push(violation),
                    }
                }
                // A constraint that cannot be evaluated against the given
                // bindings is itself an error-severity violation.
                Err(err) => {
                    result.passed = false;
                    result.violations.push(Violation {
                        constraint: record.name.clone(),
                        message: format!("constraint '{}' failed to evaluate: {}", record.name, err),
                    });
                }
            }
        }
        result
    }

    /// Records or checks the output hash for `(task_id, hash(inputs))`.
    /// First observation records; a matching observation passes; a
    /// differing output hash is a hard violation.
    pub fn check_determinism(
        &self,
        task_id: &str,
        inputs: &HashMap<String, Value>,
        output: &Value,
    ) -> Result<(), ConstraintError> {
        if !self.enabled {
            return Ok(());
        }

        let input_hash = hash_value(&Value::Map(inputs.clone()));
        let output_hash = hash_value(output);
        let key = (task_id.to_string(), input_hash);

        if let Some(existing) = self.cache.entries.get(&key) {
            if *existing != output_hash {
                warn!(task = task_id, "determinism violation detected");
                return Err(ConstraintError::DeterminismViolation {
                    task: task_id.to_string(),
                });
            }
            return Ok(());
        }
        self.cache.entries.insert(key, output_hash);
        Ok(())
    }

    /// Performance constraints only warn on threshold breach; they never
    /// hard-fail a run.
    pub fn check_performance(&self, elapsed_ms: f64, max_time_ms: f64) -> ValidationResult {
        let mut result = ValidationResult::passing();
        if !self.enabled {
            return result;
        }
        if elapsed_ms > max_time_ms {
            warn!(elapsed_ms, max_time_ms, "performance threshold breached");
            result.warnings.push(Violation {
                constraint: "performance".to_string(),
                message: format!(
                    "execution took {:.1} ms, threshold is {:.1} ms",
                    elapsed_ms, max_time_ms
                ),
            });
        }
        result
    }
}

/// SHA-256 over a canonical rendering: map keys sorted, stable scalar
/// formatting. Two values hash equal iff their normalized forms agree.
pub fn hash_value(value: &Value) -> String {
    let canonical = canonical_json(value);
    let digest = digest(&SHA256, canonical.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest.as_ref() {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null | Value::Unit => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(x) => {
            // Keep integral floats distinct from integers.
            if x.fract() == 0.0 && x.is_finite() {
                format!("{:.1}", x)
            } else {
                format!("{}", x)
            }
        }
        Value::String(s) => serde_json::to_string(s).unwrap_or_else(|_| format!("{:?}", s)),
        Value::List(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        Value::Map(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let rendered: Vec<String> = keys
                .into_iter()
                .map(|key| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(key).unwrap_or_else(|_| format!("{:?}", key)),
                        canonical_json(&map[key])
                    )
                })
                .collect();
            format!("{{{}}}", rendered.join(","))
        }
    }
}
