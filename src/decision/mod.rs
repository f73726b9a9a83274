//! Decision engine: prioritized policies, when/then rule sets, and
//! row/column decision tables.
//!
//! The three subsystems are independent, share the expression evaluator
//! for their conditions, and resolve conflicts with their own strategies:
//! policies pick a single highest-priority action, rule sets run in one of
//! three match modes, and tables apply a configurable hit policy. All
//! evaluation orders are fixed by declaration so results are reproducible.

pub mod policy;
pub mod rules;
pub mod table;

use std::collections::HashMap;

use crate::ast::DecisionKind;
use crate::eval::expression::EvalError;

pub use policy::{PolicyAction, PolicyDecision, PolicyEngine, PolicyRule};
pub use rules::{Assignment, RuleEngine, RuleMode, RuleResult, WhenThenRule};
pub use table::{DecisionTable, HitPolicy, TableResult};

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("condition of '{rule}' failed: {source}")]
    Condition {
        rule: String,
        #[source]
        source: EvalError,
    },
    #[error("assignment '{name}' in '{rule}' failed: {source}")]
    Assignment {
        rule: String,
        name: String,
        #[source]
        source: EvalError,
    },
    /// ANY-policy disagreement or a Unique-table completeness overlap.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("input column '{column}' path '{path}' did not resolve")]
    UnresolvedPath { column: String, path: String },
    #[error("row has {got} entries, table declares {expected} columns")]
    RowArity { expected: usize, got: usize },
    #[error("unparsable condition cell: '{0}'")]
    BadCell(String),
}

/// Definitions loaded from the syntax tree, resolved by name from
/// `Decide` steps. Re-loading a name replaces the previous definition.
#[derive(Debug, Clone, Default)]
pub struct DecisionRegistry {
    policies: HashMap<String, PolicyEngine>,
    rule_sets: HashMap<String, RuleEngine>,
    tables: HashMap<String, DecisionTable>,
}

impl DecisionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_policy(&mut self, engine: PolicyEngine) {
        self.policies.insert(engine.name().to_string(), engine);
    }

    pub fn load_rules(&mut self, engine: RuleEngine) {
        self.rule_sets.insert(engine.name().to_string(), engine);
    }

    pub fn load_table(&mut self, table: DecisionTable) {
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn policy(&self, name: &str) -> Option<&PolicyEngine> {
        self.policies.get(name)
    }

    pub fn rules(&self, name: &str) -> Option<&RuleEngine> {
        self.rule_sets.get(name)
    }

    pub fn table(&self, name: &str) -> Option<&DecisionTable> {
        self.tables.get(name)
    }

    pub fn contains(&self, kind: DecisionKind, name: &str) -> bool {
        match kind {
            DecisionKind::Policy => self.policies.contains_key(name),
            DecisionKind::Rules => self.rule_sets.contains_key(name),
            DecisionKind::Table => self.tables.contains_key(name),
        }
    }
}
