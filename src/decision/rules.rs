//! When/then rule sets.
//!
//! Each rule carries a when-condition, ordered then-assignments and
//! optional else-assignments. Assignments are evaluated against an
//! accumulating context, so later rules see earlier outputs (rule
//! chaining). The engine never mutates the caller's context; it reports
//! the merged outputs and the fired rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::Expression;
use crate::eval::context::ExecutionContext;
use crate::eval::expression::{ExpressionEvaluator, Value};

use super::DecisionError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleMode {
    /// Stop at the first rule whose when-condition holds.
    #[default]
    FirstMatch,
    /// Apply every matching rule in declared order.
    AllMatches,
    /// Apply every matching rule ordered so the highest-priority rule's
    /// assignments land last and win conflicting keys.
    Priority,
}

/// A structured `name = expression` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Expression,
}

impl Assignment {
    pub fn new(name: impl Into<String>, value: Expression) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenThenRule {
    pub name: String,
    pub when: Expression,
    pub then: Vec<Assignment>,
    pub otherwise: Vec<Assignment>,
    pub priority: i32,
    pub enabled: bool,
}

impl WhenThenRule {
    pub fn new(name: impl Into<String>, when: Expression, then: Vec<Assignment>) -> Self {
        Self {
            name: name.into(),
            when,
            then,
            otherwise: Vec::new(),
            priority: 0,
            enabled: true,
        }
    }

    pub fn with_else(mut self, otherwise: Vec<Assignment>) -> Self {
        self.otherwise = otherwise;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Final merged outputs and the rules that fired, in application order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleResult {
    pub outputs: BTreeMap<String, Value>,
    pub fired: Vec<String>,
}

impl RuleResult {
    pub fn matched_count(&self) -> usize {
        self.fired.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleEngine {
    name: String,
    mode: RuleMode,
    rules: Vec<WhenThenRule>,
}

impl RuleEngine {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_mode(name, RuleMode::default())
    }

    pub fn with_mode(name: impl Into<String>, mode: RuleMode) -> Self {
        Self {
            name: name.into(),
            mode,
            rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> RuleMode {
        self.mode
    }

    pub fn add_rule(&mut self, rule: WhenThenRule) {
        self.rules.push(rule);
    }

    pub fn disable_rule(&mut self, name: &str) -> bool {
        self.set_rule_enabled(name, false)
    }

    pub fn enable_rule(&mut self, name: &str) -> bool {
        self.set_rule_enabled(name, true)
    }

    fn set_rule_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.rules.iter_mut().find(|rule| rule.name == name) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn evaluate(&self, context: &ExecutionContext) -> Result<RuleResult, DecisionError> {
        self.evaluate_with(context, &ExpressionEvaluator::new())
    }

    pub fn evaluate_with(
        &self,
        context: &ExecutionContext,
        evaluator: &ExpressionEvaluator,
    ) -> Result<RuleResult, DecisionError> {
        // Scratch context seeded with the caller's visible bindings;
        // assignments accumulate here so later rules see earlier outputs.
        let mut work = ExecutionContext::from_bindings(context.snapshot());
        let mut result = RuleResult::default();

        match self.mode {
            RuleMode::FirstMatch | RuleMode::AllMatches => {
                for rule in self.rules.iter().filter(|rule| rule.enabled) {
                    if self.condition_holds(rule, &work, evaluator)? {
                        self.apply(rule, &rule.then, &mut work, &mut result, evaluator)?;
                        result.fired.push(rule.name.clone());
                        if self.mode == RuleMode::FirstMatch {
                            break;
                        }
                    } else if !rule.otherwise.is_empty() {
                        self.apply(rule, &rule.otherwise, &mut work, &mut result, evaluator)?;
                    }
                }
            }
            RuleMode::Priority => {
                // Match against the base bindings, then apply lowest
                // priority first so the highest-priority assignments land
                // last and win conflicting keys.
                let mut matching = Vec::new();
                for (index, rule) in self.rules.iter().enumerate().filter(|(_, r)| r.enabled) {
                    if self.condition_holds(rule, &work, evaluator)? {
                        matching.push((index, rule));
                    } else if !rule.otherwise.is_empty() {
                        self.apply(rule, &rule.otherwise, &mut work, &mut result, evaluator)?;
                    }
                }
                matching.sort_by_key(|(index, rule)| (rule.priority, std::cmp::Reverse(*index)));
                for (_, rule) in matching {
                    self.apply(rule, &rule.then, &mut work, &mut result, evaluator)?;
                    result.fired.push(rule.name.clone());
                }
            }
        }

        debug!(rules = %self.name, fired = result.fired.len(), "rule set evaluated");
        Ok(result)
    }

    fn condition_holds(
        &self,
        rule: &WhenThenRule,
        work: &ExecutionContext,
        evaluator: &ExpressionEvaluator,
    ) -> Result<bool, DecisionError> {
        evaluator
            .eval_condition(&rule.when, work)
            .map_err(|source| DecisionError::Condition {
                rule: rule.name.clone(),
                source,
            })
    }

    fn apply(
        &self,
        rule: &WhenThenRule,
        assignments: &[Assignment],
        work: &mut ExecutionContext,
        result: &mut RuleResult,
        evaluator: &ExpressionEvaluator,
    ) -> Result<(), DecisionError> {
        for assignment in assignments {
            let value = evaluator.eval(&assignment.value, work).map_err(|source| {
                DecisionError::Assignment {
                    rule: rule.name.clone(),
                    name: assignment.name.clone(),
                    source,
                }
            })?;
            work.set(&assignment.name, value.clone());
            result.outputs.insert(assignment.name.clone(), value);
        }
        Ok(())
    }
}
