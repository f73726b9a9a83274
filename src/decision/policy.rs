//! Priority-ordered boolean policies yielding a single action.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::Expression;
use crate::eval::context::ExecutionContext;
use crate::eval::expression::ExpressionEvaluator;

use super::DecisionError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize,
)]
pub enum PolicyAction {
    Allow,
    Deny,
    Gate,
    Override,
    Escalate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRule {
    pub name: String,
    pub condition: Expression,
    pub action: PolicyAction,
    pub priority: i32,
}

/// Outcome of one policy evaluation: the selected action, the winning
/// rule, and every rule whose condition held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub action: PolicyAction,
    pub winner: Option<String>,
    pub matched: Vec<String>,
}

impl PolicyDecision {
    pub fn allowed(&self) -> bool {
        !matches!(self.action, PolicyAction::Deny)
    }

    pub fn requires_gate(&self) -> bool {
        self.action == PolicyAction::Gate
    }

    pub fn requires_escalation(&self) -> bool {
        self.action == PolicyAction::Escalate
    }
}

/// Evaluates every rule's condition and selects the matching rule of
/// highest priority; ties go to the rule registered first. No match falls
/// back to the configured default action.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyEngine {
    name: String,
    rules: Vec<PolicyRule>,
    default_action: PolicyAction,
    enabled: bool,
}

impl PolicyEngine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            default_action: PolicyAction::Allow,
            enabled: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_default_action(mut self, action: PolicyAction) -> Self {
        self.default_action = action;
        self
    }

    pub fn add_policy(
        &mut self,
        name: impl Into<String>,
        condition: Expression,
        action: PolicyAction,
        priority: i32,
    ) {
        self.rules.push(PolicyRule {
            name: name.into(),
            condition,
            action,
            priority,
        });
    }

    pub fn remove_policy(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.name != name);
        self.rules.len() != before
    }

    pub fn list_policies(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name.as_str()).collect()
    }

    /// A disabled engine always yields the default action.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn evaluate(&self, context: &ExecutionContext) -> Result<PolicyDecision, DecisionError> {
        self.evaluate_with(context, &ExpressionEvaluator::new())
    }

    pub fn evaluate_with(
        &self,
        context: &ExecutionContext,
        evaluator: &ExpressionEvaluator,
    ) -> Result<PolicyDecision, DecisionError> {
        if !self.enabled {
            return Ok(PolicyDecision {
                action: self.default_action,
                winner: None,
                matched: Vec::new(),
            });
        }

        let mut matched = Vec::new();
        let mut winner: Option<&PolicyRule> = None;

        for rule in &self.rules {
            let holds = evaluator
                .eval_condition(&rule.condition, context)
                .map_err(|source| DecisionError::Condition {
                    rule: rule.name.clone(),
                    source,
                })?;
            if !holds {
                continue;
            }
            matched.push(rule.name.clone());
            // Strict comparison keeps the first-registered rule on ties.
            if winner.map_or(true, |best| rule.priority > best.priority) {
                winner = Some(rule);
            }
        }

        let decision = match winner {
            Some(rule) => {
                debug!(policy = %self.name, rule = %rule.name, action = %rule.action, "policy matched");
                PolicyDecision {
                    action: rule.action,
                    winner: Some(rule.name.clone()),
                    matched,
                }
            }
            None => PolicyDecision {
                action: self.default_action,
                winner: None,
                matched,
            },
        };
        Ok(decision)
    }
}
