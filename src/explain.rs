//! Human-readable explanation of execution traces.
//!
//! A pure log-to-text transform: the engine walks the linear event log,
//! pairs Enter/Exit events, and synthesizes one sentence per pair keyed by
//! node kind. Nothing is ever re-executed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::NodeKind;
use crate::eval::expression::Value;
use crate::trace::{Phase, TraceCollector, TraceEvent};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Executed,
    DryRun,
    Failed,
}

/// One narrated step, derived from an Enter/Exit pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationStep {
    pub index: usize,
    pub kind: NodeKind,
    pub summary: String,
    pub details: BTreeMap<String, Value>,
}

/// Complete explanation with a stable schema: every field always present,
/// empty collections instead of absence, deterministic ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationReport {
    pub trace_id: String,
    pub status: ExecutionStatus,
    pub steps: Vec<ExplanationStep>,
    pub errors: Vec<BTreeMap<String, Value>>,
}

#[derive(Debug, Default)]
pub struct ExplanationEngine;

impl ExplanationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Narrates a trace. Steps come out in event order, one per
    /// Enter/Exit pair; unpaired events are narrated alone.
    pub fn explain(&self, trace: &TraceCollector, status: ExecutionStatus) -> ExplanationReport {
        let events = trace.events();
        let mut steps = Vec::new();
        let mut errors = Vec::new();
        let mut index = 0;
        let mut cursor = 0;

        while cursor < events.len() {
            let event = &events[cursor];

            let exit = if event.phase == Phase::Enter {
                events
                    .get(cursor + 1)
                    .filter(|next| next.phase == Phase::Exit && next.kind == event.kind)
            } else {
                None
            };

            for source in [Some(event), exit].into_iter().flatten() {
                if let Some(error) = source.note.get("error") {
                    let mut entry = BTreeMap::new();
                    entry.insert(
                        "step".to_string(),
                        Value::String(format!("{}_{}", source.kind, index)),
                    );
                    entry.insert("error".to_string(), error.clone());
                    errors.push(entry);
                }
            }

            steps.push(self.narrate(event, exit, index));

            cursor += if exit.is_some() { 2 } else { 1 };
            index += 1;
        }

        ExplanationReport {
            trace_id: trace.trace_id().to_string(),
            status,
            steps,
            errors,
        }
    }

    /// Shorthand for a plain executed-status narration.
    pub fn from_trace(&self, trace: &TraceCollector) -> Vec<ExplanationStep> {
        self.explain(trace, ExecutionStatus::Executed).steps
    }

    fn narrate(
        &self,
        enter: &TraceEvent,
        exit: Option<&TraceEvent>,
        index: usize,
    ) -> ExplanationStep {
        // Exit notes carry the detail computed during execution; merge the
        // pair so either side can contribute.
        let mut details: BTreeMap<String, Value> = enter.note.clone();
        if let Some(exit) = exit {
            details.extend(exit.note.clone());
        }

        let summary = match enter.kind {
            NodeKind::If => self.narrate_if(&details),
            NodeKind::While => self.narrate_while(&details),
            NodeKind::For => self.narrate_for(&details),
            NodeKind::Step => self.narrate_step(&details, enter.dry_run),
            NodeKind::Return => match details.get("values") {
                Some(Value::Integer(n)) => format!("returned {} value(s)", n),
                _ => "returned".to_string(),
            },
            NodeKind::TaskDef => match details.get("task") {
                Some(Value::String(name)) => format!("executed task '{}'", name),
                _ => "executed task".to_string(),
            },
            NodeKind::Expression => "evaluated expression".to_string(),
            NodeKind::PolicyDef => self.narrate_loaded("policy", &details),
            NodeKind::RuleDef => self.narrate_loaded("rule set", &details),
            NodeKind::TableDef => self.narrate_loaded("decision table", &details),
        };

        ExplanationStep {
            index,
            kind: enter.kind,
            summary,
            details,
        }
    }

    fn narrate_if(&self, details: &BTreeMap<String, Value>) -> String {
        let result = matches!(details.get("condition_result"), Some(Value::Boolean(true)));
        let branch = match details.get("branch") {
            Some(Value::String(branch)) => branch.clone(),
            _ => "then".to_string(),
        };
        if branch == "none" {
            format!("condition evaluated to {} → no branch entered", result)
        } else {
            format!("condition evaluated to {} → entered {} branch", result, branch)
        }
    }

    fn narrate_while(&self, details: &BTreeMap<String, Value>) -> String {
        match details.get("iterations") {
            Some(Value::Integer(0)) => "loop condition was false → body not executed".to_string(),
            Some(Value::Integer(n)) => format!("loop terminated after {} iterations", n),
            _ => "executed loop".to_string(),
        }
    }

    fn narrate_for(&self, details: &BTreeMap<String, Value>) -> String {
        match details.get("collection_size") {
            Some(Value::Integer(0)) => {
                "iterated over empty collection → body not executed".to_string()
            }
            Some(Value::Integer(n)) => format!("iterated over collection of {} items", n),
            _ => "iterated collection".to_string(),
        }
    }

    fn narrate_step(&self, details: &BTreeMap<String, Value>, dry_run: bool) -> String {
        if let Some(Value::String(target)) = details.get("would_set") {
            let value = details.get("value").cloned().unwrap_or(Value::Null);
            return format!("would set {} to {} (dry-run)", target, value);
        }
        if let Some(Value::String(target)) = details.get("set") {
            let value = details.get("value").cloned().unwrap_or(Value::Null);
            return format!("set {} to {}", target, value);
        }
        if let Some(Value::String(function)) = details.get("would_occur") {
            return format!("would invoke {} (dry-run)", function);
        }
        if let Some(Value::String(function)) = details.get("invoked") {
            return format!("invoked {}", function);
        }
        if let Some(Value::String(name)) = details.get("decided") {
            let kind = match details.get("kind") {
                Some(Value::String(kind)) => kind.clone(),
                _ => "decision".to_string(),
            };
            return format!("evaluated {} '{}'", kind.to_lowercase(), name);
        }
        if dry_run {
            "analyzed step (dry-run)".to_string()
        } else {
            "executed step".to_string()
        }
    }

    fn narrate_loaded(&self, what: &str, details: &BTreeMap<String, Value>) -> String {
        match details.get("loaded") {
            Some(Value::String(name)) => format!("loaded {} '{}'", what, name),
            _ => format!("loaded {}", what),
        }
    }
}
