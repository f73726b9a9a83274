//! Execution tracing.
//!
//! The collector records an ordered Enter/Exit event log during dispatch.
//! Recording is observation only: attaching a collector never changes an
//! execution's outcome. The log is later read, never re-driven, by the
//! explanation and replay engines.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ast::NodeKind;
use crate::eval::context::ExecutionContext;
use crate::eval::expression::Value;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Enter,
    Exit,
}

/// Single event in an execution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Position in the log, assigned by the collector.
    pub seq: usize,
    pub kind: NodeKind,
    pub phase: Phase,
    /// Visible bindings at the time of the event, inner scopes shadowing
    /// outer ones.
    pub snapshot: Option<HashMap<String, Value>>,
    pub dry_run: bool,
    /// Per-kind detail: condition results, branch taken, iteration counts,
    /// would-set values, errors. Keys are stable per node kind.
    pub note: BTreeMap<String, Value>,
}

impl TraceEvent {
    pub fn new(kind: NodeKind, phase: Phase) -> Self {
        Self {
            seq: 0,
            kind,
            phase,
            snapshot: None,
            dry_run: false,
            note: BTreeMap::new(),
        }
    }

    pub fn with_snapshot(mut self, context: &ExecutionContext) -> Self {
        self.snapshot = Some(context.snapshot());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_note(mut self, key: impl Into<String>, value: Value) -> Self {
        self.note.insert(key.into(), value);
        self
    }
}

/// Append-only event log, owned by exactly one execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceCollector {
    trace_id: String,
    events: Vec<TraceEvent>,
}

impl Default for TraceCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceCollector {
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            events: Vec::new(),
        }
    }

    pub fn with_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            events: Vec::new(),
        }
    }

    /// The trace id is observability metadata only; it never participates
    /// in determinism comparison.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Appends an event, assigning its sequence index.
    pub fn record(&mut self, mut event: TraceEvent) {
        event.seq = self.events.len();
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_record_assigns_sequence() {
        let mut collector = TraceCollector::new();
        collector.record(TraceEvent::new(NodeKind::If, Phase::Enter));
        collector.record(TraceEvent::new(NodeKind::If, Phase::Exit));

        assert_eq!(collector.len(), 2);
        assert_eq!(collector.events()[0].seq, 0);
        assert_eq!(collector.events()[1].seq, 1);
        assert_eq!(collector.events()[0].phase, Phase::Enter);
    }

    #[test]
    fn test_snapshot_captures_visible_bindings() {
        let mut context = ExecutionContext::new();
        context.set("x", Value::Integer(10));

        let event = TraceEvent::new(NodeKind::Step, Phase::Enter).with_snapshot(&context);
        let snapshot = event.snapshot.unwrap();
        assert_eq!(snapshot.get("x"), Some(&Value::Integer(10)));
    }

    #[test]
    fn test_trace_ids_are_unique() {
        let a = TraceCollector::new();
        let b = TraceCollector::new();
        assert_ne!(a.trace_id(), b.trace_id());
    }

    #[test]
    fn test_notes() {
        let event = TraceEvent::new(NodeKind::While, Phase::Exit)
            .with_note("iterations", Value::Integer(3));
        assert_eq!(event.note.get("iterations"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Enter.to_string(), "enter");
        assert_eq!(Phase::Exit.to_string(), "exit");
    }
}
