//! Trace replay: structural validation without re-execution.
//!
//! Replay checks that a log is well-formed (every Enter has a later
//! matching Exit of the same kind, nesting is properly bracketed) and
//! compares two traces event-for-event to check determinism. It never
//! re-runs anything: determinism is established by trace comparison, not
//! recomputation.

use crate::ast::NodeKind;
use crate::trace::{Phase, TraceCollector};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("enter/exit mismatch at event {index}: expected exit for {expected}, found {found}")]
    Mismatch {
        index: usize,
        expected: NodeKind,
        found: NodeKind,
    },
    #[error("exit without matching enter at event {index}: {kind}")]
    ExitWithoutEnter { index: usize, kind: NodeKind },
    #[error("unclosed enter events: {count} remaining at end of trace")]
    Unclosed { count: usize },
    #[error("trace length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("node kind mismatch at event {index}: {left} vs {right}")]
    KindMismatch {
        index: usize,
        left: NodeKind,
        right: NodeKind,
    },
    #[error("phase mismatch at event {index}: {left} vs {right}")]
    PhaseMismatch {
        index: usize,
        left: Phase,
        right: Phase,
    },
}

/// Result of a successful structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub event_count: usize,
    pub max_depth: usize,
}

#[derive(Debug, Default)]
pub struct ReplayEngine;

impl ReplayEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validates stack discipline over the event log.
    pub fn replay(&self, trace: &TraceCollector) -> Result<ReplaySummary, ReplayError> {
        let mut stack: Vec<NodeKind> = Vec::new();
        let mut max_depth = 0;

        for (index, event) in trace.events().iter().enumerate() {
            match event.phase {
                Phase::Enter => {
                    stack.push(event.kind);
                    max_depth = max_depth.max(stack.len());
                }
                Phase::Exit => match stack.pop() {
                    Some(expected) if expected == event.kind => {}
                    Some(expected) => {
                        return Err(ReplayError::Mismatch {
                            index,
                            expected,
                            found: event.kind,
                        })
                    }
                    None => {
                        return Err(ReplayError::ExitWithoutEnter {
                            index,
                            kind: event.kind,
                        })
                    }
                },
            }
        }

        if !stack.is_empty() {
            return Err(ReplayError::Unclosed { count: stack.len() });
        }

        Ok(ReplaySummary {
            event_count: trace.len(),
            max_depth,
        })
    }

    /// Two traces for identical inputs must have identical Enter/Exit
    /// sequences and node kinds.
    pub fn validate_determinism(
        &self,
        left: &TraceCollector,
        right: &TraceCollector,
    ) -> Result<(), ReplayError> {
        if left.len() != right.len() {
            return Err(ReplayError::LengthMismatch {
                left: left.len(),
                right: right.len(),
            });
        }

        for (index, (a, b)) in left.events().iter().zip(right.events()).enumerate() {
            if a.kind != b.kind {
                return Err(ReplayError::KindMismatch {
                    index,
                    left: a.kind,
                    right: b.kind,
                });
            }
            if a.phase != b.phase {
                return Err(ReplayError::PhaseMismatch {
                    index,
                    left: a.phase,
                    right: b.phase,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::trace::TraceEvent;

    use super::*;

    fn event(kind: NodeKind, phase: Phase) -> TraceEvent {
        TraceEvent::new(kind, phase)
    }

    #[test]
    fn test_replay_empty_trace() {
        let engine = ReplayEngine::new();
        let trace = TraceCollector::new();
        let summary = engine.replay(&trace).unwrap();
        assert_eq!(summary.event_count, 0);
        assert_eq!(summary.max_depth, 0);
    }

    #[test]
    fn test_replay_valid_pair() {
        let engine = ReplayEngine::new();
        let mut trace = TraceCollector::new();
        trace.record(event(NodeKind::If, Phase::Enter));
        trace.record(event(NodeKind::If, Phase::Exit));

        let summary = engine.replay(&trace).unwrap();
        assert_eq!(summary.event_count, 2);
        assert_eq!(summary.max_depth, 1);
    }

    #[test]
    fn test_replay_nested_events() {
        let engine = ReplayEngine::new();
        let mut trace = TraceCollector::new();
        trace.record(event(NodeKind::If, Phase::Enter));
        trace.record(event(NodeKind::While, Phase::Enter));
        trace.record(event(NodeKind::While, Phase::Exit));
        trace.record(event(NodeKind::If, Phase::Exit));

        let summary = engine.replay(&trace).unwrap();
        assert_eq!(summary.event_count, 4);
        assert_eq!(summary.max_depth, 2);
    }

    #[test]
    fn test_replay_fails_on_kind_mismatch() {
        let engine = ReplayEngine::new();
        let mut trace = TraceCollector::new();
        trace.record(event(NodeKind::If, Phase::Enter));
        trace.record(event(NodeKind::While, Phase::Exit));

        let err = engine.replay(&trace).unwrap_err();
        assert!(err.to_string().contains("mismatch"));
    }

    #[test]
    fn test_replay_fails_on_unclosed_enter() {
        let engine = ReplayEngine::new();
        let mut trace = TraceCollector::new();
        trace.record(event(NodeKind::If, Phase::Enter));

        let err = engine.replay(&trace).unwrap_err();
        assert!(err.to_string().contains("unclosed"));
    }

    #[test]
    fn test_replay_fails_on_exit_without_enter() {
        let engine = ReplayEngine::new();
        let mut trace = TraceCollector::new();
        trace.record(event(NodeKind::If, Phase::Exit));

        assert!(matches!(
            engine.replay(&trace),
            Err(ReplayError::ExitWithoutEnter { .. })
        ));
    }

    #[test]
    fn test_determinism_identical_traces() {
        let engine = ReplayEngine::new();
        let mut a = TraceCollector::new();
        a.record(event(NodeKind::If, Phase::Enter));
        a.record(event(NodeKind::If, Phase::Exit));
        let mut b = TraceCollector::new();
        b.record(event(NodeKind::If, Phase::Enter));
        b.record(event(NodeKind::If, Phase::Exit));

        engine.validate_determinism(&a, &b).unwrap();
    }

    #[test]
    fn test_determinism_length_mismatch() {
        let engine = ReplayEngine::new();
        let mut a = TraceCollector::new();
        a.record(event(NodeKind::If, Phase::Enter));
        let mut b = TraceCollector::new();
        b.record(event(NodeKind::If, Phase::Enter));
        b.record(event(NodeKind::If, Phase::Exit));

        let err = engine.validate_determinism(&a, &b).unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn test_determinism_kind_mismatch() {
        let engine = ReplayEngine::new();
        let mut a = TraceCollector::new();
        a.record(event(NodeKind::If, Phase::Enter));
        let mut b = TraceCollector::new();
        b.record(event(NodeKind::While, Phase::Enter));

        let err = engine.validate_determinism(&a, &b).unwrap_err();
        assert!(err.to_string().contains("kind mismatch"));
    }
}
