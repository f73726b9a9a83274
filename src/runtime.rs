//! Top-level orchestration.
//!
//! A [`Runtime`] wraps one profile, a constraint checker and the host's
//! function table, and runs tasks end to end: preconditions against the
//! seeded inputs, traced execution, postconditions against the outputs,
//! then the determinism check. The collected trace is exposed read-only
//! afterwards for the explanation and replay engines.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::Profile;
use crate::constraint::{ConstraintChecker, ConstraintError, DeterminismCache};
use crate::error::{EngineResult, Error};
use crate::eval::context::ExecutionContext;
use crate::eval::executor::Executor;
use crate::eval::expression::{FunctionTable, Value};
use crate::ast::TaskDef;
use crate::trace::TraceCollector;

pub struct Runtime {
    profile: Profile,
    functions: FunctionTable,
    checker: ConstraintChecker,
    last_trace: Option<TraceCollector>,
}

impl Runtime {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            functions: FunctionTable::new(),
            checker: ConstraintChecker::new(),
            last_trace: None,
        }
    }

    pub fn with_functions(mut self, functions: FunctionTable) -> Self {
        self.functions = functions;
        self
    }

    /// Shares a determinism cache across runtimes. Without this every
    /// runtime owns an independent cache.
    pub fn with_cache(mut self, cache: DeterminismCache) -> Self {
        self.checker = ConstraintChecker::with_cache(cache);
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn constraints_mut(&mut self) -> &mut ConstraintChecker {
        &mut self.checker
    }

    pub fn constraints(&self) -> &ConstraintChecker {
        &self.checker
    }

    /// The trace from the most recent `execute` call, when the profile
    /// enables tracing. Read-only: consumers narrate or replay it, never
    /// re-drive it.
    pub fn last_trace(&self) -> Option<&TraceCollector> {
        self.last_trace.as_ref()
    }

    /// Runs a task end to end and yields its output bindings.
    pub fn execute(
        &mut self,
        task: &TaskDef,
        inputs: HashMap<String, Value>,
    ) -> EngineResult<BTreeMap<String, Value>> {
        debug!(task = %task.name, dry_run = self.profile.dry_run, "execute");

        let preconditions = self.checker.validate_preconditions(&inputs);
        if !preconditions.passed {
            return Err(Error::Constraint(ConstraintError::ValidationFailed {
                stage: "precondition".to_string(),
                violations: preconditions.violations,
            }));
        }

        let mut context = ExecutionContext::from_bindings(inputs.clone());
        context.grant_all(self.profile.capabilities.iter().cloned());

        let mut executor = Executor::new()
            .with_max_iterations(self.profile.max_iterations)
            .with_dry_run(self.profile.dry_run)
            .with_functions(self.functions.clone());
        if self.profile.tracing {
            executor = executor.with_trace(TraceCollector::new());
        }

        let outcome = executor.execute_task(task, &mut context);
        // Keep the trace even when execution failed; a failed run is
        // still narratable.
        self.last_trace = executor.take_trace();
        let outputs = outcome?;

        let output_bindings: HashMap<String, Value> = outputs
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let postconditions = self.checker.validate_postconditions(&output_bindings);
        if !postconditions.passed {
            return Err(Error::Constraint(ConstraintError::ValidationFailed {
                stage: "postcondition".to_string(),
                violations: postconditions.violations,
            }));
        }

        self.checker
            .check_determinism(&task.name, &inputs, &Value::Map(output_bindings))?;

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::{
        BinaryOperator, Expression, Node, Param, ReturnNode, StepAction, StepNode,
    };
    use crate::config::ProfileRegistry;
    use crate::constraint::ConstraintType;

    use super::*;

    fn double_task() -> TaskDef {
        TaskDef {
            name: "double".to_string(),
            inputs: vec![Param::typed("x", "Integer")],
            outputs: vec![Param::typed("result", "Integer")],
            steps: vec![
                Node::Step(StepNode {
                    name: None,
                    action: StepAction::Assign {
                        target: "result".to_string(),
                        value: Expression::binary(
                            BinaryOperator::Multiply,
                            Expression::var("x"),
                            Expression::int(2),
                        ),
                    },
                }),
                Node::Return(ReturnNode {
                    values: vec![Expression::var("result")],
                }),
            ],
        }
    }

    fn inputs(x: i64) -> HashMap<String, Value> {
        HashMap::from([("x".to_string(), Value::Integer(x))])
    }

    #[test]
    fn test_execute_yields_outputs() {
        let mut runtime = Runtime::new(Profile::default());
        let outputs = runtime.execute(&double_task(), inputs(21)).unwrap();
        assert_eq!(outputs.get("result"), Some(&Value::Integer(42)));
    }

    #[test]
    fn test_tracing_profile_collects_trace() {
        let profile = ProfileRegistry::new().get("audit").unwrap();
        let mut runtime = Runtime::new(profile);
        runtime.execute(&double_task(), inputs(21)).unwrap();

        let trace = runtime.last_trace().expect("audit profile traces");
        assert!(!trace.is_empty());
    }

    #[test]
    fn test_precondition_failure_aggregates() {
        let mut runtime = Runtime::new(Profile::default());
        runtime.constraints_mut().add_constraint(
            "x_positive",
            ConstraintType::Precondition,
            Expression::binary(
                BinaryOperator::GreaterThan,
                Expression::var("x"),
                Expression::int(0),
            ),
        );
        runtime.constraints_mut().add_constraint(
            "x_small",
            ConstraintType::Precondition,
            Expression::binary(
                BinaryOperator::LessThan,
                Expression::var("x"),
                Expression::int(100),
            ),
        );

        let err = runtime.execute(&double_task(), inputs(-500)).unwrap_err();
        match err {
            Error::Constraint(ConstraintError::ValidationFailed { stage, violations }) => {
                assert_eq!(stage, "precondition");
                assert_eq!(violations.len(), 2);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_postcondition_failure() {
        let mut runtime = Runtime::new(Profile::default());
        runtime.constraints_mut().add_constraint(
            "result_bounded",
            ConstraintType::Postcondition,
            Expression::binary(
                BinaryOperator::LessThan,
                Expression::var("result"),
                Expression::int(10),
            ),
        );

        let err = runtime.execute(&double_task(), inputs(21)).unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint(ConstraintError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_determinism_recorded_across_runs() {
        let mut runtime = Runtime::new(Profile::default());
        runtime.execute(&double_task(), inputs(21)).unwrap();
        // Same inputs, same outputs: no violation.
        runtime.execute(&double_task(), inputs(21)).unwrap();
        assert_eq!(runtime.constraints().cache().len(), 1);
    }

    #[test]
    fn test_dry_run_profile_matches_live_outputs() {
        let mut live = Runtime::new(ProfileRegistry::new().get("execution").unwrap());
        let live_outputs = live.execute(&double_task(), inputs(21)).unwrap();

        let mut dry = Runtime::new(ProfileRegistry::new().get("audit").unwrap());
        let dry_outputs = dry.execute(&double_task(), inputs(21)).unwrap();

        assert_eq!(live_outputs, dry_outputs);
    }
}
