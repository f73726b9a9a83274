//! Control-flow interpreter.
//!
//! Dispatches syntax-tree nodes by kind, using the context for bindings
//! and the evaluator for expressions. An attached trace collector sees an
//! Enter event before each node recurses and an Exit event after; tracing
//! never changes an execution's outcome. Side-effecting steps consult the
//! capability gate before running; under dry-run they are refused and
//! recorded as "would occur".

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::ast::{
    DecisionKind, ForNode, IfNode, Node, NodeKind, ReturnNode, StepAction, StepNode, TaskDef,
    WhileNode,
};
use crate::decision::{DecisionError, DecisionRegistry};
use crate::trace::{Phase, TraceCollector, TraceEvent};

use super::context::{CapabilityError, ExecutionContext};
use super::expression::{EvalError, ExpressionEvaluator, FunctionTable, Value};

pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error("{kind} loop exceeded maximum iterations ({limit})")]
    MaxIterationsExceeded { kind: NodeKind, limit: usize },
    #[error("for loop iterable must be a list, got {found}")]
    NotIterable { found: String },
    #[error("unknown {kind} definition: '{name}'")]
    UnknownDecision { kind: DecisionKind, name: String },
    #[error("task '{task}' missing input '{name}'")]
    MissingInput { task: String, name: String },
    #[error("task '{task}' returned {got} values for {expected} declared outputs")]
    OutputArity {
        task: String,
        expected: usize,
        got: usize,
    },
    #[error(transparent)]
    Decision(#[from] DecisionError),
}

pub type ExecResult<T> = Result<T, ExecError>;

/// Result of executing one node: a plain value, or a `Return` unwinding to
/// the nearest task boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecFlow {
    Value(Value),
    Return(Vec<Value>),
}

/// The interpreter. Holds per-execution state: iteration ceiling, dry-run
/// flag, the expression evaluator with the host's function table, the
/// decision registry, and the optional trace collector.
pub struct Executor {
    max_iterations: usize,
    dry_run: bool,
    evaluator: ExpressionEvaluator,
    registry: DecisionRegistry,
    trace: Option<TraceCollector>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub fn new() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            dry_run: false,
            evaluator: ExpressionEvaluator::new(),
            registry: DecisionRegistry::new(),
            trace: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_functions(mut self, functions: FunctionTable) -> Self {
        self.evaluator = ExpressionEvaluator::with_functions(functions);
        self
    }

    pub fn with_trace(mut self, collector: TraceCollector) -> Self {
        self.trace = Some(collector);
        self
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn trace(&self) -> Option<&TraceCollector> {
        self.trace.as_ref()
    }

    pub fn take_trace(&mut self) -> Option<TraceCollector> {
        self.trace.take()
    }

    pub fn registry(&self) -> &DecisionRegistry {
        &self.registry
    }

    /// Executes a task: seeds the root scope from declared inputs, runs
    /// the step sequence, and collects the declared outputs on return or
    /// fall-through. In dry-run an overlay scope keeps the caller's
    /// bindings untouched while reads and control flow behave exactly as
    /// a live run would.
    pub fn execute_task(
        &mut self,
        task: &TaskDef,
        context: &mut ExecutionContext,
    ) -> ExecResult<BTreeMap<String, Value>> {
        for input in &task.inputs {
            if !context.contains(&input.name) {
                return Err(ExecError::MissingInput {
                    task: task.name.clone(),
                    name: input.name.clone(),
                });
            }
        }

        let overlay = if self.dry_run {
            context.set_dry_run(true);
            Some(context.begin_overlay())
        } else {
            None
        };

        self.record(context, |event| {
            event.with_note("task", Value::String(task.name.clone()))
        }, NodeKind::TaskDef, Phase::Enter);

        let flow = self.execute_block(&task.steps, context);

        let outputs = flow.and_then(|flow| match flow {
            ExecFlow::Return(values) if !values.is_empty() => {
                if values.len() != task.outputs.len() {
                    return Err(ExecError::OutputArity {
                        task: task.name.clone(),
                        expected: task.outputs.len(),
                        got: values.len(),
                    });
                }
                Ok(task
                    .outputs
                    .iter()
                    .zip(values)
                    .map(|(param, value)| (param.name.clone(), value))
                    .collect())
            }
            _ => Ok(task
                .outputs
                .iter()
                .filter_map(|param| {
                    context
                        .get(&param.name)
                        .ok()
                        .map(|value| (param.name.clone(), value))
                })
                .collect()),
        });

        match &outputs {
            Ok(_) => self.record(context, |event| {
                event.with_note("task", Value::String(task.name.clone()))
            }, NodeKind::TaskDef, Phase::Exit),
            Err(err) => {
                let message = err.to_string();
                self.record(context, move |event| {
                    event.with_note("error", Value::String(message))
                }, NodeKind::TaskDef, Phase::Exit);
            }
        }

        if let Some(previous) = overlay {
            context.end_overlay(previous);
            context.set_dry_run(false);
        }

        outputs
    }

    /// Executes one node, emitting paired Enter/Exit trace events around
    /// the dispatch. Errors still emit the Exit event, then propagate.
    pub fn execute(&mut self, node: &Node, context: &mut ExecutionContext) -> ExecResult<ExecFlow> {
        let kind = node.kind();
        debug!(%kind, "dispatch");
        self.record(context, |event| event, kind, Phase::Enter);

        let result = self.dispatch(node, context);

        match &result {
            Ok((_, note)) => {
                let note = note.clone();
                self.record(context, move |mut event| {
                    for (key, value) in note {
                        event = event.with_note(key, value);
                    }
                    event
                }, kind, Phase::Exit);
            }
            Err(err) => {
                let message = err.to_string();
                self.record(context, move |event| {
                    event.with_note("error", Value::String(message))
                }, kind, Phase::Exit);
            }
        }

        result.map(|(flow, _)| flow)
    }

    fn dispatch(
        &mut self,
        node: &Node,
        context: &mut ExecutionContext,
    ) -> ExecResult<(ExecFlow, BTreeMap<String, Value>)> {
        match node {
            Node::If(if_node) => self.execute_if(if_node, context),
            Node::While(while_node) => self.execute_while(while_node, context),
            Node::For(for_node) => self.execute_for(for_node, context),
            Node::Step(step) => self.execute_step(step, context),
            Node::Return(ret) => self.execute_return(ret, context),
            Node::Expression(expr) => {
                let value = self.evaluator.eval(expr, context)?;
                Ok((ExecFlow::Value(value), BTreeMap::new()))
            }
            Node::TaskDef(task) => {
                // A nested task definition executes in place against the
                // current context.
                let outputs = self.execute_task(task, context)?;
                let map = outputs.into_iter().collect::<HashMap<_, _>>();
                Ok((ExecFlow::Value(Value::Map(map)), BTreeMap::new()))
            }
            Node::PolicyDef(engine) => {
                let note = BTreeMap::from([(
                    "loaded".to_string(),
                    Value::String(engine.name().to_string()),
                )]);
                self.registry.load_policy(engine.clone());
                Ok((ExecFlow::Value(Value::Unit), note))
            }
            Node::RuleDef(engine) => {
                let note = BTreeMap::from([(
                    "loaded".to_string(),
                    Value::String(engine.name().to_string()),
                )]);
                self.registry.load_rules(engine.clone());
                Ok((ExecFlow::Value(Value::Unit), note))
            }
            Node::TableDef(table) => {
                let note = BTreeMap::from([(
                    "loaded".to_string(),
                    Value::String(table.name().to_string()),
                )]);
                self.registry.load_table(table.clone());
                Ok((ExecFlow::Value(Value::Unit), note))
            }
        }
    }

    /// Executes statements in declared order; `Return` short-circuits.
    pub fn execute_block(
        &mut self,
        block: &[Node],
        context: &mut ExecutionContext,
    ) -> ExecResult<ExecFlow> {
        let mut last = Value::Unit;
        for statement in block {
            match self.execute(statement, context)? {
                ExecFlow::Value(value) => last = value,
                ExecFlow::Return(values) => return Ok(ExecFlow::Return(values)),
            }
        }
        Ok(ExecFlow::Value(last))
    }

    fn execute_if(
        &mut self,
        node: &IfNode,
        context: &mut ExecutionContext,
    ) -> ExecResult<(ExecFlow, BTreeMap<String, Value>)> {
        let mut note = BTreeMap::new();

        let branch: Option<&[Node]> = if self.evaluator.eval_condition(&node.condition, context)? {
            note.insert("condition_result".to_string(), Value::Boolean(true));
            note.insert("branch".to_string(), Value::String("then".to_string()));
            Some(&node.then_body)
        } else {
            note.insert("condition_result".to_string(), Value::Boolean(false));
            let mut taken = None;
            for (index, (condition, body)) in node.elif_branches.iter().enumerate() {
                if self.evaluator.eval_condition(condition, context)? {
                    note.insert(
                        "branch".to_string(),
                        Value::String(format!("elif {}", index)),
                    );
                    taken = Some(body.as_slice());
                    break;
                }
            }
            match (taken, &node.else_body) {
                (Some(body), _) => Some(body),
                (None, Some(body)) => {
                    note.insert("branch".to_string(), Value::String("else".to_string()));
                    Some(body.as_slice())
                }
                (None, None) => {
                    note.insert("branch".to_string(), Value::String("none".to_string()));
                    None
                }
            }
        };

        let flow = match branch {
            Some(body) => {
                context.push_scope();
                let flow = self.execute_block(body, context);
                context.pop_scope();
                flow?
            }
            None => ExecFlow::Value(Value::Unit),
        };
        Ok((flow, note))
    }

    fn execute_while(
        &mut self,
        node: &WhileNode,
        context: &mut ExecutionContext,
    ) -> ExecResult<(ExecFlow, BTreeMap<String, Value>)> {
        let mut iterations: usize = 0;

        // The condition is re-evaluated against the same context so that
        // mutations persist across iterations; only the body gets a child
        // scope.
        while self.evaluator.eval_condition(&node.condition, context)? {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(ExecError::MaxIterationsExceeded {
                    kind: NodeKind::While,
                    limit: self.max_iterations,
                });
            }

            context.push_scope();
            let flow = self.execute_block(&node.body, context);
            context.pop_scope();

            if let ExecFlow::Return(values) = flow? {
                let note = BTreeMap::from([(
                    "iterations".to_string(),
                    Value::Integer(iterations as i64),
                )]);
                return Ok((ExecFlow::Return(values), note));
            }
        }

        let note = BTreeMap::from([(
            "iterations".to_string(),
            Value::Integer(iterations as i64),
        )]);
        Ok((ExecFlow::Value(Value::Unit), note))
    }

    fn execute_for(
        &mut self,
        node: &ForNode,
        context: &mut ExecutionContext,
    ) -> ExecResult<(ExecFlow, BTreeMap<String, Value>)> {
        let iterable = self.evaluator.eval(&node.iterable, context)?;
        let items = match iterable {
            Value::List(items) => items,
            other => {
                return Err(ExecError::NotIterable {
                    found: other.type_name().to_string(),
                })
            }
        };

        let mut note = BTreeMap::from([
            ("collection_size".to_string(), Value::Integer(items.len() as i64)),
            ("loop_var".to_string(), Value::String(node.iterator.clone())),
        ]);

        let mut iterations: usize = 0;
        for item in items {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(ExecError::MaxIterationsExceeded {
                    kind: NodeKind::For,
                    limit: self.max_iterations,
                });
            }

            // Fresh child scope per element; the binding does not outlive
            // the loop.
            context.push_scope();
            context.define(&node.iterator, item);
            let flow = self.execute_block(&node.body, context);
            context.pop_scope();

            if let ExecFlow::Return(values) = flow? {
                note.insert("iterations".to_string(), Value::Integer(iterations as i64));
                return Ok((ExecFlow::Return(values), note));
            }
        }

        note.insert("iterations".to_string(), Value::Integer(iterations as i64));
        Ok((ExecFlow::Value(Value::Unit), note))
    }

    fn execute_step(
        &mut self,
        step: &StepNode,
        context: &mut ExecutionContext,
    ) -> ExecResult<(ExecFlow, BTreeMap<String, Value>)> {
        let mut note = BTreeMap::new();
        if let Some(name) = &step.name {
            note.insert("step".to_string(), Value::String(name.clone()));
        }

        match &step.action {
            StepAction::Assign { target, value } => {
                let value = self.evaluator.eval(value, context)?;
                let key = if self.dry_run { "would_set" } else { "set" };
                note.insert(key.to_string(), Value::String(target.clone()));
                note.insert("value".to_string(), value.clone());
                // In dry-run the write lands above the overlay barrier, so
                // the seeded bindings stay untouched.
                context.set(target, value);
                Ok((ExecFlow::Value(Value::Unit), note))
            }
            StepAction::Invoke {
                function,
                arguments,
                capability,
                bind,
            } => {
                if let Some(capability) = capability {
                    // Gate first: a missing capability fails even in
                    // dry-run, it never silently no-ops.
                    context.require_capability(capability, &format!("call to {}", function))?;

                    if self.dry_run {
                        note.insert("would_occur".to_string(), Value::String(function.clone()));
                        if let Some(bind) = bind {
                            context.set(bind, Value::Null);
                        }
                        return Ok((ExecFlow::Value(Value::Null), note));
                    }
                }

                let result = self.evaluator.eval(
                    &crate::ast::Expression::FunctionCall {
                        function: function.clone(),
                        arguments: arguments.clone(),
                    },
                    context,
                )?;
                note.insert("invoked".to_string(), Value::String(function.clone()));
                if let Some(bind) = bind {
                    context.set(bind, result.clone());
                }
                Ok((ExecFlow::Value(result), note))
            }
            StepAction::Decide { kind, name, bind } => {
                let outputs = self.execute_decide(*kind, name, bind.as_deref(), context)?;
                note.insert("decided".to_string(), Value::String(name.clone()));
                note.insert("kind".to_string(), Value::String(kind.to_string()));
                Ok((ExecFlow::Value(outputs), note))
            }
        }
    }

    fn execute_decide(
        &mut self,
        kind: DecisionKind,
        name: &str,
        bind: Option<&str>,
        context: &mut ExecutionContext,
    ) -> ExecResult<Value> {
        match kind {
            DecisionKind::Policy => {
                let engine = self.registry.policy(name).ok_or_else(|| {
                    ExecError::UnknownDecision {
                        kind,
                        name: name.to_string(),
                    }
                })?;
                let decision = engine.evaluate_with(context, &self.evaluator)?;
                let map = Value::Map(HashMap::from([
                    (
                        "action".to_string(),
                        Value::String(decision.action.to_string()),
                    ),
                    ("allowed".to_string(), Value::Boolean(decision.allowed())),
                    (
                        "winner".to_string(),
                        decision
                            .winner
                            .clone()
                            .map(Value::String)
                            .unwrap_or(Value::Null),
                    ),
                    (
                        "matched".to_string(),
                        Value::List(decision.matched.iter().cloned().map(Value::String).collect()),
                    ),
                ]));
                context.set(bind.unwrap_or("decision"), map.clone());
                Ok(map)
            }
            DecisionKind::Rules => {
                let engine = self.registry.rules(name).ok_or_else(|| {
                    ExecError::UnknownDecision {
                        kind,
                        name: name.to_string(),
                    }
                })?;
                let result = engine.evaluate_with(context, &self.evaluator)?;
                for (key, value) in &result.outputs {
                    context.set(key, value.clone());
                }
                let map = Value::Map(result.outputs.clone().into_iter().collect());
                if let Some(bind) = bind {
                    context.set(bind, map.clone());
                }
                Ok(map)
            }
            DecisionKind::Table => {
                let table = self.registry.table(name).ok_or_else(|| {
                    ExecError::UnknownDecision {
                        kind,
                        name: name.to_string(),
                    }
                })?;
                let result = table.evaluate(context)?;
                for (key, value) in &result.outputs {
                    context.set(key, value.clone());
                }
                let map = Value::Map(result.outputs.clone().into_iter().collect());
                if let Some(bind) = bind {
                    context.set(bind, map.clone());
                }
                Ok(map)
            }
        }
    }

    fn execute_return(
        &mut self,
        node: &ReturnNode,
        context: &mut ExecutionContext,
    ) -> ExecResult<(ExecFlow, BTreeMap<String, Value>)> {
        let mut values = Vec::with_capacity(node.values.len());
        for expr in &node.values {
            values.push(self.evaluator.eval(expr, context)?);
        }
        let note = BTreeMap::from([(
            "values".to_string(),
            Value::Integer(values.len() as i64),
        )]);
        Ok((ExecFlow::Return(values), note))
    }

    fn record<F>(&mut self, context: &ExecutionContext, build: F, kind: NodeKind, phase: Phase)
    where
        F: FnOnce(TraceEvent) -> TraceEvent,
    {
        if let Some(trace) = &mut self.trace {
            let event = TraceEvent::new(kind, phase)
                .with_snapshot(context)
                .with_dry_run(self.dry_run);
            trace.record(build(event));
        }
    }
}
