//! Execution core.
//!
//! # Components
//!
//! ## Execution Context
//! Hierarchical variable-binding scopes with parent lookup, the capability
//! grant set, and the dry-run write barrier.
//!
//! ## Expression Evaluator
//! Pure evaluation of literals, identifiers, dotted paths and operators
//! against a context. Never mutates state.
//!
//! ## Executor
//! Dispatches syntax-tree nodes (if/while/for/step/return and the
//! decision definitions), enforcing iteration ceilings and the capability
//! gate, and emitting Enter/Exit trace events when a collector is
//! attached.
//!
//! # Pipeline
//!
//! 1. The host hands over a validated tree, seeded bindings and a profile.
//! 2. The executor interprets nodes recursively against the context.
//! 3. Steps may delegate to loaded decision definitions; their outputs
//!    merge back into the context.
//! 4. The trace, if collected, is later read by the explanation and
//!    replay engines.

pub mod context;
pub mod executor;
pub mod expression;

pub use context::{CapabilityError, ContextError, ExecutionContext};
pub use executor::{ExecError, ExecFlow, Executor, DEFAULT_MAX_ITERATIONS};
pub use expression::{
    EvalError, EvalResult, ExpressionEvaluator, FunctionTable, NativeFunction, Value,
};
