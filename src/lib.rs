//! # Verdict: Deterministic Decision-Execution Engine
//!
//! Verdict interprets a validated syntax tree of control flow and
//! expressions, and layers a decision engine and an observability
//! subsystem on top. Identical inputs always yield identical outputs and
//! identical traces: execution is single-threaded, synchronous, and free
//! of wall-clock or I/O dependencies.
//!
//! ## Components
//!
//! ### 1. Execution Core
//! - Scoped variable bindings with parent lookup ([`eval::context`])
//! - Pure expression evaluation ([`eval::expression`])
//! - Control-flow dispatch with iteration ceilings, capability gating and
//!   dry-run ([`eval::executor`])
//!
//! ### 2. Decision Engine
//! - Priority-ordered policies yielding a single action
//!   ([`decision::policy`])
//! - When/then rule sets with three match modes ([`decision::rules`])
//! - Decision tables under configurable hit policies ([`decision::table`])
//! - Pre/post-condition and determinism checking ([`constraint`])
//!
//! ### 3. Observability
//! - Enter/Exit event tracing ([`trace`])
//! - Trace-to-narrative explanation ([`explain`])
//! - Tamper-detecting replay validation ([`replay`])
//!
//! ## Execution Pipeline
//!
//! ```text
//! Validated Tree + Inputs + Profile
//!     → preconditions → Executor (trace attached) → postconditions
//!     → determinism check → Output Bindings
//! ```
//!
//! The lexing, parsing and semantic validation that produce the tree are
//! external collaborators, as is the pure stdlib function table the
//! evaluator calls into. Traces are consumed read-only by the explanation
//! and replay engines; nothing is ever re-executed.

pub mod ast;
pub mod config;
pub mod constraint;
pub mod decision;
pub mod error;
pub mod eval;
pub mod explain;
pub mod replay;
pub mod runtime;
pub mod trace;

// Re-exports
pub use ast::*;
pub use error::*;
pub use eval::*;
pub use runtime::Runtime;
