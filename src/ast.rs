//! Syntax tree consumed by the execution engine.
//!
//! The tree arrives already validated by the front end; the engine borrows
//! it for the duration of one execution and never mutates it. The node set
//! is closed: dispatch is an exhaustive match over [`Node`], and
//! [`NodeKind`] is the fieldless mirror used by tracing and replay.

use crate::decision::policy::PolicyEngine;
use crate::decision::rules::RuleEngine;
use crate::decision::table::DecisionTable;

/// A single syntax-tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    If(IfNode),
    While(WhileNode),
    For(ForNode),
    Step(StepNode),
    Return(ReturnNode),
    Expression(Expression),
    TaskDef(TaskDef),
    PolicyDef(PolicyEngine),
    RuleDef(RuleEngine),
    TableDef(DecisionTable),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::If(_) => NodeKind::If,
            Node::While(_) => NodeKind::While,
            Node::For(_) => NodeKind::For,
            Node::Step(_) => NodeKind::Step,
            Node::Return(_) => NodeKind::Return,
            Node::Expression(_) => NodeKind::Expression,
            Node::TaskDef(_) => NodeKind::TaskDef,
            Node::PolicyDef(_) => NodeKind::PolicyDef,
            Node::RuleDef(_) => NodeKind::RuleDef,
            Node::TableDef(_) => NodeKind::TableDef,
        }
    }
}

/// Fieldless node discriminant, recorded in trace events and compared by
/// the replay engine.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum NodeKind {
    If,
    While,
    For,
    Step,
    Return,
    Expression,
    TaskDef,
    PolicyDef,
    RuleDef,
    TableDef,
}

/// `if` / `else if` / `else` chain. Exactly one branch runs.
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub condition: Expression,
    pub then_body: Vec<Node>,
    pub elif_branches: Vec<(Expression, Vec<Node>)>,
    pub else_body: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileNode {
    pub condition: Expression,
    pub body: Vec<Node>,
}

/// Iterates an already-materialized, finite, order-preserved sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    pub iterator: String,
    pub iterable: Expression,
    pub body: Vec<Node>,
}

/// One declarative step. The action vocabulary is closed and resolved by
/// the front end at validation time; nothing is reinterpreted from prose
/// at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct StepNode {
    pub name: Option<String>,
    pub action: StepAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// `set <target> to <value>`.
    Assign { target: String, value: Expression },
    /// Call into the function table. A `capability` marks the call as
    /// side-effecting and is checked against the active grant set before
    /// the call runs; capability-free calls are pure and always allowed.
    Invoke {
        function: String,
        arguments: Vec<Expression>,
        capability: Option<String>,
        bind: Option<String>,
    },
    /// Evaluate a previously loaded decision definition against the
    /// current context and merge its outputs back in.
    Decide {
        kind: DecisionKind,
        name: String,
        bind: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum DecisionKind {
    Policy,
    Rules,
    Table,
}

/// Carries zero or more values up to the nearest task boundary. The only
/// non-local transfer in the language.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnNode {
    pub values: Vec<Expression>,
}

/// Task boundary: declared inputs seed the root scope, the step sequence
/// runs, and the declared outputs are collected on return or fall-through.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDef {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub steps: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }

    pub fn typed(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Variable(String),
    /// Dotted attribute-style access into map-valued bindings,
    /// e.g. `customer.age`.
    Path(Vec<String>),
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Capability-free call into the consumed stdlib function table.
    FunctionCall {
        function: String,
        arguments: Vec<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    List(Vec<Literal>),
    Map(Vec<(String, Literal)>),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum UnaryOperator {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    And,
    Or,
}

impl Expression {
    /// Convenience constructor for integer literals, used heavily in tests.
    pub fn int(value: i64) -> Self {
        Expression::Literal(Literal::Integer(value))
    }

    pub fn float(value: f64) -> Self {
        Expression::Literal(Literal::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Boolean(value))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn path(segments: &[&str]) -> Self {
        Expression::Path(segments.iter().map(|s| s.to_string()).collect())
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}
