//! Pure expression evaluation.
//!
//! Evaluation never mutates the context. Every failure is a typed error;
//! the engine never produces sentinel values for division by zero,
//! operator/type mismatches, or undefined names.

use core::fmt;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOperator, Expression, Literal, UnaryOperator};

use super::context::{ContextError, ExecutionContext};

/// Runtime value.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Result of a statement-like node with nothing to yield.
    Unit,
    #[default]
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Boolean(_) => "Boolean",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Unit => "Unit",
            Value::Null => "Null",
        }
    }

    pub fn from_literal(literal: &Literal) -> Value {
        match literal {
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Float(x) => Value::Float(*x),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::List(items) => Value::List(items.iter().map(Value::from_literal).collect()),
            Literal::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::from_literal(value)))
                    .collect(),
            ),
            Literal::Null => Value::Null,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("undefined name: {0}")]
    UndefinedName(String),
    #[error("undefined path: {0}")]
    UndefinedPath(String),
    #[error("type mismatch: {left} {op} {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },
    #[error("condition must evaluate to Boolean, got {0}")]
    NonBooleanCondition(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("function '{function}' failed: {message}")]
    Function { function: String, message: String },
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl From<ContextError> for EvalError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::UndefinedName(name) => EvalError::UndefinedName(name),
        }
    }
}

pub type EvalResult<T> = Result<T, EvalError>;

/// A pure function from the consumed stdlib table. Requires no capability.
pub type NativeFunction = fn(&[Value]) -> EvalResult<Value>;

/// Name -> callable table handed in by the host. Opaque to the engine.
pub type FunctionTable = HashMap<String, NativeFunction>;

/// Pure evaluator over literals, identifiers, dotted paths, operators and
/// stdlib-table calls.
#[derive(Default)]
pub struct ExpressionEvaluator {
    functions: FunctionTable,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(functions: FunctionTable) -> Self {
        Self { functions }
    }

    pub fn eval(&self, expr: &Expression, context: &ExecutionContext) -> EvalResult<Value> {
        match expr {
            Expression::Literal(literal) => Ok(Value::from_literal(literal)),
            Expression::Variable(name) => context.get(name).map_err(EvalError::from),
            Expression::Path(segments) => self.eval_path(segments, context),
            Expression::UnaryOp { op, operand } => {
                let value = self.eval(operand, context)?;
                self.eval_unary(*op, &value)
            }
            Expression::BinaryOp { op, left, right } => {
                let left_val = self.eval(left, context)?;
                let right_val = self.eval(right, context)?;
                self.eval_binary(*op, &left_val, &right_val)
            }
            Expression::FunctionCall {
                function,
                arguments,
            } => self.eval_call(function, arguments, context),
        }
    }

    /// Evaluates a condition, requiring a boolean result.
    pub fn eval_condition(&self, expr: &Expression, context: &ExecutionContext) -> EvalResult<bool> {
        match self.eval(expr, context)? {
            Value::Boolean(b) => Ok(b),
            other => Err(EvalError::NonBooleanCondition(
                other.type_name().to_string(),
            )),
        }
    }

    fn eval_path(&self, segments: &[String], context: &ExecutionContext) -> EvalResult<Value> {
        let mut segments = segments.iter();
        let root = segments
            .next()
            .ok_or_else(|| EvalError::InvalidOperation("empty path".to_string()))?;
        let mut current = context.get(root).map_err(EvalError::from)?;
        let mut resolved = root.clone();

        for segment in segments {
            resolved.push('.');
            resolved.push_str(segment);
            current = match current {
                Value::Map(map) => map
                    .get(segment)
                    .cloned()
                    .ok_or_else(|| EvalError::UndefinedPath(resolved.clone()))?,
                _ => return Err(EvalError::UndefinedPath(resolved.clone())),
            };
        }
        Ok(current)
    }

    fn eval_call(
        &self,
        function: &str,
        arguments: &[Expression],
        context: &ExecutionContext,
    ) -> EvalResult<Value> {
        let callable = self
            .functions
            .get(function)
            .copied()
            .ok_or_else(|| EvalError::UnknownFunction(function.to_string()))?;

        let mut evaluated = Vec::with_capacity(arguments.len());
        for argument in arguments {
            evaluated.push(self.eval(argument, context)?);
        }
        callable(&evaluated)
    }

    fn eval_unary(&self, op: UnaryOperator, value: &Value) -> EvalResult<Value> {
        match (op, value) {
            (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
            (UnaryOperator::Negate, Value::Integer(i)) => Ok(Value::Integer(-i)),
            (UnaryOperator::Negate, Value::Float(x)) => Ok(Value::Float(-x)),
            _ => Err(EvalError::InvalidOperation(format!(
                "{} {}",
                op,
                value.type_name()
            ))),
        }
    }

    fn eval_binary(&self, op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<Value> {
        match op {
            BinaryOperator::Add => self.eval_add(left, right),
            BinaryOperator::Subtract => self.eval_arith(op, left, right, |l, r| l - r, |l, r| l - r),
            BinaryOperator::Multiply => self.eval_arith(op, left, right, |l, r| l * r, |l, r| l * r),
            BinaryOperator::Divide => self.eval_divide(left, right),
            BinaryOperator::Modulo => self.eval_modulo(left, right),
            BinaryOperator::Equal => Ok(Value::Boolean(loose_eq(left, right))),
            BinaryOperator::NotEqual => Ok(Value::Boolean(!loose_eq(left, right))),
            BinaryOperator::LessThan => self.compare_values(op, left, right, |ord| ord.is_lt()),
            BinaryOperator::GreaterThan => self.compare_values(op, left, right, |ord| ord.is_gt()),
            BinaryOperator::LessThanEqual => self.compare_values(op, left, right, |ord| ord.is_le()),
            BinaryOperator::GreaterThanEqual => {
                self.compare_values(op, left, right, |ord| ord.is_ge())
            }
            BinaryOperator::And => match (left, right) {
                (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(*l && *r)),
                _ => Err(self.mismatch(op, left, right)),
            },
            BinaryOperator::Or => match (left, right) {
                (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(*l || *r)),
                _ => Err(self.mismatch(op, left, right)),
            },
        }
    }

    fn eval_add(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::String(l), Value::String(r)) => Ok(Value::String(l.clone() + r)),
            (Value::List(l), Value::List(r)) => {
                let mut joined = l.clone();
                joined.extend(r.iter().cloned());
                Ok(Value::List(joined))
            }
            _ => self.eval_arith(BinaryOperator::Add, left, right, |l, r| l + r, |l, r| l + r),
        }
    }

    fn eval_arith(
        &self,
        op: BinaryOperator,
        left: &Value,
        right: &Value,
        int_op: fn(i64, i64) -> i64,
        float_op: fn(f64, f64) -> f64,
    ) -> EvalResult<Value> {
        match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(int_op(*l, *r))),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(float_op(*l, *r))),
            (Value::Integer(l), Value::Float(r)) => Ok(Value::Float(float_op(*l as f64, *r))),
            (Value::Float(l), Value::Integer(r)) => Ok(Value::Float(float_op(*l, *r as f64))),
            _ => Err(self.mismatch(op, left, right)),
        }
    }

    fn eval_divide(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Integer(_) | Value::Float(_), Value::Integer(0)) => {
                Err(EvalError::DivisionByZero)
            }
            (_, Value::Float(r)) if *r == 0.0 => Err(EvalError::DivisionByZero),
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Float(*l as f64 / *r as f64)),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l / r)),
            (Value::Integer(l), Value::Float(r)) => Ok(Value::Float(*l as f64 / r)),
            (Value::Float(l), Value::Integer(r)) => Ok(Value::Float(l / *r as f64)),
            _ => Err(self.mismatch(BinaryOperator::Divide, left, right)),
        }
    }

    fn eval_modulo(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Integer(_) | Value::Float(_), Value::Integer(0)) => {
                Err(EvalError::DivisionByZero)
            }
            (_, Value::Float(r)) if *r == 0.0 => Err(EvalError::DivisionByZero),
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l % r)),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l % r)),
            (Value::Integer(l), Value::Float(r)) => Ok(Value::Float(*l as f64 % r)),
            (Value::Float(l), Value::Integer(r)) => Ok(Value::Float(l % *r as f64)),
            _ => Err(self.mismatch(BinaryOperator::Modulo, left, right)),
        }
    }

    fn compare_values<F>(
        &self,
        op: BinaryOperator,
        left: &Value,
        right: &Value,
        compare: F,
    ) -> EvalResult<Value>
    where
        F: Fn(std::cmp::Ordering) -> bool,
    {
        let ordering = match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => l.cmp(r),
            (Value::Float(l), Value::Float(r)) => l
                .partial_cmp(r)
                .ok_or_else(|| self.mismatch(op, left, right))?,
            (Value::Integer(l), Value::Float(r)) => (*l as f64)
                .partial_cmp(r)
                .ok_or_else(|| self.mismatch(op, left, right))?,
            (Value::Float(l), Value::Integer(r)) => l
                .partial_cmp(&(*r as f64))
                .ok_or_else(|| self.mismatch(op, left, right))?,
            (Value::String(l), Value::String(r)) => l.cmp(r),
            _ => return Err(self.mismatch(op, left, right)),
        };
        Ok(Value::Boolean(compare(ordering)))
    }

    fn mismatch(&self, op: BinaryOperator, left: &Value, right: &Value) -> EvalError {
        EvalError::TypeMismatch {
            op: op.to_string(),
            left: left.type_name().to_string(),
            right: right.type_name().to_string(),
        }
    }
}

/// Equality with numeric coercion between Integer and Float.
pub(crate) fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(l), Value::Float(r)) => (*l as f64) == *r,
        (Value::Float(l), Value::Integer(r)) => *l == (*r as f64),
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::Expression;

    use super::*;

    fn setup_context() -> ExecutionContext {
        ExecutionContext::new()
    }

    #[test]
    fn test_literal_evaluation() {
        let evaluator = ExpressionEvaluator::new();
        let context = setup_context();

        let result = evaluator.eval(&Expression::int(42), &context).unwrap();
        assert_eq!(result, Value::Integer(42));

        let result = evaluator.eval(&Expression::float(3.25), &context).unwrap();
        assert_eq!(result, Value::Float(3.25));

        let result = evaluator
            .eval(&Expression::string("hello"), &context)
            .unwrap();
        assert_eq!(result, Value::String("hello".to_string()));

        let result = evaluator
            .eval(&Expression::Literal(Literal::Null), &context)
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn test_variable_evaluation() {
        let evaluator = ExpressionEvaluator::new();
        let mut context = setup_context();
        context.set("x", Value::Integer(42));

        let result = evaluator.eval(&Expression::var("x"), &context).unwrap();
        assert_eq!(result, Value::Integer(42));

        let result = evaluator.eval(&Expression::var("undefined"), &context);
        assert!(matches!(result, Err(EvalError::UndefinedName(_))));
    }

    #[test]
    fn test_path_evaluation() {
        let evaluator = ExpressionEvaluator::new();
        let mut context = setup_context();
        context.set(
            "customer",
            Value::Map(HashMap::from([
                ("age".to_string(), Value::Integer(30)),
                (
                    "address".to_string(),
                    Value::Map(HashMap::from([(
                        "city".to_string(),
                        Value::String("Ghent".to_string()),
                    )])),
                ),
            ])),
        );

        let result = evaluator
            .eval(&Expression::path(&["customer", "age"]), &context)
            .unwrap();
        assert_eq!(result, Value::Integer(30));

        let result = evaluator
            .eval(&Expression::path(&["customer", "address", "city"]), &context)
            .unwrap();
        assert_eq!(result, Value::String("Ghent".to_string()));

        let result = evaluator.eval(&Expression::path(&["customer", "missing"]), &context);
        assert!(matches!(result, Err(EvalError::UndefinedPath(_))));
    }

    #[test]
    fn test_arithmetic() {
        let evaluator = ExpressionEvaluator::new();
        let context = setup_context();

        let expr = Expression::binary(BinaryOperator::Add, Expression::int(5), Expression::int(3));
        assert_eq!(evaluator.eval(&expr, &context).unwrap(), Value::Integer(8));

        let expr = Expression::binary(
            BinaryOperator::Add,
            Expression::int(5),
            Expression::float(3.5),
        );
        assert_eq!(evaluator.eval(&expr, &context).unwrap(), Value::Float(8.5));

        let expr = Expression::binary(
            BinaryOperator::Add,
            Expression::string("Hello "),
            Expression::string("World"),
        );
        assert_eq!(
            evaluator.eval(&expr, &context).unwrap(),
            Value::String("Hello World".to_string())
        );

        let expr = Expression::binary(
            BinaryOperator::Multiply,
            Expression::int(6),
            Expression::int(7),
        );
        assert_eq!(evaluator.eval(&expr, &context).unwrap(), Value::Integer(42));
    }

    #[test]
    fn test_division_by_zero_is_typed_error() {
        let evaluator = ExpressionEvaluator::new();
        let context = setup_context();

        let expr = Expression::binary(
            BinaryOperator::Divide,
            Expression::int(10),
            Expression::int(0),
        );
        assert!(matches!(
            evaluator.eval(&expr, &context),
            Err(EvalError::DivisionByZero)
        ));

        let expr = Expression::binary(
            BinaryOperator::Modulo,
            Expression::int(10),
            Expression::int(0),
        );
        assert!(matches!(
            evaluator.eval(&expr, &context),
            Err(EvalError::DivisionByZero)
        ));
    }

    #[test]
    fn test_comparisons() {
        let evaluator = ExpressionEvaluator::new();
        let context = setup_context();

        let expr = Expression::binary(
            BinaryOperator::LessThan,
            Expression::float(3.14),
            Expression::float(3.15),
        );
        assert_eq!(
            evaluator.eval(&expr, &context).unwrap(),
            Value::Boolean(true)
        );

        let expr = Expression::binary(
            BinaryOperator::GreaterThanEqual,
            Expression::int(10),
            Expression::int(10),
        );
        assert_eq!(
            evaluator.eval(&expr, &context).unwrap(),
            Value::Boolean(true)
        );

        let expr = Expression::binary(
            BinaryOperator::Equal,
            Expression::int(25),
            Expression::float(25.0),
        );
        assert_eq!(
            evaluator.eval(&expr, &context).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_boolean_operators_require_booleans() {
        let evaluator = ExpressionEvaluator::new();
        let context = setup_context();

        let expr = Expression::binary(
            BinaryOperator::And,
            Expression::boolean(true),
            Expression::int(1),
        );
        assert!(matches!(
            evaluator.eval(&expr, &context),
            Err(EvalError::TypeMismatch { .. })
        ));

        let expr = Expression::binary(
            BinaryOperator::Or,
            Expression::boolean(true),
            Expression::boolean(false),
        );
        assert_eq!(
            evaluator.eval(&expr, &context).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_unary_operators() {
        let evaluator = ExpressionEvaluator::new();
        let context = setup_context();

        let expr = Expression::UnaryOp {
            op: UnaryOperator::Not,
            operand: Box::new(Expression::boolean(false)),
        };
        assert_eq!(
            evaluator.eval(&expr, &context).unwrap(),
            Value::Boolean(true)
        );

        let expr = Expression::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(Expression::int(5)),
        };
        assert_eq!(evaluator.eval(&expr, &context).unwrap(), Value::Integer(-5));
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let evaluator = ExpressionEvaluator::new();
        let context = setup_context();

        assert!(evaluator
            .eval_condition(&Expression::boolean(true), &context)
            .unwrap());
        assert!(matches!(
            evaluator.eval_condition(&Expression::int(1), &context),
            Err(EvalError::NonBooleanCondition(_))
        ));
    }

    #[test]
    fn test_function_calls() {
        fn double(args: &[Value]) -> EvalResult<Value> {
            match args {
                [Value::Integer(i)] => Ok(Value::Integer(i * 2)),
                _ => Err(EvalError::Function {
                    function: "double".to_string(),
                    message: "expects one integer".to_string(),
                }),
            }
        }

        let mut table: FunctionTable = HashMap::new();
        table.insert("double".to_string(), double);
        let evaluator = ExpressionEvaluator::with_functions(table);
        let context = setup_context();

        let expr = Expression::FunctionCall {
            function: "double".to_string(),
            arguments: vec![Expression::int(21)],
        };
        assert_eq!(evaluator.eval(&expr, &context).unwrap(), Value::Integer(42));

        let expr = Expression::FunctionCall {
            function: "missing".to_string(),
            arguments: vec![],
        };
        assert!(matches!(
            evaluator.eval(&expr, &context),
            Err(EvalError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_nested_expressions() {
        let evaluator = ExpressionEvaluator::new();
        let context = setup_context();

        // (5 * 2) + 3
        let expr = Expression::binary(
            BinaryOperator::Add,
            Expression::binary(
                BinaryOperator::Multiply,
                Expression::int(5),
                Expression::int(2),
            ),
            Expression::int(3),
        );
        assert_eq!(evaluator.eval(&expr, &context).unwrap(), Value::Integer(13));
    }

    #[test]
    fn test_evaluation_does_not_mutate_context() {
        let evaluator = ExpressionEvaluator::new();
        let mut context = setup_context();
        context.set("x", Value::Integer(1));
        let before = context.snapshot();

        let expr = Expression::binary(
            BinaryOperator::Add,
            Expression::var("x"),
            Expression::int(1),
        );
        evaluator.eval(&expr, &context).unwrap();

        assert_eq!(context.snapshot(), before);
    }
}
