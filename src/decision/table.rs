//! Row/column decision tables.
//!
//! Input columns resolve dotted paths against the context, rows are tested
//! top to bottom, and a configurable hit policy decides which matching
//! rows determine the result. Condition cells use a small literal grammar:
//! exact value, `*`, a comparison (`>= n`, `<= n`, `> n`, `< n`), an
//! inclusive range `a..b`, or set membership `[v1, v2, ...]`.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::eval::context::ExecutionContext;
use crate::eval::expression::{loose_eq, Value};

use super::DecisionError;

lazy_static! {
    static ref COMPARE_RE: Regex =
        Regex::new(r"^(>=|<=|>|<)\s*(-?\d+(?:\.\d+)?)$").expect("static pattern");
    static ref RANGE_RE: Regex =
        Regex::new(r"^(-?\d+(?:\.\d+)?)\s*\.\.\s*(-?\d+(?:\.\d+)?)$").expect("static pattern");
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HitPolicy {
    /// At most one row should match; overlap is a load-time concern
    /// surfaced by [`DecisionTable::check_completeness`], never a runtime
    /// error. At runtime the first match in declared order is taken.
    Unique,
    /// First declared match wins.
    First,
    /// Highest row priority wins; ties go to declaration order.
    Priority,
    /// Every matching row must agree on all outputs.
    Any,
    /// All matching outputs as a set: de-duplicated, first occurrence kept.
    Collect,
    /// All matching outputs in declared order, duplicates preserved.
    RuleOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Ge,
    Le,
    Gt,
    Lt,
}

/// Parsed condition cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellCondition {
    Any,
    Equals(Value),
    Compare { op: CompareOp, bound: f64 },
    Range { low: f64, high: f64 },
    In(Vec<Value>),
}

impl CellCondition {
    pub fn parse(text: &str) -> Result<Self, DecisionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DecisionError::BadCell(text.to_string()));
        }
        if text == "*" {
            return Ok(CellCondition::Any);
        }
        if let Some(caps) = COMPARE_RE.captures(text) {
            let op = match &caps[1] {
                ">=" => CompareOp::Ge,
                "<=" => CompareOp::Le,
                ">" => CompareOp::Gt,
                _ => CompareOp::Lt,
            };
            let bound: f64 = caps[2]
                .parse()
                .map_err(|_| DecisionError::BadCell(text.to_string()))?;
            return Ok(CellCondition::Compare { op, bound });
        }
        if let Some(caps) = RANGE_RE.captures(text) {
            let low: f64 = caps[1]
                .parse()
                .map_err(|_| DecisionError::BadCell(text.to_string()))?;
            let high: f64 = caps[2]
                .parse()
                .map_err(|_| DecisionError::BadCell(text.to_string()))?;
            return Ok(CellCondition::Range { low, high });
        }
        if text.starts_with('[') && text.ends_with(']') {
            let inner = &text[1..text.len() - 1];
            let members = inner
                .split(',')
                .map(|item| scalar_value(item.trim()))
                .collect();
            return Ok(CellCondition::In(members));
        }
        Ok(CellCondition::Equals(scalar_value(text)))
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            CellCondition::Any => true,
            CellCondition::Equals(expected) => loose_eq(expected, value),
            CellCondition::Compare { op, bound } => match as_number(value) {
                Some(n) => match op {
                    CompareOp::Ge => n >= *bound,
                    CompareOp::Le => n <= *bound,
                    CompareOp::Gt => n > *bound,
                    CompareOp::Lt => n < *bound,
                },
                None => false,
            },
            CellCondition::Range { low, high } => match as_number(value) {
                Some(n) => n >= *low && n <= *high,
                None => false,
            },
            CellCondition::In(members) => members.iter().any(|member| loose_eq(member, value)),
        }
    }
}

/// Parses a scalar cell token: number, boolean, quoted or bare string.
fn scalar_value(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(x) = text.parse::<f64>() {
        return Value::Float(x);
    }
    match text {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "null" => Value::Null,
        _ => {
            let unquoted = text
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
                .or_else(|| {
                    text.strip_prefix('\'')
                        .and_then(|rest| rest.strip_suffix('\''))
                })
                .unwrap_or(text);
            Value::String(unquoted.to_string())
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputColumn {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub name: String,
    pub default: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub conditions: Vec<CellCondition>,
    pub outputs: Vec<Value>,
    pub priority: i32,
}

/// Evaluation result: one value per output column, plus the matched row
/// indices in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableResult {
    pub outputs: BTreeMap<String, Value>,
    pub matched_rows: Vec<usize>,
    pub hit_policy: HitPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTable {
    name: String,
    hit_policy: HitPolicy,
    inputs: Vec<InputColumn>,
    outputs: Vec<OutputColumn>,
    rows: Vec<TableRow>,
}

impl DecisionTable {
    pub fn new(name: impl Into<String>, hit_policy: HitPolicy) -> Self {
        Self {
            name: name.into(),
            hit_policy,
            inputs: Vec::new(),
            outputs: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hit_policy(&self) -> HitPolicy {
        self.hit_policy
    }

    pub fn add_input_column(&mut self, name: impl Into<String>, path: impl Into<String>) {
        self.inputs.push(InputColumn {
            name: name.into(),
            path: path.into(),
        });
    }

    pub fn add_output_column(&mut self, name: impl Into<String>, default: Value) {
        self.outputs.push(OutputColumn {
            name: name.into(),
            default,
        });
    }

    pub fn add_row(&mut self, conditions: &[&str], outputs: Vec<Value>) -> Result<(), DecisionError> {
        self.add_row_with_priority(conditions, outputs, 0)
    }

    pub fn add_row_with_priority(
        &mut self,
        conditions: &[&str],
        outputs: Vec<Value>,
        priority: i32,
    ) -> Result<(), DecisionError> {
        if conditions.len() != self.inputs.len() {
            return Err(DecisionError::RowArity {
                expected: self.inputs.len(),
                got: conditions.len(),
            });
        }
        if outputs.len() != self.outputs.len() {
            return Err(DecisionError::RowArity {
                expected: self.outputs.len(),
                got: outputs.len(),
            });
        }
        let conditions = conditions
            .iter()
            .map(|cell| CellCondition::parse(cell))
            .collect::<Result<Vec<_>, _>>()?;
        self.rows.push(TableRow {
            conditions,
            outputs,
            priority,
        });
        Ok(())
    }

    pub fn evaluate(&self, context: &ExecutionContext) -> Result<TableResult, DecisionError> {
        let resolved = self.resolve_inputs(context)?;

        let matched_rows: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                row.conditions
                    .iter()
                    .zip(&resolved)
                    .all(|(condition, value)| condition.matches(value))
            })
            .map(|(index, _)| index)
            .collect();

        debug!(table = %self.name, matches = matched_rows.len(), policy = %self.hit_policy, "table evaluated");

        let outputs = match self.hit_policy {
            HitPolicy::Unique | HitPolicy::First => match matched_rows.first() {
                Some(&index) => self.row_outputs(index),
                None => self.default_outputs(),
            },
            HitPolicy::Priority => {
                // max_by_key takes the last maximum, so reversing keeps
                // declaration order as the tie-break.
                match matched_rows
                    .iter()
                    .rev()
                    .max_by_key(|&&index| self.rows[index].priority)
                {
                    Some(&index) => self.row_outputs(index),
                    None => self.default_outputs(),
                }
            }
            HitPolicy::Any => match matched_rows.split_first() {
                Some((&first, rest)) => {
                    for &other in rest {
                        if self.rows[other].outputs != self.rows[first].outputs {
                            return Err(DecisionError::Conflict(format!(
                                "table '{}': rows {} and {} match with differing outputs under ANY",
                                self.name, first, other
                            )));
                        }
                    }
                    self.row_outputs(first)
                }
                None => self.default_outputs(),
            },
            HitPolicy::Collect => self.collect_outputs(&matched_rows, true),
            HitPolicy::RuleOrder => self.collect_outputs(&matched_rows, false),
        };

        Ok(TableResult {
            outputs,
            matched_rows,
            hit_policy: self.hit_policy,
        })
    }

    /// Optional completeness pass for Unique tables: reports row pairs
    /// that can both match some input. Conservative per-cell intersection
    /// check; never required at runtime.
    pub fn check_completeness(&self) -> Result<(), DecisionError> {
        for left in 0..self.rows.len() {
            for right in left + 1..self.rows.len() {
                let overlap = self.rows[left]
                    .conditions
                    .iter()
                    .zip(&self.rows[right].conditions)
                    .all(|(a, b)| cells_intersect(a, b));
                if overlap {
                    return Err(DecisionError::Conflict(format!(
                        "table '{}': rows {} and {} overlap under UNIQUE",
                        self.name, left, right
                    )));
                }
            }
        }
        Ok(())
    }

    fn resolve_inputs(&self, context: &ExecutionContext) -> Result<Vec<Value>, DecisionError> {
        self.inputs
            .iter()
            .map(|column| {
                resolve_path(&column.path, context).ok_or_else(|| DecisionError::UnresolvedPath {
                    column: column.name.clone(),
                    path: column.path.clone(),
                })
            })
            .collect()
    }

    fn row_outputs(&self, index: usize) -> BTreeMap<String, Value> {
        self.outputs
            .iter()
            .zip(&self.rows[index].outputs)
            .map(|(column, value)| (column.name.clone(), value.clone()))
            .collect()
    }

    fn default_outputs(&self) -> BTreeMap<String, Value> {
        self.outputs
            .iter()
            .map(|column| (column.name.clone(), column.default.clone()))
            .collect()
    }

    fn collect_outputs(&self, matched: &[usize], dedup: bool) -> BTreeMap<String, Value> {
        if matched.is_empty() {
            return self.default_outputs();
        }
        self.outputs
            .iter()
            .enumerate()
            .map(|(column_index, column)| {
                let mut values = Vec::new();
                for &row_index in matched {
                    let value = self.rows[row_index].outputs[column_index].clone();
                    if dedup && values.contains(&value) {
                        continue;
                    }
                    values.push(value);
                }
                (column.name.clone(), Value::List(values))
            })
            .collect()
    }
}

/// Resolves a dotted path against the context, walking map values.
fn resolve_path(path: &str, context: &ExecutionContext) -> Option<Value> {
    let mut segments = path.split('.');
    let root = segments.next()?;
    let mut current = context.get(root).ok()?;
    for segment in segments {
        current = match current {
            Value::Map(map) => map.get(segment)?.clone(),
            _ => return None,
        };
    }
    Some(current)
}

fn cells_intersect(a: &CellCondition, b: &CellCondition) -> bool {
    match (a, b) {
        (CellCondition::Any, _) | (_, CellCondition::Any) => true,
        (CellCondition::Equals(v), other) | (other, CellCondition::Equals(v)) => other.matches(v),
        (CellCondition::In(members), other) | (other, CellCondition::In(members)) => {
            members.iter().any(|member| other.matches(member))
        }
        (CellCondition::Compare { .. }, CellCondition::Compare { .. })
        | (CellCondition::Compare { .. }, CellCondition::Range { .. })
        | (CellCondition::Range { .. }, CellCondition::Compare { .. })
        | (CellCondition::Range { .. }, CellCondition::Range { .. }) => {
            intervals_overlap(interval_of(a), interval_of(b))
        }
    }
}

// Closed/open interval endpoints for numeric cells.
fn interval_of(cell: &CellCondition) -> (f64, f64, bool, bool) {
    match cell {
        CellCondition::Compare { op, bound } => match op {
            CompareOp::Ge => (*bound, f64::INFINITY, true, true),
            CompareOp::Gt => (*bound, f64::INFINITY, false, true),
            CompareOp::Le => (f64::NEG_INFINITY, *bound, true, true),
            CompareOp::Lt => (f64::NEG_INFINITY, *bound, true, false),
        },
        CellCondition::Range { low, high } => (*low, *high, true, true),
        _ => (f64::NEG_INFINITY, f64::INFINITY, true, true),
    }
}

fn intervals_overlap(a: (f64, f64, bool, bool), b: (f64, f64, bool, bool)) -> bool {
    let (a_low, a_high, a_low_closed, a_high_closed) = a;
    let (b_low, b_high, b_low_closed, b_high_closed) = b;
    let low = a_low.max(b_low);
    let high = a_high.min(b_high);
    if low < high {
        return true;
    }
    if low > high {
        return false;
    }
    // Touching endpoints only intersect when both sides include them.
    let low_closed = if a_low >= b_low { a_low_closed } else { b_low_closed };
    let high_closed = if a_high <= b_high {
        a_high_closed
    } else {
        b_high_closed
    };
    low_closed && high_closed
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn context_with(entries: &[(&str, Value)]) -> ExecutionContext {
        let mut context = ExecutionContext::new();
        for (name, value) in entries {
            context.set(name, value.clone());
        }
        context
    }

    #[test]
    fn test_cell_condition_parsing() {
        assert_eq!(CellCondition::parse("*").unwrap(), CellCondition::Any);
        assert_eq!(
            CellCondition::parse(">= 25").unwrap(),
            CellCondition::Compare {
                op: CompareOp::Ge,
                bound: 25.0
            }
        );
        assert_eq!(
            CellCondition::parse("0..17").unwrap(),
            CellCondition::Range {
                low: 0.0,
                high: 17.0
            }
        );
        assert_eq!(
            CellCondition::parse("[gold, silver]").unwrap(),
            CellCondition::In(vec![
                Value::String("gold".to_string()),
                Value::String("silver".to_string())
            ])
        );
        assert_eq!(
            CellCondition::parse("premium").unwrap(),
            CellCondition::Equals(Value::String("premium".to_string()))
        );
        assert!(CellCondition::parse("").is_err());
    }

    #[test]
    fn test_basic_table() {
        let mut table = DecisionTable::new("basic", HitPolicy::First);
        table.add_input_column("age", "age");
        table.add_output_column("category", Value::String("unknown".to_string()));
        table
            .add_row(&["< 18"], vec![Value::String("minor".to_string())])
            .unwrap();
        table
            .add_row(&[">= 18"], vec![Value::String("adult".to_string())])
            .unwrap();

        let result = table
            .evaluate(&context_with(&[("age", Value::Integer(15))]))
            .unwrap();
        assert_eq!(
            result.outputs.get("category"),
            Some(&Value::String("minor".to_string()))
        );

        let result = table
            .evaluate(&context_with(&[("age", Value::Integer(25))]))
            .unwrap();
        assert_eq!(
            result.outputs.get("category"),
            Some(&Value::String("adult".to_string()))
        );
    }

    #[test]
    fn test_priority_policy_with_multi_input() {
        // Rows: (>=25, >=50000) -> (true, 0.05) priority 10,
        //       (>=18, >=30000) -> (true, 0.08) priority 5,
        //       (*, *)          -> (false, 0.0) priority 1.
        let mut table = DecisionTable::new("loan_approval", HitPolicy::Priority);
        table.add_input_column("age", "customer.age");
        table.add_input_column("income", "customer.income");
        table.add_output_column("approved", Value::Boolean(false));
        table.add_output_column("rate", Value::Float(0.0));
        table
            .add_row_with_priority(
                &[">= 25", ">= 50000"],
                vec![Value::Boolean(true), Value::Float(0.05)],
                10,
            )
            .unwrap();
        table
            .add_row_with_priority(
                &[">= 18", ">= 30000"],
                vec![Value::Boolean(true), Value::Float(0.08)],
                5,
            )
            .unwrap();
        table
            .add_row_with_priority(&["*", "*"], vec![Value::Boolean(false), Value::Float(0.0)], 1)
            .unwrap();

        let customer = Value::Map(HashMap::from([
            ("age".to_string(), Value::Integer(30)),
            ("income".to_string(), Value::Integer(60_000)),
        ]));
        let result = table
            .evaluate(&context_with(&[("customer", customer)]))
            .unwrap();

        assert_eq!(result.outputs.get("approved"), Some(&Value::Boolean(true)));
        assert_eq!(result.outputs.get("rate"), Some(&Value::Float(0.05)));
        assert_eq!(result.matched_rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_wildcard() {
        let mut table = DecisionTable::new("wildcard", HitPolicy::First);
        table.add_input_column("status", "status");
        table.add_output_column("action", Value::String("none".to_string()));
        table
            .add_row(&["*"], vec![Value::String("default_action".to_string())])
            .unwrap();

        let result = table
            .evaluate(&context_with(&[(
                "status",
                Value::String("anything".to_string()),
            )]))
            .unwrap();
        assert_eq!(
            result.outputs.get("action"),
            Some(&Value::String("default_action".to_string()))
        );
    }

    #[test]
    fn test_ranges() {
        let mut table = DecisionTable::new("age_range", HitPolicy::First);
        table.add_input_column("age", "age");
        table.add_output_column("group", Value::String("unknown".to_string()));
        table
            .add_row(&["0..17"], vec![Value::String("child".to_string())])
            .unwrap();
        table
            .add_row(&["18..64"], vec![Value::String("adult".to_string())])
            .unwrap();
        table
            .add_row(&["65..120"], vec![Value::String("senior".to_string())])
            .unwrap();

        for (age, group) in [(10, "child"), (30, "adult"), (70, "senior"), (18, "adult")] {
            let result = table
                .evaluate(&context_with(&[("age", Value::Integer(age))]))
                .unwrap();
            assert_eq!(
                result.outputs.get("group"),
                Some(&Value::String(group.to_string())),
                "age {}",
                age
            );
        }
    }

    #[test]
    fn test_collect_deduplicates() {
        let mut table = DecisionTable::new("discount_collect", HitPolicy::Collect);
        table.add_input_column("customer_type", "customer_type");
        table.add_output_column("discount", Value::Float(0.0));
        table.add_row(&["premium"], vec![Value::Float(0.10)]).unwrap();
        table.add_row(&["premium"], vec![Value::Float(0.05)]).unwrap();
        table.add_row(&["premium"], vec![Value::Float(0.10)]).unwrap();

        let result = table
            .evaluate(&context_with(&[(
                "customer_type",
                Value::String("premium".to_string()),
            )]))
            .unwrap();

        assert_eq!(
            result.outputs.get("discount"),
            Some(&Value::List(vec![Value::Float(0.10), Value::Float(0.05)]))
        );
    }

    #[test]
    fn test_rule_order_keeps_duplicates() {
        let mut table = DecisionTable::new("discount_order", HitPolicy::RuleOrder);
        table.add_input_column("customer_type", "customer_type");
        table.add_output_column("discount", Value::Float(0.0));
        table.add_row(&["premium"], vec![Value::Float(0.10)]).unwrap();
        table.add_row(&["premium"], vec![Value::Float(0.05)]).unwrap();
        table.add_row(&["premium"], vec![Value::Float(0.10)]).unwrap();

        let result = table
            .evaluate(&context_with(&[(
                "customer_type",
                Value::String("premium".to_string()),
            )]))
            .unwrap();

        assert_eq!(
            result.outputs.get("discount"),
            Some(&Value::List(vec![
                Value::Float(0.10),
                Value::Float(0.05),
                Value::Float(0.10)
            ]))
        );
    }

    #[test]
    fn test_no_match_yields_defaults() {
        let mut table = DecisionTable::new("defaults", HitPolicy::First);
        table.add_input_column("category", "category");
        table.add_output_column("price", Value::Float(100.0));
        table.add_row(&["special"], vec![Value::Float(50.0)]).unwrap();

        let result = table
            .evaluate(&context_with(&[(
                "category",
                Value::String("normal".to_string()),
            )]))
            .unwrap();
        assert_eq!(result.outputs.get("price"), Some(&Value::Float(100.0)));
        assert!(result.matched_rows.is_empty());
    }

    #[test]
    fn test_comparison_operators() {
        let mut table = DecisionTable::new("grades", HitPolicy::First);
        table.add_input_column("score", "score");
        table.add_output_column("grade", Value::String("F".to_string()));
        table.add_row(&[">= 90"], vec![Value::String("A".to_string())]).unwrap();
        table.add_row(&[">= 80"], vec![Value::String("B".to_string())]).unwrap();
        table.add_row(&[">= 70"], vec![Value::String("C".to_string())]).unwrap();
        table.add_row(&["< 70"], vec![Value::String("F".to_string())]).unwrap();

        for (score, grade) in [(95, "A"), (85, "B"), (75, "C"), (65, "F")] {
            let result = table
                .evaluate(&context_with(&[("score", Value::Integer(score))]))
                .unwrap();
            assert_eq!(
                result.outputs.get("grade"),
                Some(&Value::String(grade.to_string()))
            );
        }
    }

    #[test]
    fn test_any_policy_conflict() {
        let mut table = DecisionTable::new("any", HitPolicy::Any);
        table.add_input_column("flag", "flag");
        table.add_output_column("out", Value::Integer(0));
        table.add_row(&["true"], vec![Value::Integer(1)]).unwrap();
        table.add_row(&["*"], vec![Value::Integer(2)]).unwrap();

        let err = table
            .evaluate(&context_with(&[("flag", Value::Boolean(true))]))
            .unwrap_err();
        assert!(matches!(err, DecisionError::Conflict(_)));
    }

    #[test]
    fn test_any_policy_agreement() {
        let mut table = DecisionTable::new("any", HitPolicy::Any);
        table.add_input_column("flag", "flag");
        table.add_output_column("out", Value::Integer(0));
        table.add_row(&["true"], vec![Value::Integer(1)]).unwrap();
        table.add_row(&["*"], vec![Value::Integer(1)]).unwrap();

        let result = table
            .evaluate(&context_with(&[("flag", Value::Boolean(true))]))
            .unwrap();
        assert_eq!(result.outputs.get("out"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_row_arity_checked_at_load() {
        let mut table = DecisionTable::new("arity", HitPolicy::First);
        table.add_input_column("a", "a");
        table.add_input_column("b", "b");
        table.add_output_column("out", Value::Null);

        let err = table.add_row(&["*"], vec![Value::Integer(1)]).unwrap_err();
        assert!(matches!(err, DecisionError::RowArity { expected: 2, got: 1 }));
    }

    #[test]
    fn test_unresolved_path_is_an_error() {
        let mut table = DecisionTable::new("paths", HitPolicy::First);
        table.add_input_column("age", "customer.age");
        table.add_output_column("out", Value::Null);
        table.add_row(&["*"], vec![Value::Integer(1)]).unwrap();

        let err = table.evaluate(&ExecutionContext::new()).unwrap_err();
        assert!(matches!(err, DecisionError::UnresolvedPath { .. }));
    }

    #[test]
    fn test_completeness_detects_overlap() {
        let mut table = DecisionTable::new("overlap", HitPolicy::Unique);
        table.add_input_column("age", "age");
        table.add_output_column("out", Value::Null);
        table.add_row(&[">= 18"], vec![Value::Integer(1)]).unwrap();
        table.add_row(&["10..20"], vec![Value::Integer(2)]).unwrap();

        assert!(matches!(
            table.check_completeness(),
            Err(DecisionError::Conflict(_))
        ));
    }

    #[test]
    fn test_completeness_passes_disjoint_rows() {
        let mut table = DecisionTable::new("disjoint", HitPolicy::Unique);
        table.add_input_column("age", "age");
        table.add_output_column("out", Value::Null);
        table.add_row(&["< 18"], vec![Value::Integer(1)]).unwrap();
        table.add_row(&[">= 18"], vec![Value::Integer(2)]).unwrap();

        table.check_completeness().unwrap();
    }
}
