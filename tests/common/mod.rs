#![allow(dead_code)]

use anyhow::Result;
use partiql_exec::query::executor::operators::{create_scan, OperatorRef};
use partiql_exec::query::executor::Expr;
use partiql_exec::{ExecutionConfig, ExecutionEngine, QueryPlan, Statement, TypingMode, Value};

// Build a list of Int64 values
pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|&i| Value::Int64(i)).collect()
}

// A bag literal of Int64 values
pub fn int_bag(values: &[i64]) -> Expr {
    Expr::lit(Value::bag(ints(values)))
}

// Scan a literal collection into the given slot
pub fn scan_values(values: Vec<Value>, slot: usize) -> Result<OperatorRef> {
    Ok(create_scan(Expr::lit(Value::bag(values)), slot, None)?)
}

// A struct row with the given fields
pub fn row(fields: &[(&str, Value)]) -> Value {
    Value::struct_from(fields.iter().map(|(k, v)| (k.to_string(), v.clone())))
}

// Named bindings for a plan's registers
pub fn bindings(names: &[&str]) -> Vec<Option<String>> {
    names.iter().map(|n| Some(n.to_string())).collect()
}

pub fn engine(mode: TypingMode) -> ExecutionEngine {
    ExecutionEngine::new(ExecutionConfig {
        typing_mode: mode,
        ..ExecutionConfig::default()
    })
}

// Run a plan with default configuration
pub fn run(root: OperatorRef, result: Expr, names: &[&str]) -> Result<Value> {
    let plan = QueryPlan::new(root, result, bindings(names));
    Ok(ExecutionEngine::default().execute(Statement::Query(plan))?)
}

// Elements of a collection result in canonical order, for bag comparisons
pub fn sorted_elements(value: Value) -> Vec<Value> {
    let mut elements = value.into_elements().unwrap_or_default();
    elements.sort();
    elements
}
