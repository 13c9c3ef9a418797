// Expression Evaluator
//
// Walks an expression tree against the register context.
//
// Unknowns: for every operator, a `missing` operand makes the result
// `missing` and otherwise a `null` operand makes it `null`. AND/OR are the
// exception: a `false` (AND) or `true` (OR) operand decides the result even
// next to `missing`. Recoverable failures go through the typing mode.

use std::cmp::Ordering;

use crate::common::CollectionKind;
use crate::query::executor::context::{CaseSensitivity, Environment, Resolution};
use crate::query::executor::engine::TypingMode;
use crate::query::executor::operators::Operator;
use crate::query::executor::result::{QueryError, QueryResult};
use crate::value::Value;

use super::arithmetic;
use super::{BinaryOp, Expr, PathStep, Subquery, SubqueryKind, UnaryOp};

impl Expr {
    /// Evaluate against the current row.
    pub fn evaluate(&self, env: &mut Environment) -> QueryResult<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Slot(slot) => env.get_slot(*slot).cloned(),
            Expr::DynamicLookup(name) => match env.resolve(name) {
                Resolution::Slot(slot) => env.get_slot(slot).cloned(),
                Resolution::Attribute(slot) => Ok(env
                    .get_slot(slot)?
                    .field(&name.name, name.case)
                    .cloned()
                    .unwrap_or(Value::Missing)),
                Resolution::Ambiguous(slots) => Err(QueryError::AmbiguousBinding(format!(
                    "'{}' matches {} bindings",
                    name.name,
                    slots.len()
                ))),
                Resolution::Unresolved => match env.typing_mode() {
                    TypingMode::Permissive => Ok(Value::Missing),
                    TypingMode::Strict => Err(QueryError::UnresolvedBinding(name.name.clone())),
                },
            },
            Expr::Path { root, steps } => {
                let root = root.evaluate(env)?;
                navigate(root, steps, env)
            }
            Expr::Unary { op, operand } => {
                let value = operand.evaluate(env)?;
                if value.is_absent() {
                    return Ok(value);
                }
                let result = match op {
                    UnaryOp::Neg => arithmetic::negate(&value),
                    UnaryOp::Pos => arithmetic::identity(&value),
                };
                result.or_else(|e| env.coerce_error(e))
            }
            Expr::Binary { op, left, right } => {
                let a = left.evaluate(env)?;
                let b = right.evaluate(env)?;
                binary(*op, &a, &b, env)
            }
            Expr::And(left, right) => {
                let a = logical_operand(left.evaluate(env)?, env)?;
                if a == Value::Bool(false) {
                    return Ok(a);
                }
                let b = logical_operand(right.evaluate(env)?, env)?;
                Ok(match (&a, &b) {
                    (_, Value::Bool(false)) => Value::Bool(false),
                    (Value::Bool(true), Value::Bool(true)) => Value::Bool(true),
                    _ => unknown_of(&a, &b),
                })
            }
            Expr::Or(left, right) => {
                let a = logical_operand(left.evaluate(env)?, env)?;
                if a == Value::Bool(true) {
                    return Ok(a);
                }
                let b = logical_operand(right.evaluate(env)?, env)?;
                Ok(match (&a, &b) {
                    (_, Value::Bool(true)) => Value::Bool(true),
                    (Value::Bool(false), Value::Bool(false)) => Value::Bool(false),
                    _ => unknown_of(&a, &b),
                })
            }
            Expr::Not(operand) => match logical_operand(operand.evaluate(env)?, env)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                unknown => Ok(unknown),
            },
            Expr::IsNull { operand, negated } => {
                let value = operand.evaluate(env)?;
                Ok(Value::Bool(value.is_absent() != *negated))
            }
            Expr::IsMissing { operand, negated } => {
                let value = operand.evaluate(env)?;
                Ok(Value::Bool(value.is_missing() != *negated))
            }
            Expr::In { needle, haystack } => {
                let needle = needle.evaluate(env)?;
                let haystack = haystack.evaluate(env)?;
                membership(&needle, &haystack, env)
            }
            Expr::Between { operand, low, high } => {
                let value = operand.evaluate(env)?;
                let low = low.evaluate(env)?;
                let high = high.evaluate(env)?;
                let above = binary(BinaryOp::GtEq, &value, &low, env)?;
                let below = binary(BinaryOp::LtEq, &value, &high, env)?;
                Ok(match (&above, &below) {
                    (Value::Bool(false), _) | (_, Value::Bool(false)) => Value::Bool(false),
                    (Value::Bool(true), Value::Bool(true)) => Value::Bool(true),
                    _ => unknown_of(&above, &below),
                })
            }
            Expr::Case { branches, default } => {
                for (condition, result) in branches {
                    if condition.evaluate(env)? == Value::Bool(true) {
                        return result.evaluate(env);
                    }
                }
                match default {
                    Some(default) => default.evaluate(env),
                    None => Ok(Value::null()),
                }
            }
            Expr::Call(call) => call.evaluate(env),
            Expr::StructCtor(fields) => {
                let mut built = Vec::with_capacity(fields.len());
                for (key, value) in fields {
                    let key = key.evaluate(env)?;
                    let value = value.evaluate(env)?;
                    let Some(name) = key.as_text() else {
                        env.coerce_error(QueryError::type_mismatch("text for a struct field name", &key))?;
                        continue;
                    };
                    if !value.is_missing() {
                        built.push((name.to_string(), value));
                    }
                }
                Ok(Value::Struct(built))
            }
            Expr::ListCtor(items) => Ok(Value::List(evaluate_all(items, env)?)),
            Expr::BagCtor(items) => Ok(Value::Bag(evaluate_all(items, env)?)),
            Expr::SexpCtor(items) => Ok(Value::Sexp(evaluate_all(items, env)?)),
            Expr::StructMerge(parts) => {
                let mut merged = Vec::new();
                for (i, part) in parts.iter().enumerate() {
                    match part.evaluate(env)? {
                        Value::Struct(fields) => merged.extend(fields),
                        Value::Missing => {}
                        other => merged.push((format!("_{}", i + 1), other)),
                    }
                }
                Ok(Value::Struct(merged))
            }
            Expr::Subquery(subquery) => evaluate_subquery(subquery, env),
            Expr::Located { location, expr } => expr.evaluate(env).map_err(|e| e.at(*location)),
        }
    }
}

fn evaluate_all(items: &[Expr], env: &mut Environment) -> QueryResult<Vec<Value>> {
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        values.push(item.evaluate(env)?);
    }
    Ok(values)
}

/// Missing if either side is missing, otherwise null
fn unknown_of(a: &Value, b: &Value) -> Value {
    if a.is_missing() || b.is_missing() {
        Value::Missing
    } else {
        Value::null()
    }
}

/// Booleans and unknowns pass; anything else is a type error.
fn logical_operand(value: Value, env: &Environment) -> QueryResult<Value> {
    match value {
        Value::Bool(_) | Value::Missing | Value::Null(_) => Ok(value),
        other => env.coerce_error(QueryError::type_mismatch("a boolean", &other)),
    }
}

fn binary(op: BinaryOp, a: &Value, b: &Value, env: &Environment) -> QueryResult<Value> {
    if a.is_absent() || b.is_absent() {
        return Ok(unknown_of(a, b));
    }

    let result = match op {
        BinaryOp::Add => arithmetic::add(a, b),
        BinaryOp::Sub => arithmetic::subtract(a, b),
        BinaryOp::Mul => arithmetic::multiply(a, b),
        BinaryOp::Div => arithmetic::divide(a, b),
        BinaryOp::Mod => arithmetic::remainder(a, b),
        BinaryOp::Concat => arithmetic::concat(a, b),
        BinaryOp::Eq => Ok(a.sql_eq(b)),
        BinaryOp::NotEq => Ok(match a.sql_eq(b) {
            Value::Bool(eq) => Value::Bool(!eq),
            unknown => unknown,
        }),
        BinaryOp::Lt => a.sql_compare(b).map(|o| Value::Bool(o == Ordering::Less)),
        BinaryOp::LtEq => a.sql_compare(b).map(|o| Value::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => a.sql_compare(b).map(|o| Value::Bool(o == Ordering::Greater)),
        BinaryOp::GtEq => a.sql_compare(b).map(|o| Value::Bool(o != Ordering::Less)),
    };
    result.or_else(|e| env.coerce_error(e))
}

/// Three-valued `IN`: true on a match, unknown if no match but some element
/// comparison was unknown, otherwise false.
fn membership(needle: &Value, haystack: &Value, env: &Environment) -> QueryResult<Value> {
    if haystack.is_absent() {
        return Ok(unknown_of(needle, haystack));
    }
    let Some(elements) = haystack.elements() else {
        return env.coerce_error(QueryError::type_mismatch("a collection for IN", haystack));
    };
    if needle.is_missing() {
        return Ok(Value::Missing);
    }

    let mut unknown = false;
    for element in elements {
        match needle.sql_eq(element) {
            Value::Bool(true) => return Ok(Value::Bool(true)),
            Value::Bool(false) => {}
            _ => unknown = true,
        }
    }
    Ok(if unknown { Value::null() } else { Value::Bool(false) })
}

/// Apply path steps. Steps after a wildcard apply to every element and the
/// result is a bag of whatever survives; unmatched steps yield `missing`.
fn navigate(root: Value, steps: &[PathStep], env: &mut Environment) -> QueryResult<Value> {
    let mut current = vec![root];
    let mut fanned_out = false;

    for step in steps {
        match step {
            PathStep::Field(name) => {
                for value in current.iter_mut() {
                    *value = value.field(&name.name, name.case).cloned().unwrap_or(Value::Missing);
                }
            }
            PathStep::Index(index) => {
                let index = index.evaluate(env)?;
                for value in current.iter_mut() {
                    *value = index_into(value, &index);
                }
            }
            PathStep::Wildcard => {
                fanned_out = true;
                current = current
                    .into_iter()
                    .flat_map(|value| match value {
                        Value::List(items) | Value::Bag(items) | Value::Sexp(items) => items,
                        Value::Struct(fields) => fields.into_iter().map(|(_, v)| v).collect(),
                        Value::Missing => Vec::new(),
                        scalar => vec![scalar],
                    })
                    .collect();
            }
        }
        if fanned_out {
            current.retain(|v| !v.is_missing());
        }
    }

    if fanned_out {
        Ok(Value::Bag(current))
    } else {
        Ok(current.pop().unwrap_or(Value::Missing))
    }
}

fn index_into(value: &Value, index: &Value) -> Value {
    match (value, index) {
        (Value::List(items) | Value::Sexp(items), _) if index.as_i128().is_some() => index
            .as_i128()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Missing),
        (Value::Struct(_), _) => match index.as_text() {
            Some(name) => value.field(name, CaseSensitivity::Sensitive).cloned().unwrap_or(Value::Missing),
            None => Value::Missing,
        },
        _ => Value::Missing,
    }
}

fn drain(root: &mut dyn Operator, result: &Expr, env: &mut Environment) -> QueryResult<Vec<Value>> {
    root.open(env)?;
    let mut rows = Vec::new();
    while root.advance(env)? {
        rows.push(result.evaluate(env)?);
    }
    Ok(rows)
}

fn evaluate_subquery(subquery: &Subquery, env: &mut Environment) -> QueryResult<Value> {
    env.push_scope(&subquery.bindings);
    let (rows, kind) = {
        let mut root = subquery.root.lock();
        let drained = drain(&mut *root, &subquery.result, env);
        let closed = root.close();
        (drained.and_then(|rows| closed.map(|_| rows)), root.output_kind())
    };
    env.pop_scope()?;
    let rows = rows?;

    match subquery.kind {
        SubqueryKind::Collection => Ok(match kind {
            CollectionKind::List => Value::List(rows),
            CollectionKind::Bag => Value::Bag(rows),
        }),
        SubqueryKind::Scalar => {
            let mut rows = rows;
            match rows.len() {
                0 => Ok(Value::null()),
                1 => Ok(match rows.pop() {
                    Some(Value::Struct(mut fields)) if fields.len() == 1 => {
                        fields.pop().map_or(Value::Missing, |(_, v)| v)
                    }
                    Some(row) => row,
                    None => Value::null(),
                }),
                n => env.coerce_error(QueryError::DataTypeMismatch(format!(
                    "scalar subquery produced {} rows",
                    n
                ))),
            }
        }
    }
}
