// Scalar Operators
//
// Arithmetic, comparison and concatenation over present (non-null,
// non-missing) operands. Unknown propagation and the typing-mode policy are
// applied by the evaluator before and after these run.
//
// Numeric promotion: any approximate operand makes the result DOUBLE (REAL if
// both are REAL); otherwise any DECIMAL operand makes it DECIMAL; otherwise
// the result is INT8-wide (`Int64`), or the widest `Int` when an operand
// already is one.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::query::executor::result::{QueryError, QueryResult};
use crate::value::ordering::{compare_numeric, Numeric};
use crate::value::{equals, Value};

enum Operands {
    Int64(i64, i64),
    Int(i128, i128),
    Decimal(Decimal, Decimal),
    Real(f32, f32),
    Double(f64, f64),
}

fn overflow(op: &str, a: &Value, b: &Value) -> QueryError {
    QueryError::NumericOverflow(format!("{} {} {}", a, op, b))
}

fn numeric_to_f64(n: Numeric) -> f64 {
    match n {
        Numeric::Exact(i) => i as f64,
        Numeric::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
        Numeric::Approx(f) => f,
    }
}

fn numeric_to_decimal(n: Numeric) -> QueryResult<Decimal> {
    match n {
        Numeric::Exact(i) => Decimal::try_from_i128_with_scale(i, 0)
            .map_err(|_| QueryError::NumericOverflow(format!("{} does not fit a DECIMAL", i))),
        Numeric::Decimal(d) => Ok(d),
        Numeric::Approx(f) => Decimal::from_f64_retain(f)
            .ok_or_else(|| QueryError::NumericOverflow(format!("{} does not fit a DECIMAL", f))),
    }
}

/// Lift a numeric value to DECIMAL; used by AVG and decimal functions.
pub fn to_decimal(value: &Value) -> QueryResult<Decimal> {
    let n = Numeric::of(value).ok_or_else(|| QueryError::type_mismatch("a number", value))?;
    numeric_to_decimal(n)
}

fn promote(op: &str, a: &Value, b: &Value) -> QueryResult<Operands> {
    let na = Numeric::of(a).ok_or_else(|| QueryError::type_mismatch(&format!("a number for '{}'", op), a))?;
    let nb = Numeric::of(b).ok_or_else(|| QueryError::type_mismatch(&format!("a number for '{}'", op), b))?;

    match (na, nb) {
        (Numeric::Approx(_), _) | (_, Numeric::Approx(_)) => {
            if let (Value::Real(x), Value::Real(y)) = (a, b) {
                Ok(Operands::Real(*x, *y))
            } else {
                Ok(Operands::Double(numeric_to_f64(na), numeric_to_f64(nb)))
            }
        }
        (Numeric::Decimal(_), _) | (_, Numeric::Decimal(_)) => {
            Ok(Operands::Decimal(numeric_to_decimal(na)?, numeric_to_decimal(nb)?))
        }
        (Numeric::Exact(x), Numeric::Exact(y)) => {
            if matches!(a, Value::Int(_)) || matches!(b, Value::Int(_)) {
                Ok(Operands::Int(x, y))
            } else {
                // Every narrower representation fits an i64
                Ok(Operands::Int64(x as i64, y as i64))
            }
        }
    }
}

pub fn add(a: &Value, b: &Value) -> QueryResult<Value> {
    match promote("+", a, b)? {
        Operands::Int64(x, y) => x.checked_add(y).map(Value::Int64).ok_or_else(|| overflow("+", a, b)),
        Operands::Int(x, y) => x.checked_add(y).map(Value::Int).ok_or_else(|| overflow("+", a, b)),
        Operands::Decimal(x, y) => x.checked_add(y).map(Value::Decimal).ok_or_else(|| overflow("+", a, b)),
        Operands::Real(x, y) => Ok(Value::Real(x + y)),
        Operands::Double(x, y) => Ok(Value::Double(x + y)),
    }
}

pub fn subtract(a: &Value, b: &Value) -> QueryResult<Value> {
    match promote("-", a, b)? {
        Operands::Int64(x, y) => x.checked_sub(y).map(Value::Int64).ok_or_else(|| overflow("-", a, b)),
        Operands::Int(x, y) => x.checked_sub(y).map(Value::Int).ok_or_else(|| overflow("-", a, b)),
        Operands::Decimal(x, y) => x.checked_sub(y).map(Value::Decimal).ok_or_else(|| overflow("-", a, b)),
        Operands::Real(x, y) => Ok(Value::Real(x - y)),
        Operands::Double(x, y) => Ok(Value::Double(x - y)),
    }
}

pub fn multiply(a: &Value, b: &Value) -> QueryResult<Value> {
    match promote("*", a, b)? {
        Operands::Int64(x, y) => x.checked_mul(y).map(Value::Int64).ok_or_else(|| overflow("*", a, b)),
        Operands::Int(x, y) => x.checked_mul(y).map(Value::Int).ok_or_else(|| overflow("*", a, b)),
        Operands::Decimal(x, y) => x.checked_mul(y).map(Value::Decimal).ok_or_else(|| overflow("*", a, b)),
        Operands::Real(x, y) => Ok(Value::Real(x * y)),
        Operands::Double(x, y) => Ok(Value::Double(x * y)),
    }
}

/// Integer division truncates toward zero.
pub fn divide(a: &Value, b: &Value) -> QueryResult<Value> {
    match promote("/", a, b)? {
        Operands::Int64(_, 0) | Operands::Int(_, 0) => Err(QueryError::DivisionByZero),
        Operands::Int64(x, y) => x.checked_div(y).map(Value::Int64).ok_or_else(|| overflow("/", a, b)),
        Operands::Int(x, y) => x.checked_div(y).map(Value::Int).ok_or_else(|| overflow("/", a, b)),
        Operands::Decimal(_, y) if y.is_zero() => Err(QueryError::DivisionByZero),
        Operands::Decimal(x, y) => x.checked_div(y).map(Value::Decimal).ok_or_else(|| overflow("/", a, b)),
        Operands::Real(_, y) if y == 0.0 => Err(QueryError::DivisionByZero),
        Operands::Real(x, y) => Ok(Value::Real(x / y)),
        Operands::Double(_, y) if y == 0.0 => Err(QueryError::DivisionByZero),
        Operands::Double(x, y) => Ok(Value::Double(x / y)),
    }
}

pub fn remainder(a: &Value, b: &Value) -> QueryResult<Value> {
    match promote("%", a, b)? {
        Operands::Int64(_, 0) | Operands::Int(_, 0) => Err(QueryError::DivisionByZero),
        Operands::Int64(x, y) => x.checked_rem(y).map(Value::Int64).ok_or_else(|| overflow("%", a, b)),
        Operands::Int(x, y) => x.checked_rem(y).map(Value::Int).ok_or_else(|| overflow("%", a, b)),
        Operands::Decimal(_, y) if y.is_zero() => Err(QueryError::DivisionByZero),
        Operands::Decimal(x, y) => x.checked_rem(y).map(Value::Decimal).ok_or_else(|| overflow("%", a, b)),
        Operands::Real(_, y) if y == 0.0 => Err(QueryError::DivisionByZero),
        Operands::Real(x, y) => Ok(Value::Real(x % y)),
        Operands::Double(_, y) if y == 0.0 => Err(QueryError::DivisionByZero),
        Operands::Double(x, y) => Ok(Value::Double(x % y)),
    }
}

pub fn negate(v: &Value) -> QueryResult<Value> {
    let overflow = || QueryError::NumericOverflow(format!("-({})", v));
    match v {
        Value::Int8(i) => i.checked_neg().map(Value::Int8).ok_or_else(overflow),
        Value::Int16(i) => i.checked_neg().map(Value::Int16).ok_or_else(overflow),
        Value::Int32(i) => i.checked_neg().map(Value::Int32).ok_or_else(overflow),
        Value::Int64(i) => i.checked_neg().map(Value::Int64).ok_or_else(overflow),
        Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
        Value::Decimal(d) => Ok(Value::Decimal(-*d)),
        Value::Real(r) => Ok(Value::Real(-r)),
        Value::Double(d) => Ok(Value::Double(-d)),
        other => Err(QueryError::type_mismatch("a number for unary '-'", other)),
    }
}

pub fn identity(v: &Value) -> QueryResult<Value> {
    if v.is_numeric() {
        Ok(v.clone())
    } else {
        Err(QueryError::type_mismatch("a number for unary '+'", v))
    }
}

/// Text concatenation, `||`
pub fn concat(a: &Value, b: &Value) -> QueryResult<Value> {
    match (a.as_text(), b.as_text()) {
        (Some(x), Some(y)) => Ok(Value::String(format!("{}{}", x, y))),
        (None, _) => Err(QueryError::type_mismatch("text for '||'", a)),
        (_, None) => Err(QueryError::type_mismatch("text for '||'", b)),
    }
}

impl Value {
    /// Three-valued `=`: missing if either side is missing, null if either
    /// side is null, otherwise whether the values are equal.
    pub fn sql_eq(&self, other: &Value) -> Value {
        if self.is_missing() || other.is_missing() {
            Value::Missing
        } else if self.is_null() || other.is_null() {
            Value::null()
        } else {
            Value::Bool(equals(self, other))
        }
    }

    /// Order two present values for `<`, `<=`, `>`, `>=`. Values of
    /// different categories are not comparable.
    pub fn sql_compare(&self, other: &Value) -> QueryResult<Ordering> {
        if let (Some(x), Some(y)) = (Numeric::of(self), Numeric::of(other)) {
            return Ok(compare_numeric(x, y));
        }
        let comparable = match (self, other) {
            (Value::Bool(_), Value::Bool(_)) | (Value::Date(_), Value::Date(_)) => true,
            (Value::Time(_) | Value::TimeTz(..), Value::Time(_) | Value::TimeTz(..)) => true,
            (Value::Timestamp(_) | Value::TimestampTz(_), Value::Timestamp(_) | Value::TimestampTz(_)) => true,
            (Value::Blob(_) | Value::Clob(_), Value::Blob(_) | Value::Clob(_)) => true,
            _ => self.as_text().is_some() && other.as_text().is_some(),
        };
        if comparable {
            Ok(self.cmp(other))
        } else {
            Err(QueryError::DataTypeMismatch(format!(
                "cannot compare {} with {}",
                self.value_type(),
                other.value_type()
            )))
        }
    }
}
