// Value Model
//
// This module defines the tagged runtime value shared by every part of the
// engine: scalars, the two unknowns (null and missing), temporal values, and
// the list/bag/s-expression/struct collections.

pub(crate) mod ordering;

pub use self::ordering::{compare, equals};

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::CollectionKind;
use crate::query::executor::context::CaseSensitivity;

/// Largest precision accepted for DECIMAL(p, s)
pub const MAX_DECIMAL_PRECISION: u32 = 38;

/// Largest scale the decimal representation can carry
pub const MAX_DECIMAL_SCALE: u32 = 28;

/// Type tag carried by every value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueType {
    Missing,
    Null,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Int,
    Decimal,
    Real,
    Double,
    Char,
    VarChar,
    String,
    Symbol,
    Blob,
    Clob,
    Date,
    Time,
    TimeWithTimeZone,
    Timestamp,
    TimestampWithTimeZone,
    List,
    Bag,
    Sexp,
    Struct,
}

impl ValueType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueType::Int8
                | ValueType::Int16
                | ValueType::Int32
                | ValueType::Int64
                | ValueType::Int
                | ValueType::Decimal
                | ValueType::Real
                | ValueType::Double
        )
    }

    pub fn is_text(self) -> bool {
        matches!(self, ValueType::Char | ValueType::VarChar | ValueType::String | ValueType::Symbol)
    }

    pub fn is_collection(self) -> bool {
        matches!(self, ValueType::List | ValueType::Bag | ValueType::Sexp)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Missing => "MISSING",
            ValueType::Null => "NULL",
            ValueType::Bool => "BOOL",
            ValueType::Int8 => "TINYINT",
            ValueType::Int16 => "SMALLINT",
            ValueType::Int32 => "INT4",
            ValueType::Int64 => "INT8",
            ValueType::Int => "INT",
            ValueType::Decimal => "DECIMAL",
            ValueType::Real => "REAL",
            ValueType::Double => "DOUBLE PRECISION",
            ValueType::Char => "CHAR",
            ValueType::VarChar => "VARCHAR",
            ValueType::String => "STRING",
            ValueType::Symbol => "SYMBOL",
            ValueType::Blob => "BLOB",
            ValueType::Clob => "CLOB",
            ValueType::Date => "DATE",
            ValueType::Time => "TIME",
            ValueType::TimeWithTimeZone => "TIME WITH TIME ZONE",
            ValueType::Timestamp => "TIMESTAMP",
            ValueType::TimestampWithTimeZone => "TIMESTAMP WITH TIME ZONE",
            ValueType::List => "LIST",
            ValueType::Bag => "BAG",
            ValueType::Sexp => "SEXP",
            ValueType::Struct => "STRUCT",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rejected value construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueConstructionError {
    #[error("decimal precision {0} outside 1..={MAX_DECIMAL_PRECISION}")]
    InvalidPrecision(u32),
    #[error("decimal scale {scale} exceeds precision {precision}")]
    ScaleExceedsPrecision { precision: u32, scale: u32 },
    #[error("decimal scale {0} exceeds the supported maximum of {MAX_DECIMAL_SCALE}")]
    UnsupportedScale(u32),
    #[error("decimal value {value} does not fit DECIMAL({precision}, {scale})")]
    DecimalOutOfRange { value: String, precision: u32, scale: u32 },
    #[error("character value of length {actual} exceeds declared length {declared}")]
    LengthExceeded { declared: usize, actual: usize },
}

/// A runtime value.
///
/// Values are immutable once built and own their children. The derived
/// equality and ordering impls (see `ordering.rs`) follow the engine-wide total
/// order, so `Value::Int64(1) == Value::Double(1.0)`; the three-valued SQL `=`
/// lives in the expression evaluator.
#[derive(Debug, Clone)]
pub enum Value {
    Missing,
    /// Null, optionally tagged with the type it stands in for
    Null(Option<ValueType>),
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    /// Widest exact integer
    Int(i128),
    Decimal(Decimal),
    Real(f32),
    Double(f64),
    Char(String),
    VarChar(String),
    String(String),
    Symbol(String),
    Blob(Vec<u8>),
    Clob(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    TimeTz(NaiveTime, FixedOffset),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    List(Vec<Value>),
    Bag(Vec<Value>),
    Sexp(Vec<Value>),
    /// Ordered fields; duplicate names are legal
    Struct(Vec<(String, Value)>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Missing
    }
}

impl Value {
    pub fn null() -> Self {
        Value::Null(None)
    }

    pub fn typed_null(value_type: ValueType) -> Self {
        Value::Null(Some(value_type))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn symbol(s: impl Into<String>) -> Self {
        Value::Symbol(s.into())
    }

    pub fn list(values: Vec<Value>) -> Self {
        Value::List(values)
    }

    pub fn bag(values: Vec<Value>) -> Self {
        Value::Bag(values)
    }

    pub fn sexp(values: Vec<Value>) -> Self {
        Value::Sexp(values)
    }

    pub fn struct_from<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a DECIMAL(precision, scale) value, rescaling `value` to `scale`.
    pub fn decimal(value: Decimal, precision: u32, scale: u32) -> Result<Self, ValueConstructionError> {
        if precision == 0 || precision > MAX_DECIMAL_PRECISION {
            return Err(ValueConstructionError::InvalidPrecision(precision));
        }
        if scale > precision {
            return Err(ValueConstructionError::ScaleExceedsPrecision { precision, scale });
        }
        if scale > MAX_DECIMAL_SCALE {
            return Err(ValueConstructionError::UnsupportedScale(scale));
        }

        let mut rescaled = value;
        rescaled.rescale(scale);
        let digits = rescaled.mantissa().unsigned_abs().checked_ilog10().map_or(1, |d| d + 1);
        if digits > precision || rescaled.scale() != scale {
            return Err(ValueConstructionError::DecimalOutOfRange {
                value: value.to_string(),
                precision,
                scale,
            });
        }
        Ok(Value::Decimal(rescaled))
    }

    /// Build a CHAR(length) value, padding with spaces.
    pub fn char_fixed(s: &str, length: usize) -> Result<Self, ValueConstructionError> {
        let actual = s.chars().count();
        if actual > length {
            return Err(ValueConstructionError::LengthExceeded { declared: length, actual });
        }
        let mut padded = String::with_capacity(length);
        padded.push_str(s);
        padded.extend(std::iter::repeat(' ').take(length - actual));
        Ok(Value::Char(padded))
    }

    /// Build a VARCHAR(max_length) value.
    pub fn varchar(s: &str, max_length: usize) -> Result<Self, ValueConstructionError> {
        let actual = s.chars().count();
        if actual > max_length {
            return Err(ValueConstructionError::LengthExceeded { declared: max_length, actual });
        }
        Ok(Value::VarChar(s.to_string()))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Missing => ValueType::Missing,
            Value::Null(_) => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int8(_) => ValueType::Int8,
            Value::Int16(_) => ValueType::Int16,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Int(_) => ValueType::Int,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Real(_) => ValueType::Real,
            Value::Double(_) => ValueType::Double,
            Value::Char(_) => ValueType::Char,
            Value::VarChar(_) => ValueType::VarChar,
            Value::String(_) => ValueType::String,
            Value::Symbol(_) => ValueType::Symbol,
            Value::Blob(_) => ValueType::Blob,
            Value::Clob(_) => ValueType::Clob,
            Value::Date(_) => ValueType::Date,
            Value::Time(_) => ValueType::Time,
            Value::TimeTz(..) => ValueType::TimeWithTimeZone,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::TimestampTz(_) => ValueType::TimestampWithTimeZone,
            Value::List(_) => ValueType::List,
            Value::Bag(_) => ValueType::Bag,
            Value::Sexp(_) => ValueType::Sexp,
            Value::Struct(_) => ValueType::Struct,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Null or missing
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Missing | Value::Null(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.value_type().is_numeric()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Exact integer content, if this is one of the integer representations
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int8(i) => Some(i128::from(*i)),
            Value::Int16(i) => Some(i128::from(*i)),
            Value::Int32(i) => Some(i128::from(*i)),
            Value::Int64(i) => Some(i128::from(*i)),
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Char(s) | Value::VarChar(s) | Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list, bag or s-expression
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) | Value::Bag(v) | Value::Sexp(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_elements(self) -> Result<Vec<Value>, Value> {
        match self {
            Value::List(v) | Value::Bag(v) | Value::Sexp(v) => Ok(v),
            other => Err(other),
        }
    }

    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self {
            Value::List(_) | Value::Sexp(_) => Some(CollectionKind::List),
            Value::Bag(_) => Some(CollectionKind::Bag),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// First field matching `name`; `None` for non-structs.
    pub fn field(&self, name: &str, case: CaseSensitivity) -> Option<&Value> {
        self.fields()?
            .iter()
            .find(|(key, _)| case.matches(name, key))
            .map(|(_, value)| value)
    }
}

fn write_sequence(f: &mut fmt::Formatter<'_>, open: &str, close: &str, sep: &str, values: &[Value]) -> fmt::Result {
    f.write_str(open)?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", v)?;
    }
    f.write_str(close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => write!(f, "MISSING"),
            Value::Null(_) => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Int8(i) => write!(f, "{}", i),
            Value::Int16(i) => write!(f, "{}", i),
            Value::Int32(i) => write!(f, "{}", i),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Int(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Real(r) => write!(f, "{:e}", r),
            Value::Double(d) => write!(f, "{:e}", d),
            Value::Char(s) | Value::VarChar(s) | Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Symbol(s) => write!(f, "`{}`", s),
            Value::Blob(b) => write!(f, "{{{{{}}}}}", hex::encode(b)),
            Value::Clob(b) => write!(f, "{{{{\"{}\"}}}}", String::from_utf8_lossy(b)),
            Value::Date(d) => write!(f, "DATE '{}'", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "TIME '{}'", t.format("%H:%M:%S%.f")),
            Value::TimeTz(t, off) => write!(f, "TIME WITH TIME ZONE '{}{}'", t.format("%H:%M:%S%.f"), off),
            Value::Timestamp(ts) => write!(f, "TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::TimestampTz(ts) => write!(f, "TIMESTAMP WITH TIME ZONE '{}'", ts.format("%Y-%m-%d %H:%M:%S%.f%:z")),
            Value::List(v) => write_sequence(f, "[", "]", ", ", v),
            Value::Bag(v) => write_sequence(f, "<<", ">>", ", ", v),
            Value::Sexp(v) => write_sequence(f, "(", ")", " ", v),
            Value::Struct(fields) => {
                f.write_str("{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{}': {}", k.replace('\'', "''"), v)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
