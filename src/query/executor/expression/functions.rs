// Scalar Functions
//
// The function call node, its invocation policy, and the built-in library.
//
// Every call evaluates its arguments left to right. A `missing` argument
// short-circuits to `missing` and a `null` argument to the function's typed
// null, unless the signature opts out. A failing body is handed to the typing
// mode: permissive turns recoverable errors into `missing`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::query::executor::context::Environment;
use crate::query::executor::expression::arithmetic;
use crate::query::executor::expression::Expr;
use crate::query::executor::result::{QueryError, QueryResult};
use crate::value::{Value, ValueType};

/// Arity and unknown-handling declared by a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: &'static str,
    pub min_arity: usize,
    pub max_arity: usize,
    /// Type of the null returned when an argument is null
    pub return_type: Option<ValueType>,
    pub propagates_null: bool,
    pub propagates_missing: bool,
}

impl FunctionSignature {
    pub const fn new(name: &'static str, min_arity: usize, max_arity: usize, return_type: Option<ValueType>) -> Self {
        FunctionSignature {
            name,
            min_arity,
            max_arity,
            return_type,
            propagates_null: true,
            propagates_missing: true,
        }
    }

    /// Signature for special forms that inspect unknown arguments themselves
    pub const fn inspecting_unknowns(mut self) -> Self {
        self.propagates_null = false;
        self.propagates_missing = false;
        self
    }

    pub fn accepts(&self, arity: usize) -> bool {
        (self.min_arity..=self.max_arity).contains(&arity)
    }

    fn arity_description(&self) -> String {
        if self.min_arity == self.max_arity {
            self.min_arity.to_string()
        } else if self.max_arity == usize::MAX {
            format!("at least {}", self.min_arity)
        } else {
            format!("{} to {}", self.min_arity, self.max_arity)
        }
    }
}

/// A resolved scalar function
pub trait ScalarFunction: Send + Sync {
    fn signature(&self) -> &FunctionSignature;

    /// Run the body. Unknown arguments have already been handled unless the
    /// signature opts out.
    fn invoke(&self, args: &[Value]) -> QueryResult<Value>;
}

/// A built-in backed by a plain function pointer
pub struct BuiltinFunction {
    signature: FunctionSignature,
    body: fn(&[Value]) -> QueryResult<Value>,
}

impl BuiltinFunction {
    pub const fn new(signature: FunctionSignature, body: fn(&[Value]) -> QueryResult<Value>) -> Self {
        BuiltinFunction { signature, body }
    }
}

impl ScalarFunction for BuiltinFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn invoke(&self, args: &[Value]) -> QueryResult<Value> {
        (self.body)(args)
    }
}

/// Function call node in an expression tree
#[derive(Clone)]
pub struct FunctionCall {
    function: Arc<dyn ScalarFunction>,
    args: Vec<Expr>,
    /// Result for a null argument, built once per node
    null_result: Value,
}

impl FunctionCall {
    pub fn new(function: Arc<dyn ScalarFunction>, args: Vec<Expr>) -> QueryResult<Self> {
        let signature = function.signature();
        if !signature.accepts(args.len()) {
            return Err(QueryError::ArityMismatch {
                name: signature.name.to_string(),
                expected: signature.arity_description(),
                actual: args.len(),
            });
        }
        let null_result = match signature.return_type {
            Some(t) => Value::typed_null(t),
            None => Value::null(),
        };
        Ok(FunctionCall { function, args, null_result })
    }

    pub fn name(&self) -> &'static str {
        self.function.signature().name
    }

    pub fn evaluate(&self, env: &mut Environment) -> QueryResult<Value> {
        let mut values = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            values.push(arg.evaluate(env)?);
        }

        let signature = self.function.signature();
        if signature.propagates_missing && values.iter().any(Value::is_missing) {
            return Ok(Value::Missing);
        }
        if signature.propagates_null && values.iter().any(Value::is_null) {
            return Ok(self.null_result.clone());
        }

        match self.function.invoke(&values) {
            Ok(value) => Ok(value),
            Err(error) => env.coerce_error(error),
        }
    }
}

impl fmt::Debug for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCall")
            .field("name", &self.name())
            .field("args", &self.args)
            .finish()
    }
}

/// Name-to-function table used when building plans
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ScalarFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in library
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (aliases, builtin) in builtin_table() {
            let function: Arc<dyn ScalarFunction> = Arc::new(builtin);
            for alias in aliases {
                registry.functions.insert(alias.to_string(), Arc::clone(&function));
            }
        }
        registry
    }

    /// Register under a case-insensitive name, replacing any previous entry.
    pub fn register(&mut self, name: &str, function: Arc<dyn ScalarFunction>) {
        self.functions.insert(name.to_lowercase(), function);
    }

    pub fn lookup(&self, name: &str, arity: usize) -> QueryResult<Arc<dyn ScalarFunction>> {
        let function = self
            .functions
            .get(&name.to_lowercase())
            .ok_or_else(|| QueryError::FunctionNotFound(name.to_string()))?;
        let signature = function.signature();
        if !signature.accepts(arity) {
            return Err(QueryError::ArityMismatch {
                name: name.to_string(),
                expected: signature.arity_description(),
                actual: arity,
            });
        }
        Ok(Arc::clone(function))
    }

    /// Look up `name` and build a call node over `args`.
    pub fn call(&self, name: &str, args: Vec<Expr>) -> QueryResult<FunctionCall> {
        let function = self.lookup(name, args.len())?;
        FunctionCall::new(function, args)
    }
}

static BUILTINS: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::with_builtins);

/// The shared built-in registry
pub fn builtins() -> &'static FunctionRegistry {
    &BUILTINS
}

fn text_arg<'a>(args: &'a [Value], i: usize) -> QueryResult<&'a str> {
    args[i].as_text().ok_or_else(|| QueryError::type_mismatch("text", &args[i]))
}

fn integer_arg(args: &[Value], i: usize) -> QueryResult<i128> {
    args[i].as_i128().ok_or_else(|| QueryError::type_mismatch("an integer", &args[i]))
}

fn upper(args: &[Value]) -> QueryResult<Value> {
    Ok(Value::String(text_arg(args, 0)?.to_uppercase()))
}

fn lower(args: &[Value]) -> QueryResult<Value> {
    Ok(Value::String(text_arg(args, 0)?.to_lowercase()))
}

fn char_length(args: &[Value]) -> QueryResult<Value> {
    let length = text_arg(args, 0)?.chars().count();
    Ok(Value::Int64(length as i64))
}

/// SUBSTRING(s, start [, length]) with 1-based positions. A start before the
/// first character still counts toward the length.
fn substring(args: &[Value]) -> QueryResult<Value> {
    let s = text_arg(args, 0)?;
    let start = integer_arg(args, 1)?;
    let end = match args.get(2) {
        Some(_) => {
            let length = integer_arg(args, 2)?;
            if length < 0 {
                return Err(QueryError::InvalidArgumentValue(format!(
                    "substring length must not be negative, got {}",
                    length
                )));
            }
            Some(start.saturating_add(length))
        }
        None => None,
    };

    let first = start.max(1);
    let result: String = s
        .chars()
        .enumerate()
        .map(|(i, c)| (i as i128 + 1, c))
        .filter(|(pos, _)| *pos >= first && end.map_or(true, |e| *pos < e))
        .map(|(_, c)| c)
        .collect();
    Ok(Value::String(result))
}

fn trim(args: &[Value]) -> QueryResult<Value> {
    Ok(Value::String(text_arg(args, 0)?.trim().to_string()))
}

fn abs(args: &[Value]) -> QueryResult<Value> {
    let overflow = || QueryError::NumericOverflow(format!("abs({})", args[0]));
    match &args[0] {
        Value::Int8(i) => i.checked_abs().map(Value::Int8).ok_or_else(overflow),
        Value::Int16(i) => i.checked_abs().map(Value::Int16).ok_or_else(overflow),
        Value::Int32(i) => i.checked_abs().map(Value::Int32).ok_or_else(overflow),
        Value::Int64(i) => i.checked_abs().map(Value::Int64).ok_or_else(overflow),
        Value::Int(i) => i.checked_abs().map(Value::Int).ok_or_else(overflow),
        Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
        Value::Real(r) => Ok(Value::Real(r.abs())),
        Value::Double(d) => Ok(Value::Double(d.abs())),
        other => Err(QueryError::type_mismatch("a number", other)),
    }
}

fn modulo(args: &[Value]) -> QueryResult<Value> {
    arithmetic::remainder(&args[0], &args[1])
}

fn ceil(args: &[Value]) -> QueryResult<Value> {
    match &args[0] {
        Value::Decimal(d) => Ok(Value::Decimal(d.ceil())),
        Value::Real(r) => Ok(Value::Real(r.ceil())),
        Value::Double(d) => Ok(Value::Double(d.ceil())),
        v if v.as_i128().is_some() => Ok(v.clone()),
        other => Err(QueryError::type_mismatch("a number", other)),
    }
}

fn floor(args: &[Value]) -> QueryResult<Value> {
    match &args[0] {
        Value::Decimal(d) => Ok(Value::Decimal(d.floor())),
        Value::Real(r) => Ok(Value::Real(r.floor())),
        Value::Double(d) => Ok(Value::Double(d.floor())),
        v if v.as_i128().is_some() => Ok(v.clone()),
        other => Err(QueryError::type_mismatch("a number", other)),
    }
}

fn size(args: &[Value]) -> QueryResult<Value> {
    let count = match &args[0] {
        Value::Struct(fields) => fields.len(),
        other => other
            .elements()
            .map(<[Value]>::len)
            .ok_or_else(|| QueryError::type_mismatch("a collection", other))?,
    };
    Ok(Value::Int64(count as i64))
}

fn exists(args: &[Value]) -> QueryResult<Value> {
    match &args[0] {
        Value::Struct(fields) => Ok(Value::Bool(!fields.is_empty())),
        other => other
            .elements()
            .map(|e| Value::Bool(!e.is_empty()))
            .ok_or_else(|| QueryError::type_mismatch("a collection", other)),
    }
}

/// First present argument; null if some argument was null, otherwise missing.
fn coalesce(args: &[Value]) -> QueryResult<Value> {
    if let Some(present) = args.iter().find(|v| !v.is_absent()) {
        return Ok(present.clone());
    }
    if args.iter().any(Value::is_null) {
        Ok(Value::null())
    } else {
        Ok(Value::Missing)
    }
}

fn nullif(args: &[Value]) -> QueryResult<Value> {
    if args[0].sql_eq(&args[1]) == Value::Bool(true) {
        Ok(Value::null())
    } else {
        Ok(args[0].clone())
    }
}

type BuiltinEntry = (&'static [&'static str], BuiltinFunction);

fn entry(aliases: &'static [&'static str], signature: FunctionSignature, body: fn(&[Value]) -> QueryResult<Value>) -> BuiltinEntry {
    (aliases, BuiltinFunction::new(signature, body))
}

fn builtin_table() -> Vec<BuiltinEntry> {
    vec![
        entry(&["upper"], FunctionSignature::new("upper", 1, 1, Some(ValueType::String)), upper),
        entry(&["lower"], FunctionSignature::new("lower", 1, 1, Some(ValueType::String)), lower),
        entry(
            &["char_length", "character_length"],
            FunctionSignature::new("char_length", 1, 1, Some(ValueType::Int64)),
            char_length,
        ),
        entry(&["substring"], FunctionSignature::new("substring", 2, 3, Some(ValueType::String)), substring),
        entry(&["trim"], FunctionSignature::new("trim", 1, 1, Some(ValueType::String)), trim),
        entry(&["abs"], FunctionSignature::new("abs", 1, 1, None), abs),
        entry(&["mod"], FunctionSignature::new("mod", 2, 2, None), modulo),
        entry(&["ceil", "ceiling"], FunctionSignature::new("ceil", 1, 1, None), ceil),
        entry(&["floor"], FunctionSignature::new("floor", 1, 1, None), floor),
        entry(&["size", "cardinality"], FunctionSignature::new("size", 1, 1, Some(ValueType::Int64)), size),
        entry(&["exists"], FunctionSignature::new("exists", 1, 1, Some(ValueType::Bool)), exists),
        entry(
            &["coalesce"],
            FunctionSignature::new("coalesce", 1, usize::MAX, None).inspecting_unknowns(),
            coalesce,
        ),
        entry(&["nullif"], FunctionSignature::new("nullif", 2, 2, None).inspecting_unknowns(), nullif),
    ]
}
