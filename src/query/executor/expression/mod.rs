// Scalar Expressions
//
// Expression trees embedded in the operator tree by the planner. Evaluation
// reads the register context and produces one value per call; see
// `evaluator.rs`.

pub mod arithmetic;
mod evaluator;
pub mod functions;

use std::fmt;

use crate::common::{SlotId, SourceLocation};
use crate::query::executor::context::BindingName;
use crate::query::executor::operators::OperatorRef;
use crate::value::Value;

pub use self::functions::{builtins, FunctionCall, FunctionRegistry, FunctionSignature, ScalarFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// Text concatenation `||`
    Concat,
}

/// One navigation step of a path expression
#[derive(Debug, Clone)]
pub enum PathStep {
    /// `.name`
    Field(BindingName),
    /// `[expr]`: an integer indexes a list or s-expression, text names a
    /// struct field exactly
    Index(Box<Expr>),
    /// `[*]` over a collection, `.*` over a struct
    Wildcard,
}

/// How a nested query's rows become a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    /// The rows as a bag or list
    Collection,
    /// The single row's value; null when there is no row
    Scalar,
}

/// A nested query evaluated against the current row.
///
/// Its registers live in a scope pushed on top of the enclosing ones for the
/// duration of each evaluation.
#[derive(Clone)]
pub struct Subquery {
    pub root: OperatorRef,
    pub result: Expr,
    pub bindings: Vec<Option<String>>,
    pub kind: SubqueryKind,
}

impl fmt::Debug for Subquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subquery")
            .field("result", &self.result)
            .field("bindings", &self.bindings)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Scalar expression node
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    /// Read a planner-assigned register
    Slot(SlotId),
    /// Name resolved at run time, falling back to attributes of bound rows
    DynamicLookup(BindingName),
    Path { root: Box<Expr>, steps: Vec<PathStep> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// `IS [NOT] NULL`, true for missing as well
    IsNull { operand: Box<Expr>, negated: bool },
    IsMissing { operand: Box<Expr>, negated: bool },
    In { needle: Box<Expr>, haystack: Box<Expr> },
    Between { operand: Box<Expr>, low: Box<Expr>, high: Box<Expr> },
    /// Searched `CASE`
    Case { branches: Vec<(Expr, Expr)>, default: Option<Box<Expr>> },
    Call(FunctionCall),
    StructCtor(Vec<(Expr, Expr)>),
    ListCtor(Vec<Expr>),
    BagCtor(Vec<Expr>),
    SexpCtor(Vec<Expr>),
    /// `SELECT *` style merge of struct fields
    StructMerge(Vec<Expr>),
    Subquery(Box<Subquery>),
    /// Attach a source position to errors raised below
    Located { location: SourceLocation, expr: Box<Expr> },
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn slot(slot: SlotId) -> Self {
        Expr::Slot(slot)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary { op, operand: Box::new(operand) }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Not(Box::new(operand))
    }

    pub fn path(root: Expr, steps: Vec<PathStep>) -> Self {
        Expr::Path { root: Box::new(root), steps }
    }

    /// `root.name` with a regular (case-insensitive) identifier
    pub fn field(root: Expr, name: &str) -> Self {
        Expr::path(root, vec![PathStep::Field(BindingName::regular(name))])
    }

    pub fn located(self, location: SourceLocation) -> Self {
        Expr::Located { location, expr: Box::new(self) }
    }
}
