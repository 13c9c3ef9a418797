// Query Executor Module
//
// This module is responsible for executing compiled query plans and producing
// results. It implements the pull-based execution model for query processing.

pub mod context;
pub mod engine;
pub mod expression;
pub mod operators;
pub mod result;
pub mod source;

// Export key types
pub use self::context::{BindingName, CaseSensitivity, Environment};
pub use self::engine::{ExecutionConfig, ExecutionEngine, QueryPlan, ResultCursor, Statement, TypingMode};
pub use self::expression::Expr;
pub use self::operators::{Operator, OperatorRef};
pub use self::result::{ErrorKind, QueryError, QueryResult};
pub use self::source::{BindingSource, MemorySource, SharedSource};
