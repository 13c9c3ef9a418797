// PartiQL Query Execution Engine

pub mod common;
pub mod query;
pub mod value;

// Re-export key items for convenient access
pub use common::{CollectionKind, SlotId, SourceLocation};
pub use query::executor::engine::{ExecutionConfig, ExecutionEngine, QueryPlan, ResultCursor, Statement, TypingMode};
pub use query::executor::result::{ErrorKind, QueryError, QueryResult};
pub use value::{Value, ValueType};
