use std::fmt;

use serde::{Deserialize, Serialize};

/// Register slot index, assigned by the planner and baked into the plan
pub type SlotId = usize;

/// Register length recorded when a scope is pushed
pub type ScopeMark = usize;

/// Whether an operator's output is ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    /// Unordered, duplicates significant
    Bag,
    /// Ordered, duplicates significant
    List,
}

/// Position in the query text, supplied by the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}
