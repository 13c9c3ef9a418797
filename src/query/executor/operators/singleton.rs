// Singleton Operator
//
// Produces exactly one row without binding anything; the input of queries
// that have no FROM clause.

use crate::common::CollectionKind;
use crate::query::executor::context::Environment;
use crate::query::executor::operators::{not_open, Operator};
use crate::query::executor::result::QueryResult;

#[derive(Debug, Default)]
pub struct SingletonOperator {
    /// Whether the single row is still to come
    pending: bool,
    initialized: bool,
}

impl SingletonOperator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Operator for SingletonOperator {
    fn open(&mut self, _env: &mut Environment) -> QueryResult<()> {
        self.pending = true;
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, _env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("Singleton"));
        }
        Ok(std::mem::replace(&mut self.pending, false))
    }

    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        self.pending = false;
        Ok(())
    }

    fn output_kind(&self) -> CollectionKind {
        CollectionKind::Bag
    }
}
