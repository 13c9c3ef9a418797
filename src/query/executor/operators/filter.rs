// Filter Operator Implementation
//
// This module implements the filter operator for filtering rows based on predicates.

use crate::common::CollectionKind;
use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::{not_open, Operator, OperatorRef};
use crate::query::executor::result::QueryResult;
use crate::value::Value;

/// Filter operator that keeps rows whose predicate is true
pub struct FilterOperator {
    /// The input operator
    input: OperatorRef,
    /// The predicate to evaluate
    predicate: Expr,
    /// Whether the operator is initialized
    initialized: bool,
}

impl FilterOperator {
    /// Create a new filter operator
    pub fn new(input: OperatorRef, predicate: Expr) -> Self {
        FilterOperator {
            input,
            predicate,
            initialized: false,
        }
    }
}

impl Operator for FilterOperator {
    fn open(&mut self, env: &mut Environment) -> QueryResult<()> {
        self.input.lock().open(env)?;
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("Filter"));
        }

        loop {
            if !self.input.lock().advance(env)? {
                return Ok(false);
            }
            // Null and missing exclude the row like false does
            if self.predicate.evaluate(env)? == Value::Bool(true) {
                return Ok(true);
            }
        }
    }

    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        self.input.lock().close()
    }

    fn output_kind(&self) -> CollectionKind {
        self.input.lock().output_kind()
    }
}
