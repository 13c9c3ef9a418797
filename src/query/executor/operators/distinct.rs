// Distinct Operator
//
// Streaming de-duplication: a row passes the first time its key tuple is
// seen. Key equality is the total order's equality, so `1` and `1.0` are the
// same key.

use std::collections::BTreeSet;

use crate::common::CollectionKind;
use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::{not_open, Operator, OperatorRef};
use crate::query::executor::result::QueryResult;
use crate::value::Value;

pub struct DistinctOperator {
    input: OperatorRef,
    /// Expressions forming the de-duplication key
    keys: Vec<Expr>,
    seen: BTreeSet<Vec<Value>>,
    initialized: bool,
}

impl DistinctOperator {
    pub fn new(input: OperatorRef, keys: Vec<Expr>) -> Self {
        DistinctOperator {
            input,
            keys,
            seen: BTreeSet::new(),
            initialized: false,
        }
    }
}

impl Operator for DistinctOperator {
    fn open(&mut self, env: &mut Environment) -> QueryResult<()> {
        self.seen.clear();
        self.input.lock().open(env)?;
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("Distinct"));
        }
        loop {
            if !self.input.lock().advance(env)? {
                return Ok(false);
            }
            let mut key = Vec::with_capacity(self.keys.len());
            for expr in &self.keys {
                key.push(expr.evaluate(env)?);
            }
            if self.seen.insert(key) {
                env.check_materialized("Distinct", self.seen.len())?;
                return Ok(true);
            }
        }
    }

    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        self.seen.clear();
        self.input.lock().close()
    }

    fn output_kind(&self) -> CollectionKind {
        self.input.lock().output_kind()
    }
}
