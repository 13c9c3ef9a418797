// Limit/Offset Operator
//
// Skips `offset` rows and then passes at most `limit` rows. Both counts are
// evaluated once when the operator opens.

use crate::common::CollectionKind;
use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::{not_open, Operator, OperatorRef};
use crate::query::executor::result::{QueryError, QueryResult};

pub struct LimitOffsetOperator {
    input: OperatorRef,
    limit: Option<Expr>,
    offset: Option<Expr>,
    /// Rows still allowed through; `None` is unbounded
    remaining: Option<u64>,
    /// Rows still to skip
    to_skip: u64,
    initialized: bool,
}

impl LimitOffsetOperator {
    pub fn new(input: OperatorRef, limit: Option<Expr>, offset: Option<Expr>) -> Self {
        LimitOffsetOperator {
            input,
            limit,
            offset,
            remaining: None,
            to_skip: 0,
            initialized: false,
        }
    }

    fn evaluate_count(clause: &str, expr: &Expr, env: &mut Environment) -> QueryResult<u64> {
        let value = expr.evaluate(env)?;
        value
            .as_i128()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| {
                QueryError::InvalidArgumentValue(format!("{} must be a non-negative integer, got {}", clause, value))
            })
    }
}

impl Operator for LimitOffsetOperator {
    fn open(&mut self, env: &mut Environment) -> QueryResult<()> {
        self.remaining = match &self.limit {
            Some(expr) => Some(Self::evaluate_count("LIMIT", expr, env)?),
            None => None,
        };
        self.to_skip = match &self.offset {
            Some(expr) => Self::evaluate_count("OFFSET", expr, env)?,
            None => 0,
        };
        self.input.lock().open(env)?;
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("LimitOffset"));
        }
        if self.remaining == Some(0) {
            return Ok(false);
        }

        let mut input = self.input.lock();
        while self.to_skip > 0 {
            if !input.advance(env)? {
                return Ok(false);
            }
            self.to_skip -= 1;
        }
        if !input.advance(env)? {
            return Ok(false);
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Ok(true)
    }

    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        self.input.lock().close()
    }

    fn output_kind(&self) -> CollectionKind {
        self.input.lock().output_kind()
    }
}
