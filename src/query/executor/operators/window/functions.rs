// Window Functions
//
// Ranking and navigation functions evaluated over one ordered partition.
// `reset` is called before the first row of every partition; rows are then
// evaluated in partition order.

use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::result::{QueryError, QueryResult};
use crate::value::Value;

/// One materialized, ordered partition
#[derive(Debug, Default)]
pub struct Partition {
    /// Register snapshots in window order
    rows: Vec<Vec<Value>>,
    /// ORDER BY key values of each row
    order_keys: Vec<Vec<Value>>,
}

impl Partition {
    pub fn new(rows: Vec<Vec<Value>>, order_keys: Vec<Vec<Value>>) -> Self {
        Partition { rows, order_keys }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, position: usize) -> Option<&[Value]> {
        self.rows.get(position).map(Vec::as_slice)
    }

    /// Whether two rows tie on every ORDER BY key
    pub fn peers(&self, a: usize, b: usize) -> bool {
        match (self.order_keys.get(a), self.order_keys.get(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub(crate) fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }
}

pub trait WindowFunction: Send {
    /// Start a new partition.
    fn reset(&mut self, partition: &Partition);

    /// Value for the row at `position`. The context holds that row's bindings
    /// on entry and must hold them again on return.
    fn evaluate(&mut self, partition: &Partition, position: usize, env: &mut Environment) -> QueryResult<Value>;
}

#[derive(Debug, Default)]
pub struct RowNumber;

impl WindowFunction for RowNumber {
    fn reset(&mut self, _partition: &Partition) {}

    fn evaluate(&mut self, _partition: &Partition, position: usize, _env: &mut Environment) -> QueryResult<Value> {
        Ok(Value::Int64(position as i64 + 1))
    }
}

/// RANK leaves gaps after ties; DENSE_RANK does not
#[derive(Debug)]
pub struct Rank {
    dense: bool,
    current: i64,
}

impl Rank {
    pub fn rank() -> Self {
        Rank { dense: false, current: 0 }
    }

    pub fn dense_rank() -> Self {
        Rank { dense: true, current: 0 }
    }
}

impl WindowFunction for Rank {
    fn reset(&mut self, _partition: &Partition) {
        self.current = 0;
    }

    fn evaluate(&mut self, partition: &Partition, position: usize, _env: &mut Environment) -> QueryResult<Value> {
        if position == 0 {
            self.current = 1;
        } else if !partition.peers(position - 1, position) {
            self.current = if self.dense { self.current + 1 } else { position as i64 + 1 };
        }
        Ok(Value::Int64(self.current))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// LAG looks at earlier rows
    Backward,
    /// LEAD looks at later rows
    Forward,
}

/// LAG / LEAD(target [, offset [, default]])
#[derive(Debug)]
pub struct Navigation {
    direction: Direction,
    target: Expr,
    /// Defaults to 1
    offset: Option<Expr>,
    /// Defaults to null
    default: Option<Expr>,
}

impl Navigation {
    pub fn lag(target: Expr, offset: Option<Expr>, default: Option<Expr>) -> Self {
        Navigation { direction: Direction::Backward, target, offset, default }
    }

    pub fn lead(target: Expr, offset: Option<Expr>, default: Option<Expr>) -> Self {
        Navigation { direction: Direction::Forward, target, offset, default }
    }

    fn offset(&self, env: &mut Environment) -> QueryResult<usize> {
        let Some(expr) = &self.offset else {
            return Ok(1);
        };
        let value = expr.evaluate(env)?;
        value
            .as_i128()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                QueryError::InvalidArgumentValue(format!("window offset must be a non-negative integer, got {}", value))
            })
    }
}

impl WindowFunction for Navigation {
    fn reset(&mut self, _partition: &Partition) {}

    fn evaluate(&mut self, partition: &Partition, position: usize, env: &mut Environment) -> QueryResult<Value> {
        let offset = self.offset(env)?;
        let target = match self.direction {
            Direction::Backward => position.checked_sub(offset),
            Direction::Forward => position.checked_add(offset).filter(|&t| t < partition.len()),
        };

        let (Some(target_row), Some(current_row)) = (target.and_then(|t| partition.row(t)), partition.row(position)) else {
            return match &self.default {
                Some(default) => default.evaluate(env),
                None => Ok(Value::null()),
            };
        };

        env.restore(target_row)?;
        let value = self.target.evaluate(env);
        env.restore(current_row)?;
        value
    }
}
