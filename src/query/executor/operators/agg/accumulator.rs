// Aggregate Accumulators
//
// Stateful reducers fed one argument value per input row. Unknown inputs are
// skipped by every accumulator except COUNT(*) and GROUP_AS.

use std::collections::BTreeSet;

use crate::query::executor::expression::arithmetic;
use crate::query::executor::result::{QueryError, QueryResult};
use crate::value::Value;

/// Contract between the aggregate operator and one aggregate call
pub trait Accumulator: Send {
    /// Fold in the argument value of the next row.
    fn next_value(&mut self, value: Value) -> QueryResult<()>;

    /// Result for the rows seen so far.
    fn value(&self) -> QueryResult<Value>;
}

#[derive(Debug, Default)]
pub struct Count {
    count: i64,
}

impl Accumulator for Count {
    fn next_value(&mut self, value: Value) -> QueryResult<()> {
        if !value.is_absent() {
            self.count += 1;
        }
        Ok(())
    }

    fn value(&self) -> QueryResult<Value> {
        Ok(Value::Int64(self.count))
    }
}

/// COUNT(*): counts rows whatever the argument
#[derive(Debug, Default)]
pub struct CountStar {
    count: i64,
}

impl Accumulator for CountStar {
    fn next_value(&mut self, _value: Value) -> QueryResult<()> {
        self.count += 1;
        Ok(())
    }

    fn value(&self) -> QueryResult<Value> {
        Ok(Value::Int64(self.count))
    }
}

fn require_numeric(function: &str, value: &Value) -> QueryResult<()> {
    if value.is_numeric() {
        Ok(())
    } else {
        Err(QueryError::type_mismatch(&format!("a number for {}", function), value))
    }
}

/// SUM; null over no rows
#[derive(Debug, Default)]
pub struct Sum {
    sum: Option<Value>,
}

impl Accumulator for Sum {
    fn next_value(&mut self, value: Value) -> QueryResult<()> {
        if value.is_absent() {
            return Ok(());
        }
        require_numeric("SUM", &value)?;
        self.sum = Some(match self.sum.take() {
            Some(sum) => arithmetic::add(&sum, &value)?,
            None => value,
        });
        Ok(())
    }

    fn value(&self) -> QueryResult<Value> {
        Ok(self.sum.clone().unwrap_or_else(Value::null))
    }
}

/// AVG; exact inputs average to a DECIMAL, approximate ones to a float
#[derive(Debug, Default)]
pub struct Avg {
    sum: Sum,
    count: i64,
}

impl Accumulator for Avg {
    fn next_value(&mut self, value: Value) -> QueryResult<()> {
        if value.is_absent() {
            return Ok(());
        }
        require_numeric("AVG", &value)?;
        self.sum.next_value(value)?;
        self.count += 1;
        Ok(())
    }

    fn value(&self) -> QueryResult<Value> {
        let Some(sum) = &self.sum.sum else {
            return Ok(Value::null());
        };
        let dividend = match sum {
            Value::Real(_) | Value::Double(_) | Value::Decimal(_) => sum.clone(),
            // An exact sum too wide for a DECIMAL raises NumericOverflow
            exact => Value::Decimal(arithmetic::to_decimal(exact)?),
        };
        arithmetic::divide(&dividend, &Value::Int64(self.count))
    }
}

/// MIN or MAX under the total order
#[derive(Debug)]
pub struct Extremum {
    max: bool,
    current: Option<Value>,
}

impl Extremum {
    pub fn min() -> Self {
        Extremum { max: false, current: None }
    }

    pub fn max() -> Self {
        Extremum { max: true, current: None }
    }
}

impl Accumulator for Extremum {
    fn next_value(&mut self, value: Value) -> QueryResult<()> {
        if value.is_absent() {
            return Ok(());
        }
        let replace = match &self.current {
            None => true,
            Some(current) if self.max => value > *current,
            Some(current) => value < *current,
        };
        if replace {
            self.current = Some(value);
        }
        Ok(())
    }

    fn value(&self) -> QueryResult<Value> {
        Ok(self.current.clone().unwrap_or_else(Value::null))
    }
}

/// EVERY (boolean AND) or ANY/SOME (boolean OR); null over no rows
#[derive(Debug)]
pub struct BoolFold {
    every: bool,
    current: Option<bool>,
}

impl BoolFold {
    pub fn every() -> Self {
        BoolFold { every: true, current: None }
    }

    pub fn any() -> Self {
        BoolFold { every: false, current: None }
    }
}

impl Accumulator for BoolFold {
    fn next_value(&mut self, value: Value) -> QueryResult<()> {
        if value.is_absent() {
            return Ok(());
        }
        let b = value
            .as_bool()
            .ok_or_else(|| QueryError::type_mismatch("a boolean", &value))?;
        self.current = Some(match (self.current, self.every) {
            (None, _) => b,
            (Some(acc), true) => acc && b,
            (Some(acc), false) => acc || b,
        });
        Ok(())
    }

    fn value(&self) -> QueryResult<Value> {
        Ok(self.current.map_or_else(Value::null, Value::Bool))
    }
}

/// GROUP AS: collects every row value of the group into a bag
#[derive(Debug, Default)]
pub struct GroupAs {
    rows: Vec<Value>,
}

impl Accumulator for GroupAs {
    fn next_value(&mut self, value: Value) -> QueryResult<()> {
        self.rows.push(value);
        Ok(())
    }

    fn value(&self) -> QueryResult<Value> {
        Ok(Value::Bag(self.rows.clone()))
    }
}

/// Forwards each distinct value to the wrapped accumulator once.
pub struct DistinctAccumulator {
    seen: BTreeSet<Value>,
    delegate: Box<dyn Accumulator>,
}

impl DistinctAccumulator {
    pub fn new(delegate: Box<dyn Accumulator>) -> Self {
        DistinctAccumulator {
            seen: BTreeSet::new(),
            delegate,
        }
    }
}

impl Accumulator for DistinctAccumulator {
    fn next_value(&mut self, value: Value) -> QueryResult<()> {
        if self.seen.contains(&value) {
            return Ok(());
        }
        self.seen.insert(value.clone());
        self.delegate.next_value(value)
    }

    fn value(&self) -> QueryResult<Value> {
        self.delegate.value()
    }
}
