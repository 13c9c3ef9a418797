// Sort Operator Implementation
//
// Materializes its input, then replays the rows ordered by the sort keys.
// Rows are captured as register snapshots, so every binding of the input row
// is restored on output. The sort is stable and the output is a list.

use std::cmp::Ordering;

use log::debug;

use crate::common::CollectionKind;
use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::{not_open, Operator, OperatorRef};
use crate::query::executor::result::QueryResult;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Placement of null and missing keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrder {
    First,
    Last,
}

/// One ORDER BY key
#[derive(Debug, Clone)]
pub struct SortSpec {
    pub expr: Expr,
    pub direction: SortDirection,
    /// Defaults to first for ascending keys and last for descending ones
    pub nulls: Option<NullOrder>,
}

impl SortSpec {
    pub fn asc(expr: Expr) -> Self {
        SortSpec { expr, direction: SortDirection::Asc, nulls: None }
    }

    pub fn desc(expr: Expr) -> Self {
        SortSpec { expr, direction: SortDirection::Desc, nulls: None }
    }

    pub fn nulls(mut self, order: NullOrder) -> Self {
        self.nulls = Some(order);
        self
    }

    fn nulls_first(&self) -> bool {
        match (self.nulls, self.direction) {
            (Some(order), _) => order == NullOrder::First,
            (None, SortDirection::Asc) => true,
            (None, SortDirection::Desc) => false,
        }
    }

    /// Order two key values under this sort key.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (a.is_absent(), b.is_absent()) {
            // Missing still sorts before null
            (true, true) => a.cmp(b),
            (true, false) if self.nulls_first() => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if self.nulls_first() => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self.direction {
                SortDirection::Asc => a.cmp(b),
                SortDirection::Desc => b.cmp(a),
            },
        }
    }
}

/// Compare two key tuples key by key.
pub(crate) fn compare_keys(specs: &[SortSpec], a: &[Value], b: &[Value]) -> Ordering {
    for ((spec, x), y) in specs.iter().zip(a).zip(b) {
        let ord = spec.compare(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Evaluate every sort key against the current row.
pub(crate) fn evaluate_keys(specs: &[SortSpec], env: &mut Environment) -> QueryResult<Vec<Value>> {
    let mut keys = Vec::with_capacity(specs.len());
    for spec in specs {
        keys.push(spec.expr.evaluate(env)?);
    }
    Ok(keys)
}

pub struct SortOperator {
    input: OperatorRef,
    specs: Vec<SortSpec>,
    /// Sorted register snapshots still to be produced
    output_iter: std::vec::IntoIter<Vec<Value>>,
    initialized: bool,
}

impl SortOperator {
    pub fn new(input: OperatorRef, specs: Vec<SortSpec>) -> Self {
        SortOperator {
            input,
            specs,
            output_iter: Vec::new().into_iter(),
            initialized: false,
        }
    }
}

impl Operator for SortOperator {
    fn open(&mut self, env: &mut Environment) -> QueryResult<()> {
        // Read all input rows before producing any output
        let mut all_rows: Vec<(Vec<Value>, Vec<Value>)> = Vec::new();
        {
            let mut input_op = self.input.lock();
            input_op.open(env)?;
            while input_op.advance(env)? {
                let keys = evaluate_keys(&self.specs, env)?;
                all_rows.push((keys, env.snapshot()));
                env.check_materialized("Sort", all_rows.len())?;
            }
        }
        debug!("Sort materialized {} rows", all_rows.len());

        all_rows.sort_by(|(a, _), (b, _)| compare_keys(&self.specs, a, b));
        self.output_iter = all_rows.into_iter().map(|(_, row)| row).collect::<Vec<_>>().into_iter();
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("Sort"));
        }
        match self.output_iter.next() {
            Some(row) => {
                env.restore(&row)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        self.output_iter = Vec::new().into_iter();
        self.input.lock().close()
    }

    fn output_kind(&self) -> CollectionKind {
        CollectionKind::List
    }
}
