// Window Operator
//
// Materializes its input, orders it by the partition keys and then the
// window ORDER BY keys, and computes every window function row by row within
// each partition. Output rows keep their input bindings plus one slot per
// window function, in window order.

pub mod functions;

use std::cmp::Ordering;

use log::debug;

pub use self::functions::{Navigation, Partition, Rank, RowNumber, WindowFunction};

use crate::common::{CollectionKind, SlotId};
use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::sort::{compare_keys, evaluate_keys, SortSpec};
use crate::query::executor::operators::{not_open, Operator, OperatorRef};
use crate::query::executor::result::{QueryError, QueryResult};
use crate::value::Value;

/// A window function and the slot its result is bound to
pub struct WindowCall {
    pub function: Box<dyn WindowFunction>,
    pub output_slot: SlotId,
}

impl WindowCall {
    pub fn new(function: impl WindowFunction + 'static, output_slot: SlotId) -> Self {
        WindowCall { function: Box::new(function), output_slot }
    }
}

/// A buffered input row with its sort keys
struct KeyedRow {
    partition_key: Vec<Value>,
    order_key: Vec<Value>,
    row: Vec<Value>,
}

pub struct WindowOperator {
    input: OperatorRef,
    partition_by: Vec<Expr>,
    order_by: Vec<SortSpec>,
    functions: Vec<WindowCall>,
    output_iter: std::vec::IntoIter<Vec<Value>>,
    initialized: bool,
}

impl WindowOperator {
    pub fn new(input: OperatorRef, partition_by: Vec<Expr>, order_by: Vec<SortSpec>, functions: Vec<WindowCall>) -> Self {
        WindowOperator {
            input,
            partition_by,
            order_by,
            functions,
            output_iter: Vec::new().into_iter(),
            initialized: false,
        }
    }

    fn buffer_input(&self, env: &mut Environment) -> QueryResult<Vec<KeyedRow>> {
        let mut rows = Vec::new();
        let mut input = self.input.lock();
        input.open(env)?;
        while input.advance(env)? {
            let mut partition_key = Vec::with_capacity(self.partition_by.len());
            for expr in &self.partition_by {
                partition_key.push(expr.evaluate(env)?);
            }
            let order_key = evaluate_keys(&self.order_by, env)?;
            rows.push(KeyedRow { partition_key, order_key, row: env.snapshot() });
            env.check_materialized("Window", rows.len())?;
        }
        Ok(rows)
    }

    fn to_partition(rows: Vec<KeyedRow>) -> Partition {
        let (order_keys, rows) = rows.into_iter().map(|r| (r.order_key, r.row)).unzip();
        Partition::new(rows, order_keys)
    }

    /// Run every function over one partition, returning its output rows.
    fn process_partition(&mut self, partition: Partition, env: &mut Environment) -> QueryResult<Vec<Vec<Value>>> {
        for call in self.functions.iter_mut() {
            call.function.reset(&partition);
        }

        let mut results = Vec::with_capacity(partition.len());
        for position in 0..partition.len() {
            let Some(current) = partition.row(position) else {
                break;
            };
            env.restore(current)?;
            let mut values = Vec::with_capacity(self.functions.len());
            for call in self.functions.iter_mut() {
                values.push(call.function.evaluate(&partition, position, env)?);
            }
            results.push(values);
        }

        let mut output = partition.into_rows();
        for (row, values) in output.iter_mut().zip(results) {
            let allocated = row.len();
            for (call, value) in self.functions.iter().zip(values) {
                let register = row.get_mut(call.output_slot).ok_or_else(|| {
                    QueryError::PlanMalformed(format!(
                        "window result written to slot {} but only {} registers are allocated",
                        call.output_slot, allocated
                    ))
                })?;
                *register = value;
            }
        }
        Ok(output)
    }
}

impl Operator for WindowOperator {
    fn open(&mut self, env: &mut Environment) -> QueryResult<()> {
        let mut rows = self.buffer_input(env)?;
        let order_by = &self.order_by;
        rows.sort_by(|a, b| match a.partition_key.cmp(&b.partition_key) {
            Ordering::Equal => compare_keys(order_by, &a.order_key, &b.order_key),
            other => other,
        });
        debug!("Window materialized {} rows", rows.len());

        let mut output = Vec::with_capacity(rows.len());
        let mut pending: Vec<KeyedRow> = Vec::new();
        for keyed in rows {
            let boundary = pending.last().is_some_and(|last| last.partition_key != keyed.partition_key);
            if boundary {
                let partition = Self::to_partition(std::mem::take(&mut pending));
                output.extend(self.process_partition(partition, env)?);
            }
            pending.push(keyed);
        }
        if !pending.is_empty() {
            output.extend(self.process_partition(Self::to_partition(pending), env)?);
        }

        self.output_iter = output.into_iter();
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("Window"));
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
