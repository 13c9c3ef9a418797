// Grouping Aggregation Operator
//
// This operator groups its materialized input by the key expressions and
// runs one accumulator per aggregate call per group. Without GROUP BY keys
// there is exactly one group, even over empty input; with keys, empty input
// produces no groups. Null and missing keys fall into the same group, whose
// key is bound as null.

use std::collections::BTreeMap;

use log::debug;

use crate::common::{CollectionKind, SlotId};
use crate::query::executor::context::Environment;
use crate::query::executor::engine::TypingMode;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::{not_open, Operator, OperatorRef};
use crate::query::executor::result::QueryResult;
use crate::value::Value;

use super::{Accumulator, AggregateCall};

/// Accumulators of one group; `None` once a rejected input poisoned the call
type GroupState = Vec<Option<Box<dyn Accumulator>>>;

pub struct AggregateOperator {
    input: OperatorRef,
    /// Key expression and the slot it is bound to on output
    group_keys: Vec<(Expr, SlotId)>,
    aggregates: Vec<AggregateCall>,
    /// Finished groups: key values and aggregate results
    output_iter: std::vec::IntoIter<(Vec<Value>, Vec<Value>)>,
    initialized: bool,
}

impl AggregateOperator {
    pub fn new(input: OperatorRef, group_keys: Vec<(Expr, SlotId)>, aggregates: Vec<AggregateCall>) -> Self {
        AggregateOperator {
            input,
            group_keys,
            aggregates,
            output_iter: Vec::new().into_iter(),
            initialized: false,
        }
    }

    fn new_group(&self) -> GroupState {
        self.aggregates
            .iter()
            .map(|call| Some(call.function.create_accumulator(call.distinct)))
            .collect()
    }

    fn group_key(&self, env: &mut Environment) -> QueryResult<Vec<Value>> {
        let mut key = Vec::with_capacity(self.group_keys.len());
        for (expr, _) in &self.group_keys {
            let value = expr.evaluate(env)?;
            key.push(if value.is_missing() { Value::null() } else { value });
        }
        Ok(key)
    }

    /// Feed one row's arguments. In permissive mode a value an accumulator
    /// rejects on type grounds makes that call's result missing for the group.
    fn accumulate(&self, group: &mut GroupState, env: &mut Environment) -> QueryResult<()> {
        for (call, slot) in self.aggregates.iter().zip(group.iter_mut()) {
            let Some(accumulator) = slot.as_mut() else {
                continue;
            };
            let value = call.argument.evaluate(env)?;
            if let Err(error) = accumulator.next_value(value) {
                if env.typing_mode() == TypingMode::Permissive && error.is_recoverable() {
                    debug!("Permissive mode: aggregate result becomes missing ({})", error);
                    *slot = None;
                } else {
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    fn finish(group: GroupState) -> QueryResult<Vec<Value>> {
        group
            .iter()
            .map(|slot| match slot {
                Some(accumulator) => accumulator.value(),
                None => Ok(Value::Missing),
            })
            .collect()
    }
}

impl Operator for AggregateOperator {
    fn open(&mut self, env: &mut Environment) -> QueryResult<()> {
        let mut groups: BTreeMap<Vec<Value>, GroupState> = BTreeMap::new();
        let mut rows = 0usize;
        {
            let mut input = self.input.lock();
            input.open(env)?;
            while input.advance(env)? {
                let key = self.group_key(env)?;
                if !groups.contains_key(&key) {
                    groups.insert(key.clone(), self.new_group());
                    env.check_materialized("Aggregate", groups.len())?;
                }
                if let Some(group) = groups.get_mut(&key) {
                    self.accumulate(group, env)?;
                }
                rows += 1;
            }
        }

        if groups.is_empty() && self.group_keys.is_empty() {
            groups.insert(Vec::new(), self.new_group());
        }
        debug!("Aggregated {} rows into {} groups", rows, groups.len());

        let mut finished = Vec::with_capacity(groups.len());
        for (key, group) in groups {
            finished.push((key, Self::finish(group)?));
        }
        self.output_iter = finished.into_iter();
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("Aggregate"));
        }
        let Some((key, values)) = self.output_iter.next() else {
            return Ok(false);
        };
        for ((_, slot), value) in self.group_keys.iter().zip(key) {
            env.set_slot(*slot, value)?;
        }
        for (call, value) in self.aggregates.iter().zip(values) {
            env.set_slot(call.output_slot, value)?;
        }
        Ok(true)
    }

    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        self.output_iter = Vec::new().into_iter();
        self.input.lock().close()
    }

    fn output_kind(&self) -> CollectionKind {
        CollectionKind::Bag
    }
}
