// Set Operators
//
// UNION / INTERSECT / EXCEPT over the values produced by two inputs. Both
// sides are materialized into multiplicity counts keyed by the total order;
// the output is a bag bound to one slot.
//
//   ALL:      union adds, intersect takes the minimum, except subtracts
//             (never below zero)
//   DISTINCT: the same, with every multiplicity capped at one

use std::collections::BTreeMap;

use log::debug;

use crate::common::{CollectionKind, SlotId};
use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::{close_all, not_open, Operator, OperatorRef};
use crate::query::executor::result::QueryResult;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetQuantifier {
    All,
    Distinct,
}

/// Multiplicities in first-seen order
#[derive(Default)]
struct Multiset {
    counts: BTreeMap<Value, usize>,
    order: Vec<Value>,
}

impl Multiset {
    fn insert(&mut self, value: Value) {
        match self.counts.get_mut(&value) {
            Some(count) => *count += 1,
            None => {
                self.order.push(value.clone());
                self.counts.insert(value, 1);
            }
        }
    }

    fn count(&self, value: &Value) -> usize {
        self.counts.get(value).copied().unwrap_or(0)
    }
}

pub struct SetOperator {
    kind: SetOpKind,
    quantifier: SetQuantifier,
    left: OperatorRef,
    /// Value of each left row
    left_value: Expr,
    right: OperatorRef,
    right_value: Expr,
    output_slot: SlotId,
    /// Values left to emit, one entry per output row
    output_iter: std::vec::IntoIter<Value>,
    initialized: bool,
}

impl SetOperator {
    pub fn new(
        kind: SetOpKind,
        quantifier: SetQuantifier,
        left: (OperatorRef, Expr),
        right: (OperatorRef, Expr),
        output_slot: SlotId,
    ) -> Self {
        SetOperator {
            kind,
            quantifier,
            left: left.0,
            left_value: left.1,
            right: right.0,
            right_value: right.1,
            output_slot,
            output_iter: Vec::new().into_iter(),
            initialized: false,
        }
    }

    fn materialize(input: &OperatorRef, value: &Expr, env: &mut Environment, rows: &mut usize) -> QueryResult<Multiset> {
        let mut multiset = Multiset::default();
        let mut op = input.lock();
        op.open(env)?;
        while op.advance(env)? {
            multiset.insert(value.evaluate(env)?);
            *rows += 1;
            env.check_materialized("Set operation", *rows)?;
        }
        Ok(multiset)
    }

    fn multiplicity(&self, left: usize, right: usize) -> usize {
        let count = match self.kind {
            SetOpKind::Union => left + right,
            SetOpKind::Intersect => left.min(right),
            SetOpKind::Except => match self.quantifier {
                SetQuantifier::All => left.saturating_sub(right),
                // Distinct except drops anything present on the right at all
                SetQuantifier::Distinct if right > 0 => 0,
                SetQuantifier::Distinct => left,
            },
        };
        match self.quantifier {
            SetQuantifier::All => count,
            SetQuantifier::Distinct => count.min(1),
        }
    }
}

impl Operator for SetOperator {
    fn open(&mut self, env: &mut Environment) -> QueryResult<()> {
        let mut rows = 0;
        let left = Self::materialize(&self.left, &self.left_value, env, &mut rows)?;
        let right = Self::materialize(&self.right, &self.right_value, env, &mut rows)?;
        debug!("{:?} {:?} over {} materialized rows", self.kind, self.quantifier, rows);

        let mut output = Vec::new();
        let candidates = left.order.iter().chain(
            right
                .order
                .iter()
                .filter(|v| self.kind == SetOpKind::Union && left.count(v) == 0),
        );
        for value in candidates {
            let n = self.multiplicity(left.count(value), right.count(value));
            output.extend(std::iter::repeat(value.clone()).take(n));
        }

        self.output_iter = output.into_iter();
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("SetOperation"));
        }
        match self.output_iter.next() {
            Some(value) => {
                env.set_slot(self.output_slot, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        self.output_iter = Vec::new().into_iter();
        close_all(&[&self.left, &self.right])
    }

    fn output_kind(&self) -> CollectionKind {
        CollectionKind::Bag
    }
}
