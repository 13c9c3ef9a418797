// Nested Loop Join Implementation
//
// This file implements the nested loop join algorithm, which works for any join condition
// but has O(n*m) time complexity.

use log::debug;

use crate::common::{CollectionKind, SlotId};
use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::{close_all, not_open, Operator, OperatorRef};
use crate::query::executor::result::QueryResult;
use crate::value::Value;

use super::JoinKind;

/// Nested Loop Join operator implementation
pub struct NestedLoopJoin {
    kind: JoinKind,
    /// Outer input operator
    outer: OperatorRef,
    /// Inner input operator, re-opened for every outer row
    inner: OperatorRef,
    /// Join condition; absent means every pairing matches
    condition: Option<Expr>,
    /// Slots written by the inner side, reset to missing for unmatched left rows
    inner_slots: Vec<SlotId>,
    /// Whether an outer row is currently bound
    has_outer_row: bool,
    /// Flag indicating if we've matched the current outer row
    found_match: bool,
    /// Initialization status
    initialized: bool,
}

impl NestedLoopJoin {
    /// Create a new nested loop join operator
    pub fn new(
        kind: JoinKind,
        outer: OperatorRef,
        inner: OperatorRef,
        condition: Option<Expr>,
        inner_slots: Vec<SlotId>,
    ) -> Self {
        NestedLoopJoin {
            kind,
            outer,
            inner,
            condition,
            inner_slots,
            has_outer_row: false,
            found_match: false,
            initialized: false,
        }
    }

    fn matches(&self, env: &mut Environment) -> QueryResult<bool> {
        match (&self.condition, self.kind) {
            (None, _) | (_, JoinKind::Cross) => Ok(true),
            (Some(condition), _) => Ok(condition.evaluate(env)? == Value::Bool(true)),
        }
    }
}

impl Operator for NestedLoopJoin {
    fn open(&mut self, env: &mut Environment) -> QueryResult<()> {
        debug!("Opening {:?} nested loop join", self.kind);
        self.outer.lock().open(env)?;
        self.has_outer_row = false;
        self.found_match = false;
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("NestedLoopJoin"));
        }

        loop {
            if !self.has_outer_row {
                if !self.outer.lock().advance(env)? {
                    return Ok(false);
                }
                self.has_outer_row = true;
                self.found_match = false;

                // The outer bindings are in place; restart the inner side
                let mut inner = self.inner.lock();
                inner.close()?;
                inner.open(env)?;
            }

            while self.inner.lock().advance(env)? {
                if self.matches(env)? {
                    self.found_match = true;
                    return Ok(true);
                }
            }

            // Reached the end of the inner side for this outer row
            self.has_outer_row = false;
            if self.kind == JoinKind::Left && !self.found_match {
                for &slot in &self.inner_slots {
                    env.set_slot(slot, Value::Missing)?;
                }
                return Ok(true);
            }
        }
    }

    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        self.has_outer_row = false;
        close_all(&[&self.outer, &self.inner])
    }

    fn output_kind(&self) -> CollectionKind {
        CollectionKind::Bag
    }
}
