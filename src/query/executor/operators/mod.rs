// Query Operators Module
//
// This module defines the relational operators used for query execution in
// the pull-based execution model. Operators communicate through the register
// context: `advance` writes the next row's bindings into their slots.

pub mod agg;
pub mod distinct;
pub mod filter;
pub mod join;
pub mod limit;
pub mod project;
pub mod scan;
pub mod set_ops;
pub mod singleton;
pub mod sort;
pub mod window;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{CollectionKind, SlotId};
use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::executor::source::SharedSource;

pub use self::agg::{AggregateCall, AggregateFunction, AggregateOperator};
pub use self::distinct::DistinctOperator;
pub use self::filter::FilterOperator;
pub use self::join::{JoinKind, NestedLoopJoin};
pub use self::limit::LimitOffsetOperator;
pub use self::project::ProjectOperator;
pub use self::scan::{ScanOperator, ScanSource};
pub use self::set_ops::{SetOperator, SetOpKind, SetQuantifier};
pub use self::singleton::SingletonOperator;
pub use self::sort::{NullOrder, SortDirection, SortOperator, SortSpec};
pub use self::window::{WindowCall, WindowOperator};

/// The Operator trait defines the interface for all query execution operators
/// in the pull-based execution model.
///
/// An operator may be opened again after `close`, which restarts it; joins
/// rely on this to rescan their inner side for every outer row.
pub trait Operator: Send {
    /// Prepare to produce rows. Correlated operators read the enclosing row's
    /// bindings here.
    fn open(&mut self, env: &mut Environment) -> QueryResult<()>;

    /// Move to the next row, writing its bindings. Returns false once
    /// exhausted.
    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool>;

    /// Release resources and close children. Safe to call more than once.
    fn close(&mut self) -> QueryResult<()>;

    /// Whether the rows form a bag or a list
    fn output_kind(&self) -> CollectionKind;
}

/// Shared handle to an operator in the tree
pub type OperatorRef = Arc<Mutex<dyn Operator>>;

pub fn into_ref<O: Operator + 'static>(operator: O) -> OperatorRef {
    Arc::new(Mutex::new(operator))
}

/// Error for `advance` before `open`
pub(crate) fn not_open(operator: &str) -> QueryError {
    QueryError::PlanMalformed(format!("{} operator advanced before open", operator))
}

/// Close every child, reporting the first failure.
pub(crate) fn close_all(children: &[&OperatorRef]) -> QueryResult<()> {
    let mut first_error = None;
    for child in children {
        if let Err(e) = child.lock().close() {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

// Factory functions for creating operators
pub fn create_singleton() -> QueryResult<OperatorRef> {
    Ok(into_ref(SingletonOperator::new()))
}

pub fn create_scan(source: Expr, value_slot: SlotId, position_slot: Option<SlotId>) -> QueryResult<OperatorRef> {
    Ok(into_ref(ScanOperator::new(ScanSource::Expression(source), value_slot, position_slot)))
}

pub fn create_external_scan(
    source: SharedSource,
    value_slot: SlotId,
    position_slot: Option<SlotId>,
) -> QueryResult<OperatorRef> {
    Ok(into_ref(ScanOperator::new(ScanSource::External(source), value_slot, position_slot)))
}

pub fn create_filter(input: OperatorRef, predicate: Expr) -> QueryResult<OperatorRef> {
    Ok(into_ref(FilterOperator::new(input, predicate)))
}

pub fn create_projection(input: OperatorRef, bindings: Vec<(SlotId, Expr)>) -> QueryResult<OperatorRef> {
    Ok(into_ref(ProjectOperator::new(input, bindings)))
}

pub fn create_nested_loop_join(
    kind: JoinKind,
    outer: OperatorRef,
    inner: OperatorRef,
    condition: Option<Expr>,
    inner_slots: Vec<SlotId>,
) -> QueryResult<OperatorRef> {
    Ok(into_ref(NestedLoopJoin::new(kind, outer, inner, condition, inner_slots)))
}

pub fn create_sort(input: OperatorRef, specs: Vec<SortSpec>) -> QueryResult<OperatorRef> {
    Ok(into_ref(SortOperator::new(input, specs)))
}

pub fn create_limit(input: OperatorRef, limit: Option<Expr>, offset: Option<Expr>) -> QueryResult<OperatorRef> {
    Ok(into_ref(LimitOffsetOperator::new(input, limit, offset)))
}

pub fn create_distinct(input: OperatorRef, keys: Vec<Expr>) -> QueryResult<OperatorRef> {
    Ok(into_ref(DistinctOperator::new(input, keys)))
}

pub fn create_aggregate(
    input: OperatorRef,
    group_keys: Vec<(Expr, SlotId)>,
    aggregates: Vec<AggregateCall>,
) -> QueryResult<OperatorRef> {
    Ok(into_ref(AggregateOperator::new(input, group_keys, aggregates)))
}

pub fn create_window(
    input: OperatorRef,
    partition_by: Vec<Expr>,
    order_by: Vec<SortSpec>,
    functions: Vec<WindowCall>,
) -> QueryResult<OperatorRef> {
    Ok(into_ref(WindowOperator::new(input, partition_by, order_by, functions)))
}

#[allow(clippy::too_many_arguments)]
pub fn create_set_operation(
    kind: SetOpKind,
    quantifier: SetQuantifier,
    left: OperatorRef,
    left_value: Expr,
    right: OperatorRef,
    right_value: Expr,
    output_slot: SlotId,
) -> QueryResult<OperatorRef> {
    Ok(into_ref(SetOperator::new(
        kind,
        quantifier,
        (left, left_value),
        (right, right_value),
        output_slot,
    )))
}
