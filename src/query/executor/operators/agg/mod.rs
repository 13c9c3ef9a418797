// Aggregation Operators Module
//
// This module contains the grouping operator and the aggregate functions
// (COUNT, SUM, AVG, MIN, MAX, EVERY, ANY, GROUP AS) it drives.

pub mod accumulator;
mod group_by;

pub use self::accumulator::{Accumulator, DistinctAccumulator};
pub use self::group_by::AggregateOperator;

use crate::common::SlotId;
use crate::query::executor::expression::Expr;

use self::accumulator::{Avg, BoolFold, Count, CountStar, Extremum, GroupAs, Sum};

// Types of supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    CountStar,
    Sum,
    Avg,
    Min,
    Max,
    Every,
    /// ANY / SOME
    Any,
    GroupAs,
}

impl AggregateFunction {
    /// Resolve an aggregate by its SQL name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "count_star" => Some(AggregateFunction::CountStar),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "every" | "bool_and" => Some(AggregateFunction::Every),
            "any" | "some" | "bool_or" => Some(AggregateFunction::Any),
            "group_as" => Some(AggregateFunction::GroupAs),
            _ => None,
        }
    }

    /// Fresh state for one group
    pub fn create_accumulator(self, distinct: bool) -> Box<dyn Accumulator> {
        let accumulator: Box<dyn Accumulator> = match self {
            AggregateFunction::Count => Box::new(Count::default()),
            AggregateFunction::CountStar => Box::new(CountStar::default()),
            AggregateFunction::Sum => Box::new(Sum::default()),
            AggregateFunction::Avg => Box::new(Avg::default()),
            AggregateFunction::Min => Box::new(Extremum::min()),
            AggregateFunction::Max => Box::new(Extremum::max()),
            AggregateFunction::Every => Box::new(BoolFold::every()),
            AggregateFunction::Any => Box::new(BoolFold::any()),
            AggregateFunction::GroupAs => Box::new(GroupAs::default()),
        };
        if distinct {
            Box::new(DistinctAccumulator::new(accumulator))
        } else {
            accumulator
        }
    }
}

/// One aggregate call site in a GROUP BY
#[derive(Debug, Clone)]
pub struct AggregateCall {
    pub function: AggregateFunction,
    /// Argument evaluated per input row; ignored by COUNT(*)
    pub argument: Expr,
    pub distinct: bool,
    /// Slot receiving the group's result
    pub output_slot: SlotId,
}

impl AggregateCall {
    pub fn new(function: AggregateFunction, argument: Expr, output_slot: SlotId) -> Self {
        AggregateCall {
            function,
            argument,
            distinct: false,
            output_slot,
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}
