// Join Operators Module
//
// This module defines the join operators for query execution. The planner
// picks the strategy; nested loop is the only one, and supports correlated
// inner sides because the inner is re-opened after each outer row is bound.

pub use self::nested_loop::NestedLoopJoin;

mod nested_loop;

/// Join flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    /// Outer rows without a match are kept, with the inner slots bound to
    /// missing
    Left,
    /// Every pairing; any condition is ignored
    Cross,
}
