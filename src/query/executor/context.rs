// Binding/Register Context
//
// The mutable evaluation context threaded through the operator tree. It owns
// the planner-assigned register array plus the scope bookmarks used for
// correlated nesting, and resolves names against the declared bindings.

use log::debug;

use crate::common::{ScopeMark, SlotId};
use crate::query::executor::engine::{ExecutionConfig, TypingMode};
use crate::query::executor::result::{QueryError, QueryResult};
use crate::value::Value;

/// How an identifier matches binding and field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseSensitivity {
    /// Delimited identifier, exact match only
    Sensitive,
    /// Regular identifier, matches ignoring case
    Insensitive,
}

impl CaseSensitivity {
    pub fn matches(self, wanted: &str, candidate: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => wanted == candidate,
            CaseSensitivity::Insensitive => wanted.to_lowercase() == candidate.to_lowercase(),
        }
    }
}

/// A name to resolve, with its case sensitivity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingName {
    pub name: String,
    pub case: CaseSensitivity,
}

impl BindingName {
    pub fn regular(name: impl Into<String>) -> Self {
        Self { name: name.into(), case: CaseSensitivity::Insensitive }
    }

    pub fn delimited(name: impl Into<String>) -> Self {
        Self { name: name.into(), case: CaseSensitivity::Sensitive }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.case.matches(&self.name, candidate)
    }
}

/// Outcome of resolving a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A declared binding
    Slot(SlotId),
    /// No declared binding matched; the struct bound in this slot carries the
    /// name as an attribute
    Attribute(SlotId),
    /// More than one binding in the nearest matching scope
    Ambiguous(Vec<SlotId>),
    Unresolved,
}

/// The register array for one statement execution.
///
/// Slots `[0, n)` form the global scope declared by the plan. `push_scope`
/// appends slots and records a bookmark; `pop_scope` truncates back to it.
#[derive(Debug)]
pub struct Environment {
    registers: Vec<Value>,
    names: Vec<Option<String>>,
    scopes: Vec<ScopeMark>,
    typing_mode: TypingMode,
    materialization_limit: Option<usize>,
}

impl Environment {
    /// Anonymous registers, nothing resolvable by name.
    pub fn new(register_count: usize, typing_mode: TypingMode) -> Self {
        Self::with_bindings(vec![None; register_count], typing_mode)
    }

    /// One register per entry; `Some(name)` entries are resolvable.
    pub fn with_bindings(names: Vec<Option<String>>, typing_mode: TypingMode) -> Self {
        Environment {
            registers: vec![Value::Missing; names.len()],
            names,
            scopes: Vec::new(),
            typing_mode,
            materialization_limit: None,
        }
    }

    pub fn from_config(names: Vec<Option<String>>, config: &ExecutionConfig) -> Self {
        let mut env = Self::with_bindings(names, config.typing_mode);
        env.materialization_limit = config.max_materialized_rows;
        env
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn typing_mode(&self) -> TypingMode {
        self.typing_mode
    }

    pub fn materialization_limit(&self) -> Option<usize> {
        self.materialization_limit
    }

    pub fn get_slot(&self, slot: SlotId) -> QueryResult<&Value> {
        self.registers.get(slot).ok_or_else(|| {
            QueryError::PlanMalformed(format!(
                "slot {} referenced but only {} registers are allocated",
                slot,
                self.registers.len()
            ))
        })
    }

    pub fn set_slot(&mut self, slot: SlotId, value: Value) -> QueryResult<()> {
        let allocated = self.registers.len();
        match self.registers.get_mut(slot) {
            Some(register) => {
                *register = value;
                Ok(())
            }
            None => Err(QueryError::PlanMalformed(format!(
                "write to slot {} but only {} registers are allocated",
                slot, allocated
            ))),
        }
    }

    /// Open a nested scope with one fresh register per name. Returns the index
    /// of the first new slot.
    pub fn push_scope(&mut self, names: &[Option<String>]) -> ScopeMark {
        let mark = self.registers.len();
        self.scopes.push(mark);
        self.registers.extend(std::iter::repeat(Value::Missing).take(names.len()));
        self.names.extend(names.iter().cloned());
        mark
    }

    pub fn pop_scope(&mut self) -> QueryResult<()> {
        let mark = self
            .scopes
            .pop()
            .ok_or_else(|| QueryError::PlanMalformed("pop_scope without a matching push_scope".to_string()))?;
        self.registers.truncate(mark);
        self.names.truncate(mark);
        Ok(())
    }

    /// Slot ranges of every scope, innermost first
    fn scope_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges = Vec::with_capacity(self.scopes.len() + 1);
        let mut end = self.registers.len();
        for &start in self.scopes.iter().rev() {
            ranges.push((start, end));
            end = start;
        }
        ranges.push((0, end));
        ranges
    }

    /// Resolve `name` against the declared bindings, innermost scope first.
    ///
    /// Only when no declared binding matches does the search fall back to the
    /// attributes of the struct values currently bound in scope.
    pub fn resolve(&self, name: &BindingName) -> Resolution {
        let ranges = self.scope_ranges();

        for &(start, end) in &ranges {
            let matches: Vec<SlotId> = (start..end)
                .filter(|&slot| matches!(&self.names[slot], Some(bound) if name.matches(bound)))
                .collect();
            match matches.len() {
                0 => continue,
                1 => return Resolution::Slot(matches[0]),
                _ => return Resolution::Ambiguous(matches),
            }
        }

        for &(start, end) in &ranges {
            for slot in start..end {
                if self.registers[slot].field(&name.name, name.case).is_some() {
                    return Resolution::Attribute(slot);
                }
            }
        }

        Resolution::Unresolved
    }

    /// Copy of every register, used by operators that materialize rows.
    pub fn snapshot(&self) -> Vec<Value> {
        self.registers.clone()
    }

    /// Reinstate a row captured by `snapshot`.
    pub fn restore(&mut self, row: &[Value]) -> QueryResult<()> {
        if row.len() != self.registers.len() {
            return Err(QueryError::PlanMalformed(format!(
                "restoring a {}-register row into {} registers",
                row.len(),
                self.registers.len()
            )));
        }
        self.registers.clone_from_slice(row);
        Ok(())
    }

    /// Apply the typing mode to a failed row-level evaluation: in permissive
    /// mode a recoverable error becomes `missing`, anything else propagates.
    pub fn coerce_error(&self, error: QueryError) -> QueryResult<Value> {
        if self.typing_mode == TypingMode::Permissive && error.is_recoverable() {
            debug!("Permissive mode: coercing '{}' to MISSING", error);
            Ok(Value::Missing)
        } else {
            Err(error)
        }
    }

    /// Fail once a blocking operator holds more rows than configured.
    pub fn check_materialized(&self, operator: &str, rows: usize) -> QueryResult<()> {
        match self.materialization_limit {
            Some(limit) if rows > limit => Err(QueryError::ResourceLimitExceeded(format!(
                "{} materialized {} rows, limit is {}",
                operator, rows, limit
            ))),
            _ => Ok(()),
        }
    }
}
