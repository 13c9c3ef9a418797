// Scan Operator Implementation
//
// Iterates the elements of a collection, binding each to a slot and optionally
// its ordinal to a second slot (`FROM e AS x AT i`).

use log::debug;

use crate::common::{CollectionKind, SlotId};
use crate::query::executor::context::Environment;
use crate::query::executor::engine::TypingMode;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::{not_open, Operator};
use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::executor::source::SharedSource;
use crate::value::Value;

/// Where the scanned values come from
pub enum ScanSource {
    /// A collection computed from the current bindings when the scan opens
    Expression(Expr),
    /// A caller-provided source pulled one value at a time
    External(SharedSource),
}

/// Scan operator that binds one collection element per row
pub struct ScanOperator {
    source: ScanSource,
    /// Slot receiving each element
    value_slot: SlotId,
    /// Slot receiving the element's position, if requested
    position_slot: Option<SlotId>,
    /// Buffered elements of an expression source
    elements: std::vec::IntoIter<Value>,
    /// Index of the next element
    position: usize,
    /// Bag or list, known once opened
    kind: CollectionKind,
    /// Whether the operator is initialized
    initialized: bool,
}

impl ScanOperator {
    pub fn new(source: ScanSource, value_slot: SlotId, position_slot: Option<SlotId>) -> Self {
        ScanOperator {
            source,
            value_slot,
            position_slot,
            elements: Vec::new().into_iter(),
            position: 0,
            kind: CollectionKind::Bag,
            initialized: false,
        }
    }

    fn external_failure(source: &SharedSource, error: anyhow::Error) -> QueryError {
        QueryError::ExternalSourceFailure {
            name: source.lock().name().to_string(),
            error,
        }
    }

    /// Split an evaluated collection into its elements. Scalars scan as a
    /// one-element bag in permissive mode.
    fn elements_of(value: Value, env: &Environment) -> QueryResult<(Vec<Value>, CollectionKind)> {
        match value.collection_kind() {
            Some(kind) => {
                let elements = value.into_elements().unwrap_or_default();
                Ok((elements, kind))
            }
            None if env.typing_mode() == TypingMode::Permissive => Ok((vec![value], CollectionKind::Bag)),
            None => Err(QueryError::type_mismatch("a collection to scan", &value)),
        }
    }

    fn next_value(&mut self) -> QueryResult<Option<Value>> {
        match &self.source {
            ScanSource::Expression(_) => Ok(self.elements.next()),
            ScanSource::External(source) => {
                let next = source.lock().advance();
                next.map_err(|e| Self::external_failure(source, e))
            }
        }
    }
}

impl Operator for ScanOperator {
    fn open(&mut self, env: &mut Environment) -> QueryResult<()> {
        self.position = 0;
        match &self.source {
            ScanSource::Expression(expr) => {
                let value = expr.evaluate(env)?;
                let (elements, kind) = Self::elements_of(value, env)?;
                self.elements = elements.into_iter();
                self.kind = kind;
            }
            ScanSource::External(source) => {
                let opened = {
                    let mut guard = source.lock();
                    self.kind = guard.kind();
                    debug!("Opening binding source '{}'", guard.name());
                    guard.open()
                };
                opened.map_err(|e| Self::external_failure(source, e))?;
            }
        }
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("Scan"));
        }
        let Some(value) = self.next_value()? else {
            return Ok(false);
        };

        env.set_slot(self.value_slot, value)?;
        if let Some(slot) = self.position_slot {
            // Bags have no positions
            let position = match self.kind {
                CollectionKind::List => Value::Int64(self.position as i64),
                CollectionKind::Bag => Value::Missing,
            };
            env.set_slot(slot, position)?;
        }
        self.position += 1;
        Ok(true)
    }

    fn close(&mut self) -> QueryResult<()> {
        if let ScanSource::External(source) = &self.source {
            if self.initialized {
                source.lock().close();
            }
        }
        self.elements = Vec::new().into_iter();
        self.initialized = false;
        Ok(())
    }

    fn output_kind(&self) -> CollectionKind {
        self.kind
    }
}
