// Binding Sources
//
// External data bound to a query by the caller, pulled one value at a time by
// the scan operator. Failures are opaque to the engine and are reported as
// `ExternalSourceFailure`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::CollectionKind;
use crate::value::Value;

/// Pull contract for externally supplied data
pub trait BindingSource: Send {
    /// Name used in error messages
    fn name(&self) -> &str;

    fn kind(&self) -> CollectionKind {
        CollectionKind::Bag
    }

    /// Start (or restart) producing values from the beginning.
    fn open(&mut self) -> anyhow::Result<()>;

    /// The next value, or `None` once exhausted.
    fn advance(&mut self) -> anyhow::Result<Option<Value>>;

    /// Release held resources. Must tolerate repeated calls.
    fn close(&mut self);
}

/// A source shared between the caller and the plan
pub type SharedSource = Arc<Mutex<dyn BindingSource>>;

pub fn shared<S: BindingSource + 'static>(source: S) -> SharedSource {
    Arc::new(Mutex::new(source))
}

/// A source over values already in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    values: Vec<Value>,
    kind: CollectionKind,
    position: Option<usize>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        MemorySource {
            name: name.into(),
            values,
            kind: CollectionKind::Bag,
            position: None,
        }
    }

    /// Report the values as an ordered list
    pub fn ordered(mut self) -> Self {
        self.kind = CollectionKind::List;
        self
    }

    pub fn is_open(&self) -> bool {
        self.position.is_some()
    }
}

impl BindingSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CollectionKind {
        self.kind
    }

    fn open(&mut self) -> anyhow::Result<()> {
        self.position = Some(0);
        Ok(())
    }

    fn advance(&mut self) -> anyhow::Result<Option<Value>> {
        let Some(position) = self.position.as_mut() else {
            anyhow::bail!("source '{}' read before open", self.name);
        };
        let next = self.values.get(*position).cloned();
        if next.is_some() {
            *position += 1;
        }
        Ok(next)
    }

    fn close(&mut self) {
        self.position = None;
    }
}
