// Common Types
//
// Small shared types used by the value model and the executor.

pub mod types;

pub use self::types::{CollectionKind, ScopeMark, SlotId, SourceLocation};
