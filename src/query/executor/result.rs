// Query Result Types
//
// This module defines the error type surfaced by the executor and the
// `QueryResult` alias used throughout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::SourceLocation;
use crate::value::{Value, ValueConstructionError};

/// Error classes surfaced to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    PlanMalformed,
    AmbiguousOrUnresolvedBinding,
    FunctionNotFound,
    ArityMismatch,
    DataTypeMismatch,
    InvalidArgumentValue,
    NumericOverflow,
    ExternalSourceFailure,
    ValueConstruction,
    ResourceLimitExceeded,
}

/// Represents query execution error
#[derive(Error, Debug)]
pub enum QueryError {
    /// The plan references something that cannot exist at run time
    #[error("Malformed plan: {0}")]
    PlanMalformed(String),
    #[error("Ambiguous binding: {0}")]
    AmbiguousBinding(String),
    #[error("Unresolved binding: {0}")]
    UnresolvedBinding(String),
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
    #[error("Function {name} expects {expected} arguments, got {actual}")]
    ArityMismatch { name: String, expected: String, actual: usize },
    #[error("Type error: {0}")]
    DataTypeMismatch(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Invalid argument: {0}")]
    InvalidArgumentValue(String),
    #[error("Numeric overflow: {0}")]
    NumericOverflow(String),
    #[error("External source '{name}' failed: {error}")]
    ExternalSourceFailure {
        name: String,
        #[source]
        error: anyhow::Error,
    },
    #[error("Invalid value: {0}")]
    ValueConstruction(#[from] ValueConstructionError),
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),
    /// Another error, tagged with the query position that raised it
    #[error("{error} (at {location})")]
    At {
        location: SourceLocation,
        #[source]
        error: Box<QueryError>,
    },
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::PlanMalformed(_) => ErrorKind::PlanMalformed,
            QueryError::AmbiguousBinding(_) | QueryError::UnresolvedBinding(_) => {
                ErrorKind::AmbiguousOrUnresolvedBinding
            }
            QueryError::FunctionNotFound(_) => ErrorKind::FunctionNotFound,
            QueryError::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            QueryError::DataTypeMismatch(_) | QueryError::DivisionByZero => ErrorKind::DataTypeMismatch,
            QueryError::InvalidArgumentValue(_) => ErrorKind::InvalidArgumentValue,
            QueryError::NumericOverflow(_) => ErrorKind::NumericOverflow,
            QueryError::ExternalSourceFailure { .. } => ErrorKind::ExternalSourceFailure,
            QueryError::ValueConstruction(_) => ErrorKind::ValueConstruction,
            QueryError::ResourceLimitExceeded(_) => ErrorKind::ResourceLimitExceeded,
            QueryError::At { error, .. } => error.kind(),
        }
    }

    /// Whether the typing mode decides this error's fate. Everything else is
    /// fatal in every mode.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::DataTypeMismatch
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            QueryError::At { location, .. } => Some(*location),
            _ => None,
        }
    }

    /// Tag with a location unless an inner node already did.
    pub fn at(self, location: SourceLocation) -> Self {
        match self {
            located @ QueryError::At { .. } => located,
            error => QueryError::At { location, error: Box::new(error) },
        }
    }

    pub fn type_mismatch(expected: &str, found: &Value) -> Self {
        QueryError::DataTypeMismatch(format!("expected {}, found {} ({})", expected, found.value_type(), found))
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
