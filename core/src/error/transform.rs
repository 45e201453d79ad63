use thiserror::Error;

use crate::types::FailureKind;

/// Pre-dispatch failures. These are produced by the dispatcher before a task
/// ever reaches a worker, and are turned into error `ExecutionResult`s
/// directly on the output queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("unresolved reference: node '{node}' path '{path}'")]
    UnresolvedReference { node: String, path: String },

    #[error("type conversion failed for parameter '{param}': expected {expected}, got {actual}")]
    TypeConversion {
        param: String,
        expected: String,
        actual: String,
    },

    #[error("unknown script: {0}")]
    UnknownScript(String),
}

impl TransformError {
    /// Map transform error to the result taxonomy tag.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::UnresolvedReference { .. } => FailureKind::UnresolvedReference,
            Self::TypeConversion { .. } => FailureKind::TypeConversion,
            Self::UnknownScript(_) => FailureKind::UnknownScript,
        }
    }
}
