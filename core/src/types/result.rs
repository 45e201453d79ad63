use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Error,
}

/// Failure taxonomy tag carried on error results.
///
/// Pre-dispatch kinds (`UnresolvedReference`, `TypeConversion`,
/// `UnknownScript`) are produced by the dispatcher and never reach a worker;
/// the rest are normalized at the worker pool boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnresolvedReference,
    TypeConversion,
    UnknownScript,
    ScriptFault,
    ScriptDomainError,
    Timeout,
    WorkerCrash,
}

/// The single terminal outcome record produced for every accepted task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: String,
    pub node_id: String,
    pub status: TaskStatus,

    /// Payload on success, `None` on failure.
    pub result: Option<Value>,

    /// Message on failure, `None` on success.
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,

    #[serde(default)]
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn success(
        execution_id: impl Into<String>,
        node_id: impl Into<String>,
        result: Value,
        duration_ms: u64,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            node_id: node_id.into(),
            status: TaskStatus::Success,
            result: Some(result),
            error: None,
            failure: None,
            duration_ms,
        }
    }

    pub fn failure(
        execution_id: impl Into<String>,
        node_id: impl Into<String>,
        kind: FailureKind,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            node_id: node_id.into(),
            status: TaskStatus::Error,
            result: None,
            error: Some(error.into()),
            failure: Some(kind),
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}
