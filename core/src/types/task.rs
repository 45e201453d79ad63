use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::util::generate_execution_id;

/// Which worker pool executes a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskClass {
    #[default]
    Io,
    Cpu,
}

impl TaskClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskClass::Io => "io",
            TaskClass::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for TaskClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of submitted work, corresponding to a node in a flow graph.
///
/// Immutable once enqueued: the pipeline only ever clones and consumes it,
/// and replaces it with exactly one [`ExecutionResult`].
///
/// [`ExecutionResult`]: crate::types::ExecutionResult
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Globally unique per submission; never reused. Resubmission after a
    /// failure means a fresh id.
    pub execution_id: String,

    /// Groups tasks belonging to one flow execution.
    pub run_id: String,

    /// Unique within `run_id`.
    pub node_id: String,

    /// Locator of the registered script unit.
    pub script_id: String,

    /// Parameter name -> value or embedded `$ref` reference.
    #[serde(default)]
    pub context: Map<String, Value>,

    #[serde(default)]
    pub class: TaskClass,

    /// Per-task override of the configured execution budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl WorkItem {
    pub fn new(run_id: impl Into<String>, node_id: impl Into<String>, script_id: impl Into<String>) -> Self {
        Self {
            execution_id: generate_execution_id(),
            run_id: run_id.into(),
            node_id: node_id.into(),
            script_id: script_id.into(),
            context: Map::new(),
            class: TaskClass::Io,
            timeout_secs: None,
        }
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn with_class(mut self, class: TaskClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_io_class() {
        let item = WorkItem::new("run-1", "n1", "math.add");
        assert_eq!(item.class, TaskClass::Io);
        assert!(item.timeout_secs.is_none());
        assert!(item.context.is_empty());
    }

    #[test]
    fn class_deserializes_from_lowercase() {
        let item: WorkItem = serde_json::from_value(serde_json::json!({
            "execution_id": "e1",
            "run_id": "r1",
            "node_id": "n1",
            "script_id": "math.add",
            "class": "cpu"
        }))
        .unwrap();
        assert_eq!(item.class, TaskClass::Cpu);
    }

    #[test]
    fn fresh_items_get_distinct_execution_ids() {
        let a = WorkItem::new("r", "a", "s");
        let b = WorkItem::new("r", "b", "s");
        assert_ne!(a.execution_id, b.execution_id);
    }
}
