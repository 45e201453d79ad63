//! Post-dispatch transform: normalize whatever came back from (or happened
//! to) a worker into exactly one `ExecutionResult`, and record successes
//! into the run result cache. This is the single boundary where in-band
//! `{"error": ...}` payloads, raised faults, timeouts, and crashes collapse
//! into one failure representation.

use serde_json::Value;

use crate::cache::ResultCache;
use crate::engine::types::ReadyTask;
use crate::error::WorkerError;
use crate::types::{ExecutionResult, FailureKind};

/// What the slot supervisor observed for one dispatched task.
#[derive(Debug)]
pub(crate) enum ExecOutcome {
    /// The worker replied in protocol.
    Reply {
        ok: bool,
        value: Option<Value>,
        error: Option<String>,
    },

    /// No reply within the task's budget.
    Timeout,

    /// The session broke: EOF, broken pipe, or an unparseable reply.
    Crash(WorkerError),

    /// Engine shutdown forced termination mid-task.
    Aborted,
}

/// Normalizes an outcome and records successes. Returns the result plus
/// whether the worker that produced it is still usable.
pub(crate) fn post_dispatch(
    task: &ReadyTask,
    outcome: ExecOutcome,
    duration_ms: u64,
    cache: &ResultCache,
) -> (ExecutionResult, bool) {
    let item = &task.item;
    match outcome {
        ExecOutcome::Reply { ok, value, error } => {
            if !ok {
                let msg = error.unwrap_or_else(|| "script unit failed".to_string());
                return (
                    ExecutionResult::failure(
                        &item.execution_id,
                        &item.node_id,
                        FailureKind::ScriptFault,
                        msg,
                        duration_ms,
                    ),
                    true,
                );
            }

            let value = value.unwrap_or(Value::Null);
            if let Some(domain_error) = in_band_error(&value) {
                return (
                    ExecutionResult::failure(
                        &item.execution_id,
                        &item.node_id,
                        FailureKind::ScriptDomainError,
                        domain_error,
                        duration_ms,
                    ),
                    true,
                );
            }

            cache.record(&item.run_id, &item.node_id, value.clone());
            (
                ExecutionResult::success(&item.execution_id, &item.node_id, value, duration_ms),
                true,
            )
        }

        ExecOutcome::Timeout => (
            ExecutionResult::failure(
                &item.execution_id,
                &item.node_id,
                FailureKind::Timeout,
                format!("execution exceeded {}s budget", task.timeout.as_secs()),
                duration_ms,
            ),
            false,
        ),

        ExecOutcome::Crash(e) => (
            ExecutionResult::failure(
                &item.execution_id,
                &item.node_id,
                FailureKind::WorkerCrash,
                format!("worker crashed: {e}"),
                duration_ms,
            ),
            false,
        ),

        ExecOutcome::Aborted => (
            ExecutionResult::failure(
                &item.execution_id,
                &item.node_id,
                FailureKind::WorkerCrash,
                "worker terminated during engine shutdown",
                duration_ms,
            ),
            false,
        ),
    }
}

/// A non-null `"error"` field in a result payload is a domain failure.
fn in_band_error(value: &Value) -> Option<String> {
    let err = value.as_object()?.get("error")?;
    match err {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskStatus, WorkItem};
    use std::time::Duration;

    fn ready(run: &str, node: &str) -> ReadyTask {
        ReadyTask {
            item: {
                let mut item = WorkItem::new(run, node, "unit");
                item.execution_id = format!("exec-{node}");
                item
            },
            params: serde_json::Map::new(),
            timeout: Duration::from_secs(5),
        }
    }

    fn cache() -> ResultCache {
        ResultCache::new(Duration::from_secs(60))
    }

    #[test]
    fn success_records_into_cache() {
        let cache = cache();
        let task = ready("r1", "a");
        let (result, keep) = post_dispatch(
            &task,
            ExecOutcome::Reply {
                ok: true,
                value: Some(serde_json::json!({"result": 7})),
                error: None,
            },
            3,
            &cache,
        );
        assert!(keep);
        assert_eq!(result.status, TaskStatus::Success);
        assert_eq!(result.duration_ms, 3);
        assert_eq!(
            cache.lookup("r1", "a"),
            Some(serde_json::json!({"result": 7}))
        );
    }

    #[test]
    fn in_band_error_and_fault_normalize_to_error() {
        let cache = cache();
        let task = ready("r1", "a");

        let (in_band, keep) = post_dispatch(
            &task,
            ExecOutcome::Reply {
                ok: true,
                value: Some(serde_json::json!({"result": null, "error": "Division by zero"})),
                error: None,
            },
            1,
            &cache,
        );
        assert!(keep);
        assert_eq!(in_band.status, TaskStatus::Error);
        assert_eq!(in_band.failure, Some(FailureKind::ScriptDomainError));
        assert_eq!(in_band.error.as_deref(), Some("Division by zero"));

        let (raised, keep) = post_dispatch(
            &task,
            ExecOutcome::Reply {
                ok: false,
                value: None,
                error: Some("Division by zero".into()),
            },
            1,
            &cache,
        );
        assert!(keep);
        assert_eq!(raised.status, TaskStatus::Error);
        assert_eq!(raised.failure, Some(FailureKind::ScriptFault));

        // Neither failure shape pollutes the cache.
        assert_eq!(cache.lookup("r1", "a"), None);
    }

    #[test]
    fn null_error_field_is_not_a_failure() {
        let cache = cache();
        let task = ready("r1", "a");
        let (result, _) = post_dispatch(
            &task,
            ExecOutcome::Reply {
                ok: true,
                value: Some(serde_json::json!({"result": 1, "error": null})),
                error: None,
            },
            1,
            &cache,
        );
        assert_eq!(result.status, TaskStatus::Success);
    }

    #[test]
    fn timeout_and_crash_discard_the_worker() {
        let cache = cache();
        let task = ready("r1", "a");

        let (result, keep) = post_dispatch(&task, ExecOutcome::Timeout, 5000, &cache);
        assert!(!keep);
        assert_eq!(result.failure, Some(FailureKind::Timeout));

        let (result, keep) = post_dispatch(
            &task,
            ExecOutcome::Crash(WorkerError::StreamClosed),
            12,
            &cache,
        );
        assert!(!keep);
        assert_eq!(result.failure, Some(FailureKind::WorkerCrash));
    }
}
