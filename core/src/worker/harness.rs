//! Worker-side serve loop: read requests from stdin, execute registered
//! units, write replies to stdout. Logs go to stderr so the protocol channel
//! stays clean.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::WorkerError;
use crate::registry::ScriptRegistry;

use super::protocol::{from_line, to_line, ParentMessage, WorkerMessage};

/// Set on spawned worker processes. Embedding binaries check it via
/// [`run_if_worker`] before doing anything else.
pub const WORKER_ENV_VAR: &str = "FLOWEXEC_WORKER";

pub fn is_worker_process() -> bool {
    std::env::var_os(WORKER_ENV_VAR)
        .map(|v| !v.is_empty() && v != "0")
        .unwrap_or(false)
}

/// Embedding hook: if this process was launched in worker mode, serve the
/// protocol until the parent closes stdin, then report `true` so the caller
/// can exit instead of starting its normal path.
pub async fn run_if_worker(registry: Arc<ScriptRegistry>) -> Result<bool, WorkerError> {
    if !is_worker_process() {
        return Ok(false);
    }
    run_worker(registry).await?;
    Ok(true)
}

/// Serves the worker protocol on stdin/stdout until shutdown or EOF.
pub async fn run_worker(registry: Arc<ScriptRegistry>) -> Result<(), WorkerError> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    write_line(&mut stdout, &WorkerMessage::ready()).await?;
    tracing::debug!(target: "flowexec.harness", scripts = registry.len(), "worker serving");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                return Err(WorkerError::StreamIo {
                    stream: "stdin",
                    source: e,
                })
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match from_line::<ParentMessage>(&line) {
            Ok(ParentMessage::Exec {
                execution_id,
                script_id,
                params,
                ..
            }) => {
                let reply = execute_one(&registry, execution_id, &script_id, params).await;
                write_line(&mut stdout, &reply).await?;
            }
            Ok(ParentMessage::Shutdown { .. }) => {
                tracing::debug!(target: "flowexec.harness", "shutdown requested");
                break;
            }
            Err(e) => {
                // The parent only ever sends well-formed lines; log and keep
                // serving rather than dying on a garbled one.
                tracing::warn!(target: "flowexec.harness", error = %e, "unparseable request line");
            }
        }
    }

    Ok(())
}

async fn execute_one(
    registry: &ScriptRegistry,
    execution_id: String,
    script_id: &str,
    params: serde_json::Map<String, serde_json::Value>,
) -> WorkerMessage {
    let Some(unit) = registry.get(script_id) else {
        return WorkerMessage::result_err(execution_id, format!("unknown script: {script_id}"));
    };

    tracing::debug!(target: "flowexec.harness", execution_id = %execution_id, script_id = %script_id, "executing");
    match unit.execute(params).await {
        Ok(value) => WorkerMessage::result_ok(execution_id, value),
        Err(e) => WorkerMessage::result_err(execution_id, e.to_string()),
    }
}

async fn write_line(
    stdout: &mut tokio::io::Stdout,
    msg: &WorkerMessage,
) -> Result<(), WorkerError> {
    let line = to_line(msg);
    let write = async {
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await
    };
    write.await.map_err(|e| WorkerError::StreamIo {
        stream: "stdout",
        source: e,
    })
}
