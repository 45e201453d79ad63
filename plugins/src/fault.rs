//! Fault-injection units used to exercise the pool's failure paths.

use async_trait::async_trait;
use serde_json::{Map, Value};

use flowexec_core::api::{ParamKind, ParamSchema, ScriptUnit};

/// Raises a fault instead of returning a payload.
pub struct FailUnit;

#[async_trait]
impl ScriptUnit for FailUnit {
    fn name(&self) -> &str {
        "fault.fail"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new().with("message", ParamKind::String)
    }

    async fn execute(&self, params: Map<String, Value>) -> anyhow::Result<Value> {
        let message = params
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("injected failure");
        Err(anyhow::anyhow!("{message}"))
    }
}

/// Kills the hosting worker process outright, simulating a hard crash.
pub struct ExitUnit;

#[async_trait]
impl ScriptUnit for ExitUnit {
    fn name(&self) -> &str {
        "fault.exit"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new().with("code", ParamKind::Int)
    }

    async fn execute(&self, params: Map<String, Value>) -> anyhow::Result<Value> {
        let code = params.get("code").and_then(Value::as_i64).unwrap_or(1);
        std::process::exit(code as i32);
    }
}
