//! Timing sample unit. Reports its own execution window so tests can check
//! concurrency without shared state across worker processes.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use flowexec_core::api::{ParamKind, ParamSchema, ScriptUnit};

pub struct SleepUnit;

#[async_trait]
impl ScriptUnit for SleepUnit {
    fn name(&self) -> &str {
        "util.sleep"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new().with("duration_ms", ParamKind::Int)
    }

    async fn execute(&self, params: Map<String, Value>) -> anyhow::Result<Value> {
        let duration_ms = params
            .get("duration_ms")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow::anyhow!("missing int parameter 'duration_ms'"))?;

        let started_ms = chrono::Utc::now().timestamp_millis();
        tokio::time::sleep(std::time::Duration::from_millis(duration_ms)).await;
        let ended_ms = chrono::Utc::now().timestamp_millis();

        Ok(json!({
            "result": { "started_ms": started_ms, "ended_ms": ended_ms }
        }))
    }
}
