//! Arithmetic sample units.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use flowexec_core::api::{ParamKind, ParamSchema, ScriptUnit};

pub struct AddUnit;

#[async_trait]
impl ScriptUnit for AddUnit {
    fn name(&self) -> &str {
        "math.add"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new()
            .with("a", ParamKind::Int)
            .with("b", ParamKind::Int)
    }

    async fn execute(&self, params: Map<String, Value>) -> anyhow::Result<Value> {
        let a = int_param(&params, "a")?;
        let b = int_param(&params, "b")?;
        Ok(json!({ "result": a + b }))
    }
}

/// Signals division by zero in-band rather than raising, mirroring units
/// that report domain failures through their result payload.
pub struct DivideUnit;

#[async_trait]
impl ScriptUnit for DivideUnit {
    fn name(&self) -> &str {
        "math.divide"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new()
            .with("a", ParamKind::Float)
            .with("b", ParamKind::Float)
    }

    async fn execute(&self, params: Map<String, Value>) -> anyhow::Result<Value> {
        let a = float_param(&params, "a")?;
        let b = float_param(&params, "b")?;
        if b == 0.0 {
            return Ok(json!({ "result": null, "error": "Division by zero" }));
        }
        Ok(json!({ "result": a / b }))
    }
}

fn int_param(params: &Map<String, Value>, name: &str) -> anyhow::Result<i64> {
    params
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow::anyhow!("missing int parameter '{name}'"))
}

fn float_param(params: &Map<String, Value>, name: &str) -> anyhow::Result<f64> {
    params
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow::anyhow!("missing float parameter '{name}'"))
}
