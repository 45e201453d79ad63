//! Text sample units.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use flowexec_core::api::{ParamKind, ParamSchema, ScriptUnit};

pub struct ConcatUnit;

#[async_trait]
impl ScriptUnit for ConcatUnit {
    fn name(&self) -> &str {
        "text.concat"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new()
            .with("left", ParamKind::String)
            .with("right", ParamKind::String)
    }

    async fn execute(&self, params: Map<String, Value>) -> anyhow::Result<Value> {
        let left = str_param(&params, "left")?;
        let right = str_param(&params, "right")?;
        Ok(json!({ "result": format!("{left}{right}") }))
    }
}

/// Returns its parameters unchanged; handy for wiring reference chains.
pub struct EchoUnit;

#[async_trait]
impl ScriptUnit for EchoUnit {
    fn name(&self) -> &str {
        "util.echo"
    }

    async fn execute(&self, params: Map<String, Value>) -> anyhow::Result<Value> {
        Ok(Value::Object(params))
    }
}

fn str_param<'a>(params: &'a Map<String, Value>, name: &str) -> anyhow::Result<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("missing string parameter '{name}'"))
}
