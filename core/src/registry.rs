//! Explicit script-unit registry.
//!
//! Units are registered by name at startup; there is no runtime path-based
//! loading. The same registry value serves both sides of the process
//! boundary: the parent reads declared schemas during pre-dispatch, the
//! worker harness resolves `script_id` to an executable unit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::types::ParamSchema;

/// A pluggable script unit: one `execute` capability plus a declared
/// parameter schema. Domain failure may be signalled either by returning
/// `Err` or by an `"error"` field in the returned payload; the worker pool
/// normalizes both identically.
#[async_trait]
pub trait ScriptUnit: Send + Sync {
    fn name(&self) -> &str;

    /// Declared parameter kinds; resolved context values are coerced to
    /// these before dispatch. Empty schema means passthrough.
    fn schema(&self) -> ParamSchema {
        ParamSchema::new()
    }

    async fn execute(&self, params: Map<String, Value>) -> anyhow::Result<Value>;
}

/// Mapping from `script_id` to registered unit.
#[derive(Default)]
pub struct ScriptRegistry {
    units: HashMap<String, Arc<dyn ScriptUnit>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit under its own name. Re-registering a name replaces
    /// the previous unit.
    pub fn register(&mut self, unit: Arc<dyn ScriptUnit>) {
        let name = unit.name().to_string();
        if self.units.insert(name.clone(), unit).is_some() {
            tracing::warn!(target: "flowexec.registry", script_id = %name, "replacing registered script unit");
        }
    }

    pub fn get(&self, script_id: &str) -> Option<Arc<dyn ScriptUnit>> {
        self.units.get(script_id).cloned()
    }

    pub fn contains(&self, script_id: &str) -> bool {
        self.units.contains_key(script_id)
    }

    pub fn names(&self) -> Vec<&str> {
        self.units.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop(&'static str);

    #[async_trait]
    impl ScriptUnit for Nop {
        fn name(&self) -> &str {
            self.0
        }

        async fn execute(&self, _params: Map<String, Value>) -> anyhow::Result<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn register_and_get() {
        let mut reg = ScriptRegistry::new();
        reg.register(Arc::new(Nop("a")));
        reg.register(Arc::new(Nop("b")));
        assert_eq!(reg.len(), 2);
        assert!(reg.contains("a"));
        assert!(reg.get("c").is_none());
    }

    #[test]
    fn reregistering_replaces() {
        let mut reg = ScriptRegistry::new();
        reg.register(Arc::new(Nop("a")));
        reg.register(Arc::new(Nop("a")));
        assert_eq!(reg.len(), 1);
    }
}
