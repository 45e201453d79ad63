use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Expected kind of a declared script parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    String,
    List,
    Map,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Bool => "bool",
            ParamKind::String => "string",
            ParamKind::List => "list",
            ParamKind::Map => "map",
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared parameter schema of a script unit: parameter name -> expected
/// kind. Parameters not named here pass through conversion untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSchema {
    params: BTreeMap<String, ParamKind>,
}

impl ParamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.params.insert(name.into(), kind);
        self
    }

    pub fn get(&self, name: &str) -> Option<ParamKind> {
        self.params.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamKind)> {
        self.params.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_params() {
        let schema = ParamSchema::new()
            .with("a", ParamKind::Int)
            .with("b", ParamKind::Float);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.get("a"), Some(ParamKind::Int));
        assert_eq!(schema.get("missing"), None);
    }

    #[test]
    fn serializes_as_plain_map() {
        let schema = ParamSchema::new().with("a", ParamKind::List);
        let v = serde_json::to_value(&schema).unwrap();
        assert_eq!(v, serde_json::json!({"a": "list"}));
    }
}
