use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker key that makes a JSON object a symbolic reference.
pub const REF_KEY: &str = "$ref";

/// A symbolic pointer from one task's context to a field of another
/// completed task's result within the same run. The run is implicit; the
/// wire form is `{"$ref": {"node": "<node_id>", "path": "a.b.0"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub node: String,

    /// Dot-separated path inside the target result; empty means the whole
    /// result payload. Numeric segments index into sequences.
    #[serde(default)]
    pub path: String,
}

impl Reference {
    pub fn new(node: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            path: path.into(),
        }
    }

    /// Wire form, for embedding into a context value.
    pub fn to_value(&self) -> Value {
        let mut marker = Map::new();
        marker.insert(
            REF_KEY.to_string(),
            serde_json::to_value(self).expect("reference serialization cannot fail"),
        );
        Value::Object(marker)
    }

    /// Detects a `$ref` marker object. Returns `None` for ordinary values,
    /// `Some(Err(_))` when the marker body is malformed — a malformed
    /// reference can never resolve and is reported as unresolved.
    pub fn from_marker(value: &Value) -> Option<Result<Self, String>> {
        let obj = value.as_object()?;
        let body = obj.get(REF_KEY)?;
        Some(
            serde_json::from_value::<Reference>(body.clone())
                .map_err(|e| format!("malformed $ref body: {e}")),
        )
    }

    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.').filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_round_trips() {
        let r = Reference::new("node-a", "result.value");
        let v = r.to_value();
        let parsed = Reference::from_marker(&v).unwrap().unwrap();
        assert_eq!(parsed, r);
    }

    #[test]
    fn plain_objects_are_not_markers() {
        let v = serde_json::json!({"a": 1});
        assert!(Reference::from_marker(&v).is_none());
        assert!(Reference::from_marker(&serde_json::json!(7)).is_none());
    }

    #[test]
    fn malformed_marker_body_is_an_error() {
        let v = serde_json::json!({"$ref": {"path": "x"}});
        assert!(Reference::from_marker(&v).unwrap().is_err());
        let v = serde_json::json!({"$ref": "node-a"});
        assert!(Reference::from_marker(&v).unwrap().is_err());
    }

    #[test]
    fn empty_path_yields_no_segments() {
        let r = Reference::new("n", "");
        assert_eq!(r.path_segments().count(), 0);
        let r = Reference::new("n", "a.b");
        assert_eq!(r.path_segments().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
