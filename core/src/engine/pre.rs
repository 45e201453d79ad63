//! Pre-dispatch transform: reference resolution against the run result
//! cache, then type coercion against the unit's declared schema. Pure with
//! respect to the task; failures here never reach a worker.

use serde_json::{Map, Number, Value};

use crate::cache::ResultCache;
use crate::error::TransformError;
use crate::registry::ScriptRegistry;
use crate::types::{ParamKind, ParamSchema, Reference, WorkItem};

/// Resolves and converts a task's context. Conversion runs strictly after
/// resolution so a coerced value can never mask an unresolved reference.
pub fn pre_dispatch(
    item: &WorkItem,
    registry: &ScriptRegistry,
    cache: &ResultCache,
) -> Result<Map<String, Value>, TransformError> {
    let unit = registry
        .get(&item.script_id)
        .ok_or_else(|| TransformError::UnknownScript(item.script_id.clone()))?;

    let resolved = resolve_context(&item.run_id, &item.context, cache)?;
    let converted = convert_params(&unit.schema(), resolved)?;

    tracing::debug!(
        target: "flowexec.engine",
        stage = "pre.done",
        execution_id = %item.execution_id,
        script_id = %item.script_id,
        params = converted.len()
    );
    Ok(converted)
}

/// Rewrites every embedded `$ref` with the recorded value it points at.
/// Never blocks waiting for a dependency: a missing node or path fails the
/// task immediately.
pub fn resolve_context(
    run_id: &str,
    context: &Map<String, Value>,
    cache: &ResultCache,
) -> Result<Map<String, Value>, TransformError> {
    let mut out = Map::with_capacity(context.len());
    for (key, value) in context {
        out.insert(key.clone(), resolve_value(run_id, value, cache)?);
    }
    Ok(out)
}

fn resolve_value(run_id: &str, value: &Value, cache: &ResultCache) -> Result<Value, TransformError> {
    if let Some(parsed) = Reference::from_marker(value) {
        let reference = parsed.map_err(|_| TransformError::UnresolvedReference {
            node: "<malformed>".to_string(),
            path: String::new(),
        })?;
        return resolve_reference(run_id, &reference, cache);
    }

    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), resolve_value(run_id, v, cache)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for v in items {
                out.push(resolve_value(run_id, v, cache)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_reference(
    run_id: &str,
    reference: &Reference,
    cache: &ResultCache,
) -> Result<Value, TransformError> {
    let unresolved = || TransformError::UnresolvedReference {
        node: reference.node.clone(),
        path: reference.path.clone(),
    };

    let root = cache.lookup(run_id, &reference.node).ok_or_else(unresolved)?;

    let mut current = &root;
    for segment in reference.path_segments() {
        current = match current {
            Value::Object(map) => map.get(segment).ok_or_else(unresolved)?,
            Value::Array(items) => {
                let idx: usize = segment.parse().map_err(|_| unresolved())?;
                items.get(idx).ok_or_else(unresolved)?
            }
            _ => return Err(unresolved()),
        };
    }
    Ok(current.clone())
}

/// Coerces each resolved value to its declared kind. Parameters absent from
/// the schema pass through untouched.
pub fn convert_params(
    schema: &ParamSchema,
    params: Map<String, Value>,
) -> Result<Map<String, Value>, TransformError> {
    if schema.is_empty() {
        return Ok(params);
    }
    let mut out = Map::with_capacity(params.len());
    for (name, value) in params {
        let converted = match schema.get(&name) {
            Some(kind) => convert_value(&name, kind, value)?,
            None => value,
        };
        out.insert(name, converted);
    }
    Ok(out)
}

fn convert_value(param: &str, kind: ParamKind, value: Value) -> Result<Value, TransformError> {
    let mismatch = |value: &Value| TransformError::TypeConversion {
        param: param.to_string(),
        expected: kind.as_str().to_string(),
        actual: render_actual(value),
    };

    match kind {
        ParamKind::Int => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(n) => Ok(Value::Number(n.into())),
                Err(_) => Err(mismatch(&value)),
            },
            _ => Err(mismatch(&value)),
        },
        ParamKind::Float => match &value {
            // int -> float widening is allowed.
            Value::Number(_) => Ok(value),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) => Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| mismatch(&value)),
                Err(_) => Err(mismatch(&value)),
            },
            _ => Err(mismatch(&value)),
        },
        ParamKind::Bool => match &value {
            Value::Bool(_) => Ok(value),
            _ => Err(mismatch(&value)),
        },
        ParamKind::String => match &value {
            Value::String(_) => Ok(value),
            _ => Err(mismatch(&value)),
        },
        ParamKind::List => match &value {
            Value::Array(_) => Ok(value),
            _ => Err(mismatch(&value)),
        },
        ParamKind::Map => match &value {
            Value::Object(_) => Ok(value),
            _ => Err(mismatch(&value)),
        },
    }
}

fn render_actual(value: &Value) -> String {
    const MAX: usize = 120;
    let s = value.to_string();
    if s.len() <= MAX {
        return s;
    }
    let end = s
        .char_indices()
        .take_while(|(i, _)| *i < MAX)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let mut out = s[..end].to_string();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn cache_with(run: &str, node: &str, value: Value) -> ResultCache {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.record(run, node, value);
        cache
    }

    fn ctx(value: Value) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("a".into(), value);
        m
    }

    #[test]
    fn resolves_recorded_reference() {
        let cache = cache_with("r1", "x", serde_json::json!({"result": 7}));
        let context = ctx(Reference::new("x", "result").to_value());
        let out = resolve_context("r1", &context, &cache).unwrap();
        assert_eq!(out["a"], serde_json::json!(7));
    }

    #[test]
    fn resolves_nested_and_indexed_paths() {
        let cache = cache_with("r1", "x", serde_json::json!({"items": [{"v": 1}, {"v": 2}]}));
        let context = ctx(serde_json::json!({
            "inner": [Reference::new("x", "items.1.v").to_value()]
        }));
        let out = resolve_context("r1", &context, &cache).unwrap();
        assert_eq!(out["a"]["inner"][0], serde_json::json!(2));
    }

    #[test]
    fn empty_path_takes_whole_result() {
        let cache = cache_with("r1", "x", serde_json::json!({"result": 7}));
        let context = ctx(Reference::new("x", "").to_value());
        let out = resolve_context("r1", &context, &cache).unwrap();
        assert_eq!(out["a"], serde_json::json!({"result": 7}));
    }

    #[test]
    fn missing_node_is_unresolved() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let context = ctx(Reference::new("ghost", "result").to_value());
        let err = resolve_context("r1", &context, &cache).unwrap_err();
        assert!(matches!(
            err,
            TransformError::UnresolvedReference { node, .. } if node == "ghost"
        ));
    }

    #[test]
    fn missing_path_is_unresolved() {
        let cache = cache_with("r1", "x", serde_json::json!({"result": 7}));
        let context = ctx(Reference::new("x", "result.deeper").to_value());
        assert!(matches!(
            resolve_context("r1", &context, &cache),
            Err(TransformError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn malformed_marker_is_unresolved() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let context = ctx(serde_json::json!({"$ref": 42}));
        assert!(matches!(
            resolve_context("r1", &context, &cache),
            Err(TransformError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn non_references_pass_through() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let context = ctx(serde_json::json!({"plain": [1, "two", null]}));
        let out = resolve_context("r1", &context, &cache).unwrap();
        assert_eq!(out, context);
    }

    #[test]
    fn converts_numeric_string_to_int() {
        let schema = ParamSchema::new().with("a", ParamKind::Int);
        let out = convert_params(&schema, ctx(serde_json::json!("5"))).unwrap();
        assert_eq!(out["a"], serde_json::json!(5));
    }

    #[test]
    fn rejects_non_numeric_string_as_int() {
        let schema = ParamSchema::new().with("a", ParamKind::Int);
        let err = convert_params(&schema, ctx(serde_json::json!("abc"))).unwrap_err();
        match err {
            TransformError::TypeConversion {
                param, expected, ..
            } => {
                assert_eq!(param, "a");
                assert_eq!(expected, "int");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn widens_int_to_float_but_not_float_to_int() {
        let schema = ParamSchema::new().with("a", ParamKind::Float);
        let out = convert_params(&schema, ctx(serde_json::json!(3))).unwrap();
        assert_eq!(out["a"], serde_json::json!(3));

        let schema = ParamSchema::new().with("a", ParamKind::Int);
        assert!(convert_params(&schema, ctx(serde_json::json!(3.5))).is_err());
    }

    #[test]
    fn no_string_bool_coercion() {
        let schema = ParamSchema::new().with("a", ParamKind::Bool);
        assert!(convert_params(&schema, ctx(serde_json::json!("true"))).is_err());
        assert!(convert_params(&schema, ctx(serde_json::json!(true))).is_ok());

        let schema = ParamSchema::new().with("a", ParamKind::String);
        assert!(convert_params(&schema, ctx(serde_json::json!(true))).is_err());
    }

    #[test]
    fn composite_kinds_accept_only_their_shape() {
        let schema = ParamSchema::new().with("a", ParamKind::List);
        assert!(convert_params(&schema, ctx(serde_json::json!([1, 2]))).is_ok());
        assert!(convert_params(&schema, ctx(serde_json::json!({"k": 1}))).is_err());

        let schema = ParamSchema::new().with("a", ParamKind::Map);
        assert!(convert_params(&schema, ctx(serde_json::json!({"k": 1}))).is_ok());
        assert!(convert_params(&schema, ctx(serde_json::json!([1]))).is_err());
    }

    #[test]
    fn undeclared_params_pass_through() {
        let schema = ParamSchema::new().with("a", ParamKind::Int);
        let mut context = ctx(serde_json::json!("5"));
        context.insert("extra".into(), serde_json::json!("anything"));
        let out = convert_params(&schema, context).unwrap();
        assert_eq!(out["extra"], serde_json::json!("anything"));
    }
}
