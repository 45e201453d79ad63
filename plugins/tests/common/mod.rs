use std::sync::Arc;
use std::time::Duration;

use flowexec_core::api::{Engine, EngineConfig, ExecutionResult};
use flowexec_plugins::sample_registry;

/// Path of the harness binary built alongside these tests.
pub fn worker_command() -> String {
    env!("CARGO_BIN_EXE_flowexec-worker").to_string()
}

/// Small, fast-ticking config pointed at the packaged worker harness.
pub fn test_config(io_limit: usize, cpu_limit: usize) -> EngineConfig {
    let mut cfg = EngineConfig::default();
    cfg.logging.enabled = false;
    cfg.pool.io_limit = io_limit;
    cfg.pool.cpu_limit = cpu_limit;
    cfg.pool.worker_command = Some(worker_command());
    cfg.pool.ready_timeout_ms = 10_000;
    cfg.pool.poll_interval_ms = 10;
    cfg.pool.respawn_delay_ms = 50;
    cfg.dispatch.tick_ms = 10;
    cfg.shutdown.grace_ms = 1500;
    cfg
}

pub async fn started_engine(cfg: EngineConfig) -> Arc<Engine> {
    let engine = Arc::new(Engine::new(cfg, sample_registry()));
    engine.start().await.expect("engine start failed");
    engine
}

/// Polls until `n` results arrived or the overall deadline passed.
pub async fn collect_results(engine: &Engine, n: usize, overall: Duration) -> Vec<ExecutionResult> {
    let deadline = tokio::time::Instant::now() + overall;
    let mut results = Vec::new();
    while results.len() < n && tokio::time::Instant::now() < deadline {
        if let Some(result) = engine.poll_result(Duration::from_millis(200)).await {
            results.push(result);
        }
    }
    results
}

pub fn find<'a>(results: &'a [ExecutionResult], execution_id: &str) -> &'a ExecutionResult {
    results
        .iter()
        .find(|r| r.execution_id == execution_id)
        .unwrap_or_else(|| panic!("no result for {execution_id}"))
}

/// Builds a context map from a json object literal.
pub fn ctx(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().expect("context must be an object").clone()
}
