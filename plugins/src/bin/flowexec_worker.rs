//! Packaged worker harness: serves the flowexec worker protocol over
//! stdin/stdout with the sample registry. Point `pool.worker_command` at
//! this binary, or let an embedding application re-exec itself instead.

use std::sync::Arc;

use flowexec_core::api::{load_default, logging, run_worker};
use flowexec_plugins::sample_registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = load_default().unwrap_or_default();
    if let Err(e) = logging::init(&cfg.logging) {
        eprintln!("logging init failed: {e}");
    }

    let registry = Arc::new(sample_registry());
    run_worker(registry).await?;
    Ok(())
}
