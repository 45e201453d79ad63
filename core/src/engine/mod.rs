//! Engine facade: composes the queues, dispatcher, and worker pool, owns
//! the lifecycle state machine, and is the only surface callers touch. An
//! `Engine` is an explicit value constructed and owned by the caller; there
//! is no process-wide singleton.

pub(crate) mod post;
pub mod pre;
pub mod types;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResultCache;
use crate::config::{EngineConfig, SubmitPolicy};
use crate::dispatch::Dispatcher;
use crate::error::EngineError;
use crate::pool::{PoolStatus, WorkerPool};
use crate::queue::WorkQueue;
use crate::registry::ScriptRegistry;
use crate::types::{ExecutionResult, WorkItem};

pub use types::EngineState;

pub struct Engine {
    cfg: EngineConfig,
    input: Arc<WorkQueue<WorkItem>>,
    output: Arc<WorkQueue<ExecutionResult>>,
    cache: Arc<ResultCache>,
    pool: Arc<WorkerPool>,
    dispatcher: Dispatcher,
    state: AtomicU8,
    // Serializes start/shutdown without ever making submit wait behind an
    // in-flight lifecycle transition.
    lifecycle: tokio::sync::Mutex<()>,
}

impl Engine {
    /// Builds a stopped engine around a registry populated at startup.
    /// Nothing runs until [`start`](Self::start).
    pub fn new(cfg: EngineConfig, registry: ScriptRegistry) -> Self {
        let registry = Arc::new(registry);
        let input = Arc::new(WorkQueue::bounded(cfg.queue.input_capacity));
        let output = Arc::new(WorkQueue::unbounded());
        let cache = Arc::new(ResultCache::new(Duration::from_secs(cfg.cache.idle_ttl_secs)));
        let pool = Arc::new(WorkerPool::new(&cfg.pool, output.clone(), cache.clone()));
        let dispatcher = Dispatcher::new(
            input.clone(),
            output.clone(),
            pool.clone(),
            registry,
            cache.clone(),
            Duration::from_millis(cfg.dispatch.tick_ms),
            Duration::from_secs(cfg.pool.task_timeout_secs),
        );
        Self {
            cfg,
            input,
            output,
            cache,
            pool,
            dispatcher,
            state: AtomicU8::new(EngineState::NotStarted.as_u8()),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// NotStarted -> Started. A pool start failure is returned as a
    /// diagnostic and leaves the engine NotStarted; callers must check
    /// before treating the engine as usable.
    pub async fn start(self: &Arc<Self>) -> Result<(), EngineError> {
        let _lifecycle = self.lifecycle.lock().await;
        match self.state() {
            EngineState::NotStarted => {}
            EngineState::Started => return Err(EngineError::AlreadyStarted),
            EngineState::Stopped => return Err(EngineError::Stopped),
        }

        self.pool.start().await?;
        self.dispatcher.start();
        self.state
            .store(EngineState::Started.as_u8(), Ordering::SeqCst);

        if self.cfg.shutdown.signal_shutdown {
            self.install_signal_shutdown();
        }

        tracing::info!(
            target: "flowexec.engine",
            io_limit = self.cfg.pool.io_limit,
            cpu_limit = self.cfg.pool.cpu_limit,
            input_capacity = self.cfg.queue.input_capacity,
            "engine started"
        );
        Ok(())
    }

    /// Accepts a task for execution. `false` when the engine is not started
    /// or the input queue refuses admission under the configured policy.
    pub async fn submit(&self, item: WorkItem) -> bool {
        if self.state() != EngineState::Started {
            tracing::debug!(target: "flowexec.engine", "submit refused: engine not started");
            return false;
        }
        let res = match self.cfg.queue.submit_policy {
            SubmitPolicy::Reject => self.input.try_enqueue(item),
            SubmitPolicy::Block => {
                self.input
                    .enqueue_timeout(item, Duration::from_millis(self.cfg.queue.enqueue_wait_ms))
                    .await
            }
        };
        match res {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(target: "flowexec.engine", error = %e, "submit rejected");
                false
            }
        }
    }

    /// All-or-nothing batch admission: either every task is accepted in one
    /// attempt or none are.
    pub async fn submit_batch(&self, items: Vec<WorkItem>) -> bool {
        if self.state() != EngineState::Started {
            return false;
        }
        let wait = match self.cfg.queue.submit_policy {
            SubmitPolicy::Reject => Duration::ZERO,
            SubmitPolicy::Block => Duration::from_millis(self.cfg.queue.enqueue_wait_ms),
        };
        match self.input.enqueue_batch(items, wait).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(target: "flowexec.engine", error = %e, "batch submit rejected");
                false
            }
        }
    }

    /// Next completed result, blocking up to `timeout`.
    pub async fn poll_result(&self, timeout: Duration) -> Option<ExecutionResult> {
        if self.state() != EngineState::Started {
            return None;
        }
        self.output.dequeue_timeout(timeout).await
    }

    /// Collects up to `max_items`, returning as soon as a dequeue attempt
    /// times out; never blocks longer than `max_items * per_item_timeout`.
    pub async fn drain_results(
        &self,
        max_items: usize,
        per_item_timeout: Duration,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::new();
        while results.len() < max_items {
            match self.poll_result(per_item_timeout).await {
                Some(result) => results.push(result),
                None => break,
            }
        }
        results
    }

    /// Marks a run finished and evicts its cached results eagerly. The
    /// cache's idle TTL covers runs that never call this.
    pub fn finish_run(&self, run_id: &str) -> bool {
        self.cache.finish_run(run_id)
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Started -> Stopped, cascading: submissions are refused immediately,
    /// the dispatcher stops feeding the pool, the pool drains within its
    /// grace period, then the queues close. Safe to call from a signal
    /// handler task and a normal exit path concurrently; the second caller
    /// gets `false`.
    pub async fn shutdown(&self) -> bool {
        let _lifecycle = self.lifecycle.lock().await;
        if self.state() != EngineState::Started {
            return false;
        }
        self.state
            .store(EngineState::Stopped.as_u8(), Ordering::SeqCst);
        tracing::info!(target: "flowexec.engine", "shutdown initiated");

        self.input.close();
        self.dispatcher.stop().await;
        self.pool
            .shutdown(Duration::from_millis(self.cfg.shutdown.grace_ms))
            .await;
        self.output.close();

        tracing::info!(target: "flowexec.engine", "shutdown complete");
        true
    }

    fn install_signal_shutdown(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            wait_for_termination_signal().await;
            if let Some(engine) = weak.upgrade() {
                tracing::info!(target: "flowexec.engine", "termination signal received");
                engine.shutdown().await;
            }
        });
    }
}

async fn wait_for_termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn stopped_engine() -> Arc<Engine> {
        Arc::new(Engine::new(EngineConfig::default(), ScriptRegistry::new()))
    }

    #[tokio::test]
    async fn submit_refused_before_start() {
        let engine = stopped_engine();
        assert_eq!(engine.state(), EngineState::NotStarted);
        assert!(!engine.submit(WorkItem::new("r", "n", "s")).await);
        assert!(
            !engine
                .submit_batch(vec![WorkItem::new("r", "n", "s")])
                .await
        );
        assert!(engine
            .poll_result(Duration::from_millis(10))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn shutdown_before_start_is_a_no_op() {
        let engine = stopped_engine();
        assert!(!engine.shutdown().await);
        assert_eq!(engine.state(), EngineState::NotStarted);
    }

    #[tokio::test]
    async fn drain_results_returns_empty_when_not_started() {
        let engine = stopped_engine();
        let results = engine.drain_results(5, Duration::from_millis(5)).await;
        assert!(results.is_empty());
    }
}
