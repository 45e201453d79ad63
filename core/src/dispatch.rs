//! Dispatcher: the single control loop between the input queue and the
//! worker pool, and the only writer into the pool's admission path. Tasks
//! that fail the pre-dispatch transform become error results directly on
//! the output queue and never reach a worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cache::ResultCache;
use crate::engine::pre::pre_dispatch;
use crate::engine::types::ReadyTask;
use crate::pool::WorkerPool;
use crate::queue::WorkQueue;
use crate::registry::ScriptRegistry;
use crate::types::{ExecutionResult, FailureKind, WorkItem};

pub(crate) struct Dispatcher {
    shared: Arc<DispatchShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct DispatchShared {
    input: Arc<WorkQueue<WorkItem>>,
    out: Arc<WorkQueue<ExecutionResult>>,
    pool: Arc<WorkerPool>,
    registry: Arc<ScriptRegistry>,
    cache: Arc<ResultCache>,
    tick: Duration,
    default_timeout: Duration,
    stop: AtomicBool,
}

impl Dispatcher {
    pub(crate) fn new(
        input: Arc<WorkQueue<WorkItem>>,
        out: Arc<WorkQueue<ExecutionResult>>,
        pool: Arc<WorkerPool>,
        registry: Arc<ScriptRegistry>,
        cache: Arc<ResultCache>,
        tick: Duration,
        default_timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(DispatchShared {
                input,
                out,
                pool,
                registry,
                cache,
                tick,
                default_timeout,
                stop: AtomicBool::new(false),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Idempotent: a running loop is left alone.
    pub(crate) fn start(&self) {
        let mut handle = self.handle.lock().unwrap();
        if handle.is_some() {
            return;
        }
        self.shared.stop.store(false, Ordering::SeqCst);
        *handle = Some(tokio::spawn(run_loop(self.shared.clone())));
    }

    /// Idempotent. The loop finishes its in-flight item before exiting.
    pub(crate) async fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run_loop(ctx: Arc<DispatchShared>) {
    tracing::debug!(target: "flowexec.dispatch", "dispatcher started");
    loop {
        if ctx.stop.load(Ordering::SeqCst) {
            break;
        }
        let Some(item) = ctx.input.dequeue_timeout(ctx.tick).await else {
            if ctx.input.is_closed() {
                break;
            }
            continue;
        };
        dispatch_one(&ctx, item).await;
    }
    tracing::debug!(target: "flowexec.dispatch", "dispatcher stopped");
}

async fn dispatch_one(ctx: &DispatchShared, item: WorkItem) {
    match pre_dispatch(&item, &ctx.registry, &ctx.cache) {
        Ok(params) => {
            let timeout = item
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(ctx.default_timeout);
            let execution_id = item.execution_id.clone();
            let node_id = item.node_id.clone();
            let ready = ReadyTask {
                item,
                params,
                timeout,
            };
            // Blocks while the class backlog is full: backpressure flows
            // upstream instead of dropping work.
            if ctx.pool.submit(ready).await.is_err() {
                // Backlog closed mid-shutdown; the accepted task still gets
                // its terminal result.
                let result = ExecutionResult::failure(
                    &execution_id,
                    &node_id,
                    FailureKind::WorkerCrash,
                    "worker pool rejected task during shutdown",
                    0,
                );
                let _ = ctx.out.enqueue(result).await;
            }
        }
        Err(e) => {
            tracing::debug!(
                target: "flowexec.dispatch",
                execution_id = %item.execution_id,
                error = %e,
                "pre-dispatch failed"
            );
            let result = ExecutionResult::failure(
                &item.execution_id,
                &item.node_id,
                e.failure_kind(),
                e.to_string(),
                0,
            );
            let _ = ctx.out.enqueue(result).await;
        }
    }
}
