//! Supervised multi-process worker pool: one pool per task class, each with
//! its own concurrency limit and admission backlog. Slots pull from the
//! class backlog, so an idle worker picks work up immediately and a full
//! backlog pushes backpressure onto the dispatcher.

mod slot;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::cache::ResultCache;
use crate::config::PoolConfig;
use crate::engine::types::ReadyTask;
use crate::error::{EngineError, QueueError};
use crate::queue::WorkQueue;
use crate::types::{ExecutionResult, TaskClass};
use crate::worker::{LaunchStrategy, WorkerSession};

use slot::SlotContext;

/// Lifecycle of one pooled worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Busy,
    DeadPendingRestart,
}

pub(crate) struct SlotStatus {
    state: AtomicU8,
    restarts: AtomicU64,
}

impl SlotStatus {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(SlotState::DeadPendingRestart as u8),
            restarts: AtomicU64::new(0),
        })
    }

    pub(crate) fn set(&self, state: SlotState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> SlotState {
        match self.state.load(Ordering::Relaxed) {
            0 => SlotState::Idle,
            1 => SlotState::Busy,
            _ => SlotState::DeadPendingRestart,
        }
    }

    pub(crate) fn bump_restarts(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time snapshot of one class pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassStatus {
    pub limit: usize,
    pub backlog: usize,
    pub idle: usize,
    pub busy: usize,
    pub dead: usize,
    pub restarts: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub io: ClassStatus,
    pub cpu: ClassStatus,
}

struct ClassPool {
    class: TaskClass,
    limit: usize,
    backlog: Arc<WorkQueue<ReadyTask>>,
    slots: Vec<Arc<SlotStatus>>,
}

impl ClassPool {
    fn new(class: TaskClass, limit: usize, backlog_capacity: usize) -> Self {
        let limit = limit.max(1);
        Self {
            class,
            limit,
            backlog: Arc::new(WorkQueue::bounded(backlog_capacity)),
            slots: (0..limit).map(|_| SlotStatus::new()).collect(),
        }
    }

    fn status(&self) -> ClassStatus {
        let mut status = ClassStatus {
            limit: self.limit,
            backlog: self.backlog.len(),
            idle: 0,
            busy: 0,
            dead: 0,
            restarts: 0,
        };
        for slot in &self.slots {
            match slot.get() {
                SlotState::Idle => status.idle += 1,
                SlotState::Busy => status.busy += 1,
                SlotState::DeadPendingRestart => status.dead += 1,
            }
            status.restarts += slot.restarts.load(Ordering::Relaxed);
        }
        status
    }
}

/// Owns both class pools and supervises worker lifecycle, dispatch,
/// timeouts, and crash recovery.
pub struct WorkerPool {
    cfg: PoolConfig,
    io: ClassPool,
    cpu: ClassPool,
    out: Arc<WorkQueue<ExecutionResult>>,
    cache: Arc<ResultCache>,
    started: AtomicBool,
    stopped: AtomicBool,
    force_stop: Arc<Notify>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub(crate) fn new(
        cfg: &PoolConfig,
        out: Arc<WorkQueue<ExecutionResult>>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            io: ClassPool::new(TaskClass::Io, cfg.io_limit, cfg.backlog),
            cpu: ClassPool::new(TaskClass::Cpu, cfg.cpu_limit, cfg.backlog),
            cfg: cfg.clone(),
            out,
            cache,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            force_stop: Arc::new(Notify::new()),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns every worker process and waits for each ready handshake. Any
    /// failure tears the spawned workers down again and reports a startup
    /// diagnostic; the pool is unusable until a fresh `start` succeeds.
    pub(crate) async fn start(&self) -> Result<(), EngineError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyStarted);
        }

        let strategy = select_strategy(&self.cfg);
        let ready_timeout = Duration::from_millis(self.cfg.ready_timeout_ms);
        tracing::info!(
            target: "flowexec.pool",
            io_limit = self.io.limit,
            cpu_limit = self.cpu.limit,
            strategy = ?strategy,
            "starting worker pools"
        );

        let total = self.io.limit + self.cpu.limit;
        let spawned = futures::future::join_all(
            (0..total).map(|_| WorkerSession::spawn(&strategy, ready_timeout)),
        )
        .await;

        let mut sessions = Vec::with_capacity(total);
        let mut first_err = None;
        for res in spawned {
            match res {
                Ok(session) => sessions.push(session),
                Err(e) => first_err = first_err.or(Some(e)),
            }
        }
        if let Some(e) = first_err {
            for mut session in sessions {
                session.kill().await;
            }
            self.started.store(false, Ordering::SeqCst);
            return Err(EngineError::Startup(format!("worker spawn failed: {e}")));
        }

        let mut handles = Vec::with_capacity(total);
        let mut sessions = sessions.into_iter();
        for pool in [&self.io, &self.cpu] {
            for (index, status) in pool.slots.iter().enumerate() {
                let session = sessions.next().expect("one session per slot");
                let ctx = SlotContext {
                    class: pool.class,
                    index,
                    backlog: pool.backlog.clone(),
                    out: self.out.clone(),
                    cache: self.cache.clone(),
                    strategy: strategy.clone(),
                    status: status.clone(),
                    poll_interval: Duration::from_millis(self.cfg.poll_interval_ms),
                    ready_timeout,
                    respawn_delay: Duration::from_millis(self.cfg.respawn_delay_ms),
                    force_stop: self.force_stop.clone(),
                };
                handles.push(slot::spawn_slot(ctx, session));
            }
        }
        *self.handles.lock().unwrap() = handles;
        Ok(())
    }

    /// Routes by task class; blocks while the class backlog is full, which
    /// is how backpressure reaches the dispatcher.
    pub(crate) async fn submit(&self, task: ReadyTask) -> Result<(), QueueError> {
        let pool = match task.item.class {
            TaskClass::Io => &self.io,
            TaskClass::Cpu => &self.cpu,
        };
        pool.backlog.enqueue(task).await
    }

    /// Stops admissions, waits up to `grace` for busy slots, then forcibly
    /// terminates stragglers and joins every supervisor. Idempotent.
    pub(crate) async fn shutdown(&self, grace: Duration) {
        if self.stopped.swap(true, Ordering::SeqCst) || !self.started.load(Ordering::SeqCst) {
            return;
        }
        tracing::info!(target: "flowexec.pool", grace_ms = grace.as_millis() as u64, "shutting down worker pools");

        self.io.backlog.close();
        self.cpu.backlog.close();

        let handles: Vec<_> = self.handles.lock().unwrap().drain(..).collect();
        let mut join_all = Box::pin(futures::future::join_all(handles));
        match tokio::time::timeout(grace, &mut join_all).await {
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(target: "flowexec.pool", "grace period expired, terminating busy workers");
                self.force_stop.notify_waiters();
                let _ = join_all.await;
            }
        }
        tracing::info!(target: "flowexec.pool", "worker pools stopped");
    }

    pub(crate) fn status(&self) -> PoolStatus {
        PoolStatus {
            io: self.io.status(),
            cpu: self.cpu.status(),
        }
    }
}

/// The launch decision is made exactly once per `start`, not per spawn site.
fn select_strategy(cfg: &PoolConfig) -> LaunchStrategy {
    match &cfg.worker_command {
        Some(program) => LaunchStrategy::Command {
            program: program.into(),
            args: cfg.worker_args.clone(),
        },
        None => LaunchStrategy::CurrentExe,
    }
}
