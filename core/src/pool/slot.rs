//! One supervisor task per worker slot. The supervisor owns its child
//! process for the slot's whole life: it pulls from the class backlog,
//! drives the request/reply exchange under the task's budget, and replaces
//! the child after a timeout or crash so a stuck task never takes the slot
//! with it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::cache::ResultCache;
use crate::engine::post::{post_dispatch, ExecOutcome};
use crate::engine::types::ReadyTask;
use crate::error::WorkerError;
use crate::queue::WorkQueue;
use crate::types::{ExecutionResult, TaskClass, TaskStatus};
use crate::worker::{LaunchStrategy, ParentMessage, WorkerMessage, WorkerSession};

use super::{SlotState, SlotStatus};

const SESSION_EXIT_GRACE: Duration = Duration::from_millis(500);

pub(crate) struct SlotContext {
    pub class: TaskClass,
    pub index: usize,
    pub backlog: Arc<WorkQueue<ReadyTask>>,
    pub out: Arc<WorkQueue<ExecutionResult>>,
    pub cache: Arc<ResultCache>,
    pub strategy: LaunchStrategy,
    pub status: Arc<SlotStatus>,
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
    pub respawn_delay: Duration,
    pub force_stop: Arc<Notify>,
}

pub(crate) fn spawn_slot(ctx: SlotContext, session: WorkerSession) -> JoinHandle<()> {
    tokio::spawn(run_slot(ctx, session))
}

async fn run_slot(ctx: SlotContext, session: WorkerSession) {
    let mut session = Some(session);
    ctx.status.set(SlotState::Idle);

    loop {
        if session.is_none() {
            if ctx.backlog.is_closed() && ctx.backlog.is_empty() {
                break;
            }
            match WorkerSession::spawn(&ctx.strategy, ctx.ready_timeout).await {
                Ok(replacement) => {
                    tracing::info!(
                        target: "flowexec.pool",
                        class = %ctx.class,
                        slot = ctx.index,
                        pid = replacement.pid(),
                        "slot worker replaced"
                    );
                    ctx.status.set(SlotState::Idle);
                    ctx.status.bump_restarts();
                    session = Some(replacement);
                }
                Err(e) => {
                    tracing::warn!(
                        target: "flowexec.pool",
                        class = %ctx.class,
                        slot = ctx.index,
                        error = %e,
                        "worker respawn failed, retrying"
                    );
                    tokio::time::sleep(ctx.respawn_delay).await;
                    continue;
                }
            }
        }

        let Some(task) = ctx.backlog.dequeue_timeout(ctx.poll_interval).await else {
            if ctx.backlog.is_closed() {
                break;
            }
            continue;
        };

        ctx.status.set(SlotState::Busy);
        let started = Instant::now();
        let outcome = execute(session.as_mut().expect("live session"), &task, &ctx.force_stop).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let aborted = matches!(outcome, ExecOutcome::Aborted);
        let (result, keep_worker) = post_dispatch(&task, outcome, duration_ms, &ctx.cache);

        if result.status == TaskStatus::Error {
            tracing::warn!(
                target: "flowexec.pool",
                class = %ctx.class,
                slot = ctx.index,
                execution_id = %result.execution_id,
                failure = ?result.failure,
                error = result.error.as_deref().unwrap_or(""),
                "task failed"
            );
        } else {
            tracing::debug!(
                target: "flowexec.pool",
                class = %ctx.class,
                slot = ctx.index,
                execution_id = %result.execution_id,
                duration_ms = duration_ms,
                "task completed"
            );
        }

        if keep_worker {
            ctx.status.set(SlotState::Idle);
        } else {
            ctx.status.set(SlotState::DeadPendingRestart);
            let mut dead = session.take().expect("live session");
            dead.kill().await;
        }

        if ctx.out.enqueue(result).await.is_err() {
            tracing::debug!(target: "flowexec.pool", "output queue closed, result dropped");
        }

        if aborted {
            break;
        }
    }

    if let Some(live) = session.take() {
        live.shutdown(SESSION_EXIT_GRACE).await;
    }
    ctx.status.set(SlotState::DeadPendingRestart);
}

async fn execute(
    session: &mut WorkerSession,
    task: &ReadyTask,
    force_stop: &Notify,
) -> ExecOutcome {
    let request = ParentMessage::exec(
        task.item.execution_id.clone(),
        task.item.script_id.clone(),
        task.params.clone(),
    );
    if let Err(e) = session.send(&request).await {
        return ExecOutcome::Crash(e);
    }

    tokio::select! {
        reply = tokio::time::timeout(task.timeout, session.recv()) => match reply {
            Err(_) => ExecOutcome::Timeout,
            Ok(Err(e)) => ExecOutcome::Crash(e),
            Ok(Ok(WorkerMessage::Result { execution_id, ok, value, error, .. })) => {
                if execution_id != task.item.execution_id {
                    ExecOutcome::Crash(WorkerError::Protocol(format!(
                        "reply for unexpected execution '{execution_id}'"
                    )))
                } else {
                    ExecOutcome::Reply { ok, value, error }
                }
            }
            Ok(Ok(other)) => ExecOutcome::Crash(WorkerError::Protocol(format!(
                "unexpected message: {other:?}"
            ))),
        },
        _ = force_stop.notified() => ExecOutcome::Aborted,
    }
}
