//! Stable re-exports for consumers (`plugins`, worker binaries, and
//! external crates).
//!
//! Prefer importing from `flowexec_core::api` instead of reaching into
//! internal modules.

pub use crate::cache::ResultCache;
pub use crate::config::{
    load_default, load_from, CacheConfig, DispatchConfig, EngineConfig, LoggingConfig, PoolConfig,
    QueueConfig, ShutdownConfig, SubmitPolicy,
};
pub use crate::engine::pre::{convert_params, resolve_context};
pub use crate::engine::{Engine, EngineState};
pub use crate::error::{EngineError, QueueError, TransformError, WorkerError};
pub use crate::logging;
pub use crate::pool::{ClassStatus, PoolStatus, SlotState};
pub use crate::queue::WorkQueue;
pub use crate::registry::{ScriptRegistry, ScriptUnit};
pub use crate::types::{
    ExecutionResult, FailureKind, ParamKind, ParamSchema, Reference, TaskClass, TaskStatus,
    WorkItem,
};
pub use crate::util::generate_execution_id;
pub use crate::worker::{
    is_worker_process, run_if_worker, run_worker, LaunchStrategy, WORKER_ENV_VAR,
};
