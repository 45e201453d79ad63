//! Worker process plumbing: JSON-lines wire protocol, the parent-side
//! session handle, and the worker-side serve loop.

pub mod harness;
pub mod protocol;
pub mod session;

pub use harness::{is_worker_process, run_if_worker, run_worker, WORKER_ENV_VAR};
pub use protocol::{ParentMessage, WorkerMessage, PROTOCOL_VERSION};
pub use session::{LaunchStrategy, WorkerSession};
