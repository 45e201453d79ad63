pub mod reference;
pub mod result;
pub mod schema;
pub mod task;

pub use reference::Reference;
pub use result::{ExecutionResult, FailureKind, TaskStatus};
pub use schema::{ParamKind, ParamSchema};
pub use task::{TaskClass, WorkItem};
