#[allow(clippy::module_inception)]
pub mod error;
pub mod queue;
pub mod transform;

pub use error::{EngineError, WorkerError};
pub use queue::QueueError;
pub use transform::TransformError;
