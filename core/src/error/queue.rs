use thiserror::Error;

/// Admission failures on a `WorkQueue`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is at capacity")]
    Full,

    #[error("queue is closed")]
    Closed,
}
