use thiserror::Error;

/// Engine lifecycle errors. These are reported as return values from
/// `start()`/`shutdown()`, never as panics.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine startup failed: {0}")]
    Startup(String),

    #[error("engine is not started")]
    NotStarted,

    #[error("engine is already started")]
    AlreadyStarted,

    #[error("engine is stopped")]
    Stopped,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parent-side faults on a worker session. `Crash`-shaped variants feed the
/// WorkerCrash normalization path in the pool; `Spawn`/`Ready` feed startup
/// diagnostics.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("spawn failed: {0}")]
    Spawn(String),

    #[error("worker did not become ready: {0}")]
    Ready(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("worker stream closed")]
    StreamClosed,

    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        source: std::io::Error,
    },
}
