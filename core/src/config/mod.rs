pub mod load;
pub mod types;

pub use load::{load_default, load_from};
pub use types::{
    CacheConfig, DispatchConfig, EngineConfig, LoggingConfig, PoolConfig, QueueConfig,
    ShutdownConfig, SubmitPolicy,
};
