use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// EnvFilter string, e.g. "info" or "flowexec_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            level: default_logging_level(),
        }
    }
}

/// What `submit` does when the input queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmitPolicy {
    /// Return false immediately.
    #[default]
    Reject,

    /// Wait up to `enqueue_wait_ms` for capacity, then return false.
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_input_capacity")]
    pub input_capacity: usize,

    #[serde(default)]
    pub submit_policy: SubmitPolicy,

    /// Wait budget for blocking submits and batch admission.
    #[serde(default = "default_enqueue_wait_ms")]
    pub enqueue_wait_ms: u64,
}

fn default_input_capacity() -> usize {
    256
}

fn default_enqueue_wait_ms() -> u64 {
    1000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            input_capacity: default_input_capacity(),
            submit_policy: SubmitPolicy::default(),
            enqueue_wait_ms: default_enqueue_wait_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Dequeue timeout of the dispatcher loop; bounds shutdown latency.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_tick_ms() -> u64 {
    100
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Worker processes serving io-class tasks.
    #[serde(default = "default_io_limit")]
    pub io_limit: usize,

    /// Worker processes serving cpu-class tasks. Defaults to the host's
    /// logical core count.
    #[serde(default = "default_cpu_limit")]
    pub cpu_limit: usize,

    /// Per-class admission backlog; a full backlog blocks the dispatcher.
    #[serde(default = "default_backlog")]
    pub backlog: usize,

    /// Execution budget per task unless the task overrides it.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// How long a spawned worker may take to send its ready line.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// Delay between respawn attempts for a dead slot.
    #[serde(default = "default_respawn_delay_ms")]
    pub respawn_delay_ms: u64,

    /// Backlog poll interval of idle slots; bounds shutdown latency.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Worker harness command. Unset means re-exec the current executable
    /// in worker mode.
    #[serde(default)]
    pub worker_command: Option<String>,

    #[serde(default)]
    pub worker_args: Vec<String>,
}

fn default_io_limit() -> usize {
    4
}

fn default_cpu_limit() -> usize {
    num_cpus::get().max(1)
}

fn default_backlog() -> usize {
    64
}

fn default_task_timeout_secs() -> u64 {
    60
}

fn default_ready_timeout_ms() -> u64 {
    5000
}

fn default_respawn_delay_ms() -> u64 {
    200
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            io_limit: default_io_limit(),
            cpu_limit: default_cpu_limit(),
            backlog: default_backlog(),
            task_timeout_secs: default_task_timeout_secs(),
            ready_timeout_ms: default_ready_timeout_ms(),
            respawn_delay_ms: default_respawn_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            worker_command: None,
            worker_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Idle TTL for per-run result entries; the safety net for runs that
    /// never signal completion.
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

fn default_idle_ttl_secs() -> u64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// How long shutdown waits for busy workers before killing them.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,

    /// Install a SIGINT/SIGTERM handler at start that triggers shutdown.
    #[serde(default)]
    pub signal_shutdown: bool,
}

fn default_grace_ms() -> u64 {
    2000
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_ms: default_grace_ms(),
            signal_shutdown: false,
        }
    }
}
