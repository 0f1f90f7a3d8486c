use std::time::Duration;

pub const DEFAULT_POOL_LABEL: &str = "cadre";
pub const DEFAULT_IDLE_SPINS: u32 = 64;
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_millis(1);
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MIN_WORKERS: usize = 1;

// --- Pool Configuration ---

/// Configuration for a [`WorkerPool`](crate::pool::WorkerPool).
#[derive(Clone, Debug)]
pub struct WorkerPoolConfig {
    /// Name used for worker threads and log spans.
    pub label: String,

    /// Workers started by the constructor.
    pub initial_workers: usize,

    /// Consecutive empty polls answered with a processor yield before a worker
    /// starts sleeping between polls.
    pub idle_spins: u32,

    /// Sleep between empty polls once the spin budget is used up.
    pub idle_sleep: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_POOL_LABEL.to_string(),
            initial_workers: 1,
            idle_spins: DEFAULT_IDLE_SPINS,
            idle_sleep: DEFAULT_IDLE_SLEEP,
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_workers(initial_workers: usize) -> Self {
        Self {
            initial_workers,
            ..Default::default()
        }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

// --- Supervisor Configuration ---

/// Configuration for a [`Supervisor`](crate::supervisor::Supervisor).
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Floor the supervisor shrinks idle pools towards.
    pub min_workers: usize,

    /// Ceiling the supervisor grows backlogged pools to.
    pub max_workers: usize,

    /// Time between ticks while not suspended.
    pub tick_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            min_workers: DEFAULT_MIN_WORKERS,
            max_workers: num_cpus::get().max(DEFAULT_MIN_WORKERS),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl SupervisorConfig {
    pub fn new(min_workers: usize, max_workers: usize, tick_interval: Duration) -> Self {
        Self {
            min_workers,
            max_workers,
            tick_interval,
        }
    }

    /// Whether the bounds are usable: `min <= max` and `max > 0`.
    pub fn is_valid(&self) -> bool {
        self.max_workers > 0 && self.min_workers <= self.max_workers
    }
}
