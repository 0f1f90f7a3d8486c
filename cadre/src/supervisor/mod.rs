//! # Supervisor Module
//!
//! A [`Supervisor`] owns one control thread that periodically inspects the
//! pools it watches and resizes them.
//!
//! ## Tick
//! 1. Resolve every watched target; drop the ones that are gone or closing
//! 2. Apply [`plan`] to each: burst up to `max` on backlog, decay one worker
//!    per tick towards `min` when idle
//! 3. Wait for the tick interval, or until resumed when suspended
//! 4. Hand a [`TickReport`] to the tick callback, if any
//!
//! Targets are held as `Weak<dyn Scalable>`, so a pool may be dropped while
//! still supervised.

mod policy;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, trace};

use cadre_api::{run_guarded, Scalable};

use crate::base::{Join, ManagedThread};
use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::log_scaling;
use crate::pool::WorkerPool;

pub use self::policy::{plan, Adjustment};

/// Observer invoked once per tick, on the control thread.
pub type TickCallback = Arc<dyn Fn(&TickReport) + Send + Sync>;

/// What one tick did to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolAdjustment {
    pub label: String,
    /// Registered workers before the adjustment
    pub workers: usize,
    /// Queued entries at inspection time
    pub tasks: usize,
    /// The adjustment actually applied
    pub adjustment: Adjustment,
}

/// Summary passed to the tick callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// 1-based tick counter
    pub tick: u64,
    pub adjustments: Vec<PoolAdjustment>,
}

impl TickReport {
    /// Whether any target changed size this tick.
    pub fn changed(&self) -> bool {
        self.adjustments.iter().any(|a| !a.adjustment.is_hold())
    }
}

enum Signal {
    Wake,
    Stop,
}

struct ControlState {
    targets: Vec<Weak<dyn Scalable>>,
    suspended: bool,
    callback: Option<TickCallback>,
}

struct Shared {
    config: SupervisorConfig,
    state: Mutex<ControlState>,
    ticks: AtomicU64,
}

impl Shared {
    /// Resolves the live targets, pruning dead and closing ones.
    fn live_targets(&self) -> Vec<Arc<dyn Scalable>> {
        let mut state = self.state.lock();
        let mut live = Vec::with_capacity(state.targets.len());
        state.targets.retain(|weak| match weak.upgrade() {
            Some(target) if !target.is_closed() => {
                live.push(target);
                true
            }
            _ => false,
        });
        live
    }

    fn adjust(&self, target: &dyn Scalable) -> PoolAdjustment {
        let workers = target.workers_num();
        let tasks = target.tasks_num();
        let effective = workers.saturating_sub(target.pending_declines());
        let (min, max) = (self.config.min_workers, self.config.max_workers);

        let adjustment = match plan(effective, tasks, min, max) {
            Adjustment::Grow(count) => {
                let added = target.scale_up(count);
                log_scaling!(target.label(), "grow", from = workers, added, tasks);
                if added > 0 { Adjustment::Grow(added) } else { Adjustment::Hold }
            }
            Adjustment::Shrink => {
                if target.scale_down() {
                    log_scaling!(target.label(), "shrink", from = workers);
                    Adjustment::Shrink
                } else {
                    Adjustment::Hold
                }
            }
            Adjustment::Hold => Adjustment::Hold,
        };

        PoolAdjustment {
            label: target.label().to_string(),
            workers,
            tasks,
            adjustment,
        }
    }

    fn tick(&self) -> TickReport {
        let adjustments = self
            .live_targets()
            .iter()
            .map(|target| self.adjust(target.as_ref()))
            .collect();
        TickReport {
            tick: self.ticks.fetch_add(1, Ordering::Relaxed) + 1,
            adjustments,
        }
    }

    /// Blocks for one interval, or until resumed if suspended.
    /// Returns `false` once the supervisor is stopping.
    fn wait(&self, signals: &Receiver<Signal>) -> bool {
        let suspended = self.state.lock().suspended;
        let signal = if suspended {
            signals.recv().ok()
        } else {
            match signals.recv_timeout(self.config.tick_interval) {
                Ok(signal) => Some(signal),
                Err(RecvTimeoutError::Timeout) => Some(Signal::Wake),
                Err(RecvTimeoutError::Disconnected) => None,
            }
        };
        matches!(signal, Some(Signal::Wake))
    }

    fn control_loop(&self, signals: Receiver<Signal>) {
        debug!(
            min = self.config.min_workers,
            max = self.config.max_workers,
            interval = ?self.config.tick_interval,
            "Supervisor started"
        );
        loop {
            let report = self.tick();
            trace!(tick = report.tick, targets = report.adjustments.len(), "Supervisor tick");
            if !self.wait(&signals) {
                break;
            }
            let callback = self.state.lock().callback.clone();
            if let Some(callback) = callback {
                if let Err(e) = run_guarded(|| callback(&report)) {
                    error!(error = %e, tick = report.tick, "Tick callback failed");
                }
            }
        }
        debug!(ticks = self.ticks.load(Ordering::Relaxed), "Supervisor stopped");
    }
}

/// Autoscaler for one or more pools.
///
/// Dropping the supervisor stops and joins its control thread; the pools it
/// watched are left as they are.
///
/// # Examples
/// ```rust
/// use std::time::Duration;
/// use cadre::{Supervisor, SupervisorConfig, WorkerPool};
///
/// let pool = WorkerPool::new(1).unwrap();
/// let supervisor = Supervisor::new(SupervisorConfig::new(1, 4, Duration::from_millis(50))).unwrap();
/// supervisor.supervise(&pool);
/// assert_eq!(supervisor.supervised_num(), 1);
/// ```
pub struct Supervisor {
    shared: Arc<Shared>,
    signals: Sender<Signal>,
    _control: ManagedThread<Join>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Result<Self, SupervisorError> {
        if !config.is_valid() {
            return Err(SupervisorError::InvalidBounds {
                min: config.min_workers,
                max: config.max_workers,
            });
        }

        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(ControlState {
                targets: Vec::new(),
                suspended: false,
                callback: None,
            }),
            ticks: AtomicU64::new(0),
        });
        let (signals, receiver) = flume::unbounded();

        let loop_shared = shared.clone();
        let control = ManagedThread::<Join>::spawn("cadre-supervisor".to_string(), move || {
            loop_shared.control_loop(receiver)
        })
        .map_err(|e| SupervisorError::SpawnFailed(e.to_string()))?;

        Ok(Self {
            shared,
            signals,
            _control: control,
        })
    }

    pub fn with_bounds(
        min_workers: usize,
        max_workers: usize,
        tick_interval: Duration,
    ) -> Result<Self, SupervisorError> {
        Self::new(SupervisorConfig::new(min_workers, max_workers, tick_interval))
    }

    /// Starts watching `pool`. No ownership is taken.
    pub fn supervise(&self, pool: &WorkerPool) {
        self.watch(pool.downgrade());
    }

    /// Starts watching any scalable target.
    pub fn watch(&self, target: Weak<dyn Scalable>) {
        self.shared.state.lock().targets.push(target);
    }

    /// Parks the control loop after its current tick until [`resume`](Self::resume).
    pub fn suspend(&self) {
        self.shared.state.lock().suspended = true;
        debug!("Supervisor suspended");
    }

    /// Restores the tick interval and wakes the control loop immediately.
    pub fn resume(&self) {
        self.shared.state.lock().suspended = false;
        let _ = self.signals.send(Signal::Wake);
        debug!("Supervisor resumed");
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.state.lock().suspended
    }

    /// Installs the per-tick observer, replacing any previous one.
    pub fn set_tick_callback<F>(&self, callback: F)
    where
        F: Fn(&TickReport) + Send + Sync + 'static,
    {
        self.shared.state.lock().callback = Some(Arc::new(callback));
    }

    pub fn clear_tick_callback(&self) {
        self.shared.state.lock().callback = None;
    }

    /// Targets still alive, as of the last tick.
    pub fn supervised_num(&self) -> usize {
        self.shared.state.lock().targets.len()
    }

    /// Ticks performed so far.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.shared.config
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // The control thread is joined when `_control` drops, after this.
        let _ = self.signals.send(Signal::Stop);
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Supervisor")
            .field("config", &self.shared.config)
            .field("targets", &state.targets.len())
            .field("suspended", &state.suspended)
            .field("ticks", &self.ticks())
            .finish()
    }
}
