//! # Worker Pool Module
//!
//! A [`WorkerPool`] owns one task queue and a dynamic set of worker threads
//! draining it.
//!
//! ## Key Concepts
//! - Submission: Normal / Urgent / Sequence placement, never blocking
//! - Cooperative removal: a shared decline counter consumed by whichever
//!   worker reaches its check first
//! - Quiescence: [`WorkerPool::wait_tasks`] blocks until every registered
//!   worker has found the queue empty and parked
//!
//! ## Thread Safety
//! - One lock guards the worker registry, the decline counter and the
//!   quiescence phase together
//! - The queue has its own lock and is never touched while holding the pool lock
//! - Workers hold the pool core through an `Arc`; supervisors only through a `Weak`

mod rendezvous;
mod worker;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use cadre_api::{
    completion, run_guarded, run_steps, Completer, Priority, Scalable, Submission, Task,
    TaskHandle,
};

use crate::base::{ConcurrentQueue, Detach, ManagedThread};
use crate::config::WorkerPoolConfig;
use crate::error::PoolError;
use crate::log_worker;

use self::rendezvous::{Participants, Phase, Rendezvous};
pub use self::worker::{WorkerId, WorkerState};

/// Snapshot of a pool's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Registered workers, including ones with a pending decline
    pub workers: usize,
    /// Entries waiting in the queue
    pub tasks: usize,
    /// Removal requests not yet consumed by a worker
    pub pending_declines: usize,
    /// Entries run to completion (successfully or not) since creation
    pub executed: u64,
}

/// State guarded by the pool lock.
struct PoolState {
    workers: HashMap<WorkerId, ManagedThread<Detach>>,
    closing: bool,
    phase: Phase,
}

impl Participants for PoolState {
    fn participants(&self) -> usize {
        self.workers.len()
    }

    fn phase(&mut self) -> &mut Phase {
        &mut self.phase
    }
}

/// Shared core of a pool, referenced by the owner, its workers and supervisors.
pub(crate) struct PoolCore {
    /// Lets workers be started from a borrowed core.
    this: Weak<PoolCore>,
    pub(crate) config: WorkerPoolConfig,
    pub(crate) queue: ConcurrentQueue<Task>,
    state: Mutex<PoolState>,
    /// Only written while holding `state`; read without it as a fast path.
    declines: AtomicUsize,
    executed: AtomicU64,
    rendezvous: Rendezvous,
    drained: Condvar,
}

impl PoolCore {
    fn new(config: WorkerPoolConfig, this: Weak<PoolCore>) -> Self {
        Self {
            this,
            config,
            queue: ConcurrentQueue::new(),
            state: Mutex::new(PoolState {
                workers: HashMap::new(),
                closing: false,
                phase: Phase::default(),
            }),
            declines: AtomicUsize::new(0),
            executed: AtomicU64::new(0),
            rendezvous: Rendezvous::new(),
            drained: Condvar::new(),
        }
    }

    fn spawn_worker(&self) -> Result<WorkerId, PoolError> {
        let mut state = self.state.lock();
        if state.closing {
            return Err(PoolError::ShuttingDown);
        }
        let core = self.this.upgrade().ok_or(PoolError::ShuttingDown)?;

        let id = WorkerId::new();
        let name = format!("{}-worker-{}", self.config.label, id.short());
        // Spawned under the lock so the worker cannot look itself up before
        // it is registered.
        let thread = ManagedThread::<Detach>::spawn(name, move || worker::run(core, id))
            .map_err(|e| PoolError::SpawnFailed(e.to_string()))?;
        state.workers.insert(id, thread);
        Ok(id)
    }

    fn request_decline(&self) -> bool {
        let state = self.state.lock();
        if state.closing {
            return false;
        }
        let pending = self.declines.load(Ordering::Acquire);
        if pending >= state.workers.len() {
            warn!(
                pool = %self.config.label,
                workers = state.workers.len(),
                pending,
                "Invalid remove, every worker already has a pending decline"
            );
            return false;
        }
        self.declines.store(pending + 1, Ordering::Release);
        true
    }

    /// Consumes one pending decline on behalf of `id`, removing it from the
    /// registry in the same critical section. Returns the worker's own handle
    /// if it won.
    pub(crate) fn retire(&self, id: WorkerId) -> Option<ManagedThread<Detach>> {
        if self.declines.load(Ordering::Acquire) == 0 {
            return None;
        }

        let mut state = self.state.lock();
        if !state.workers.contains_key(&id) {
            return None;
        }
        self.declines
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| d.checked_sub(1))
            .ok()?;
        let handle = state.workers.remove(&id);
        log_worker!(self.config.label.as_str(), id, "declined", remaining = state.workers.len());
        drop(state);

        self.rendezvous.departed();
        self.drained.notify_all();
        handle
    }

    /// Samples the open quiescence phase; taken before each poll.
    pub(crate) fn quiescence_ticket(&self) -> Option<u64> {
        self.state.lock().phase.ticket()
    }

    /// Parks the calling worker if the phase in `ticket` is still open.
    ///
    /// An empty poll only proves the queue drained if it started after the
    /// phase opened, so a stale or missing ticket sends the worker back to
    /// polling.
    pub(crate) fn park_if_quiescing(&self, ticket: Option<u64>) -> bool {
        let Some(ticket) = ticket else {
            return false;
        };
        let mut state = self.state.lock();
        if state.phase.ticket() != Some(ticket) {
            return false;
        }
        self.rendezvous.arrive(&mut state);
        true
    }

    pub(crate) fn record_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    fn quiesce(&self) {
        let mut state = self.state.lock();
        self.rendezvous.quiesce(&mut state);
    }

    fn workers_num(&self) -> usize {
        self.state.lock().workers.len()
    }

    fn metrics(&self) -> PoolMetrics {
        let (workers, pending_declines) = {
            let state = self.state.lock();
            (state.workers.len(), self.declines.load(Ordering::Acquire))
        };
        PoolMetrics {
            workers,
            tasks: self.queue.len(),
            pending_declines,
            executed: self.executed.load(Ordering::Relaxed),
        }
    }

    /// Declines every worker, waits for the registry to drain and discards the backlog.
    fn shutdown(&self) {
        let mut state = self.state.lock();
        state.closing = true;
        self.declines.store(state.workers.len(), Ordering::Release);
        debug!(pool = %self.config.label, workers = state.workers.len(), "Shutting down worker pool");
        while !state.workers.is_empty() {
            self.drained.wait(&mut state);
        }
        drop(state);

        let abandoned = self.queue.drain();
        if !abandoned.is_empty() {
            debug!(pool = %self.config.label, count = abandoned.len(), "Discarding queued entries");
        }
    }
}

impl Scalable for PoolCore {
    fn workers_num(&self) -> usize {
        PoolCore::workers_num(self)
    }

    fn tasks_num(&self) -> usize {
        self.queue.len()
    }

    fn pending_declines(&self) -> usize {
        self.declines.load(Ordering::Acquire)
    }

    fn scale_up(&self, count: usize) -> usize {
        let mut added = 0;
        for _ in 0..count {
            match self.spawn_worker() {
                Ok(id) => {
                    log_worker!(self.config.label.as_str(), id, "added");
                    added += 1;
                }
                Err(e) => {
                    warn!(pool = %self.config.label, error = %e, "Failed to add worker");
                    break;
                }
            }
        }
        added
    }

    fn scale_down(&self) -> bool {
        self.request_decline()
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closing
    }

    fn label(&self) -> &str {
        &self.config.label
    }
}

/// A queue of tasks plus a dynamic set of worker threads draining it.
///
/// Dropping the pool declines every worker and blocks until all of them have
/// left the registry. Entries still queued at that point are discarded and
/// their handles resolve to [`TaskError::Abandoned`](cadre_api::TaskError::Abandoned).
///
/// # Examples
/// ```rust
/// use cadre::pool::WorkerPool;
/// use cadre::Submission;
///
/// let pool = WorkerPool::new(2).unwrap();
/// let handle = pool.submit(Submission::normal(|| println!("hello")));
/// handle.wait().unwrap();
/// assert_eq!(pool.workers_num(), 2);
/// ```
pub struct WorkerPool {
    core: Arc<PoolCore>,
}

impl WorkerPool {
    /// Creates a pool with `workers` initial workers and default settings.
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        Self::with_config(WorkerPoolConfig::with_workers(workers))
    }

    pub fn with_config(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        let initial = config.initial_workers;
        let pool = Self {
            core: Arc::new_cyclic(|this| PoolCore::new(config, this.clone())),
        };
        for _ in 0..initial {
            pool.add_worker()?;
        }
        debug!(pool = %pool.label(), workers = initial, "Worker pool started");
        Ok(pool)
    }

    /// Enqueues an entry without blocking.
    ///
    /// The returned handle resolves once the entry (every step, for a
    /// sequence) has run. It can be dropped if the result is not needed.
    pub fn submit(&self, submission: Submission) -> TaskHandle<()> {
        let (completer, handle) = completion();
        let mode = submission.mode();
        match submission {
            Submission::Normal(task) => self.core.queue.push_back(guarded(task, completer)),
            Submission::Urgent(task) => self.core.queue.push_front(guarded(task, completer)),
            Submission::Sequence(steps) => {
                let count = steps.len();
                self.core.queue.push_back(Box::new(move || {
                    let result = run_steps(steps);
                    if let Err(e) = &result {
                        error!(error = %e, steps = count, "Sequence aborted");
                    }
                    completer.complete(result);
                }));
            }
        }
        trace!(pool = %self.core.config.label, mode, "Entry queued");
        handle
    }

    /// Enqueues a value-producing task without blocking.
    pub fn spawn<F, R>(&self, priority: Priority, f: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (completer, handle) = completion();
        let job = guarded(f, completer);
        match priority {
            Priority::Normal => self.core.queue.push_back(job),
            Priority::Urgent => self.core.queue.push_front(job),
        }
        handle
    }

    /// Starts one more worker.
    pub fn add_worker(&self) -> Result<WorkerId, PoolError> {
        let id = self.core.spawn_worker()?;
        log_worker!(self.label(), id, "added");
        Ok(id)
    }

    /// Asks one worker, whichever gets there first, to exit after its current entry.
    ///
    /// Returns `false` (and logs a warning) if every registered worker already
    /// has a pending decline, which includes the empty pool.
    pub fn remove_worker(&self) -> bool {
        self.core.request_decline()
    }

    pub fn workers_num(&self) -> usize {
        self.core.workers_num()
    }

    pub fn tasks_num(&self) -> usize {
        self.core.queue.len()
    }

    /// Blocks until every registered worker has found the queue empty and
    /// parked, then releases them all together.
    ///
    /// Workers leaving mid-wait are accounted for. With no workers this
    /// returns immediately.
    pub fn wait_tasks(&self) {
        self.core.quiesce();
    }

    pub fn metrics(&self) -> PoolMetrics {
        self.core.metrics()
    }

    pub fn label(&self) -> &str {
        &self.core.config.label
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.core.config
    }

    /// Non-owning reference for supervision.
    pub fn downgrade(&self) -> Weak<dyn Scalable> {
        let weak: Weak<PoolCore> = Arc::downgrade(&self.core);
        weak
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.core.shutdown();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metrics = self.metrics();
        f.debug_struct("WorkerPool")
            .field("label", &self.core.config.label)
            .field("workers", &metrics.workers)
            .field("tasks", &metrics.tasks)
            .field("pending_declines", &metrics.pending_declines)
            .finish()
    }
}

/// Wraps `f` so that its result, or its panic, lands in `completer`.
fn guarded<F, R>(f: F, completer: Completer<R>) -> Task
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    Box::new(move || {
        let result = run_guarded(f);
        if let Err(e) = &result {
            error!(error = %e, "Task failed");
        }
        completer.complete(result);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    /// Registers a placeholder participant so a phase stays open until the
    /// test arrives on its behalf.
    fn register_placeholder(pool: &WorkerPool) -> WorkerId {
        let id = WorkerId::new();
        let thread = ManagedThread::<Detach>::spawn("placeholder".to_string(), || {}).unwrap();
        pool.core.state.lock().workers.insert(id, thread);
        id
    }

    fn wait_for_open_phase(core: &PoolCore) -> u64 {
        loop {
            if let Some(ticket) = core.quiescence_ticket() {
                return ticket;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn poll_before_phase_opened_does_not_park() {
        let pool = WorkerPool::new(0).unwrap();
        let placeholder = register_placeholder(&pool);

        // Ticket sampled before the caller submits and starts waiting.
        let stale = pool.core.quiescence_ticket();
        assert_eq!(stale, None);
        let _ = pool.submit(Submission::normal(|| {}));

        let core = pool.core.clone();
        let waiter = thread::spawn(move || core.quiesce());
        let ticket = wait_for_open_phase(&pool.core);

        // An empty poll that began before the phase must not count as idle.
        assert!(!pool.core.park_if_quiescing(stale));
        assert_eq!(pool.tasks_num(), 1);

        // Drain the entry as a worker would, then arrive with a fresh ticket.
        if let Some(job) = pool.core.queue.try_pop() {
            job();
        }
        assert!(pool.core.park_if_quiescing(Some(ticket)));
        waiter.join().unwrap();

        // The closed phase's ticket is stale from now on.
        assert!(!pool.core.park_if_quiescing(Some(ticket)));
        pool.core.state.lock().workers.remove(&placeholder);
    }

    #[test]
    fn tickets_differ_between_phases() {
        let pool = WorkerPool::new(0).unwrap();
        let placeholder = register_placeholder(&pool);

        let mut tickets = Vec::new();
        for _ in 0..2 {
            let core = pool.core.clone();
            let waiter = thread::spawn(move || core.quiesce());
            let ticket = wait_for_open_phase(&pool.core);
            assert!(pool.core.park_if_quiescing(Some(ticket)));
            waiter.join().unwrap();
            tickets.push(ticket);
        }

        assert_ne!(tickets[0], tickets[1]);
        pool.core.state.lock().workers.remove(&placeholder);
    }
}
