//! # Worker Pull-Loop
//!
//! Each worker is one detached OS thread running [`run`] against the pool it
//! belongs to.
//!
//! ## State Machine
//! ```text
//!            decline won                 registry entry removed
//! Running ─────────────────▶ Declining ─────────────────────────▶ Terminated
//!   │  ▲
//!   │  │ phase closed
//!   ▼  │
//!   Idle (parked in the quiescence rendezvous)
//! ```
//!
//! ## Loop
//! 1. If declines are pending, try to win one. The winner decrements the
//!    counter and leaves the registry in one critical section, then exits;
//!    losers carry on.
//! 2. Pop one entry and run it. Entries contain their own panic boundary, so a
//!    failing task never unwinds through this loop.
//! 3. On an empty poll, park in the rendezvous if a quiescence phase was
//!    already open when the poll started; otherwise back off (yield, then
//!    sleep) and poll again.

use std::fmt;
use std::sync::Arc;
use std::thread;

use uuid::Uuid;

use super::PoolCore;
use crate::{log_worker, pool_span};

/// Unique identity of a pool worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(Uuid);

impl WorkerId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First eight hex digits, used in thread names.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Polling the queue and running entries
    Running,
    /// Parked until the current quiescence phase closes
    Idle,
    /// Won a decline and is leaving the registry
    Declining,
    /// Left the registry; the thread is about to return
    Terminated,
}

/// Body of a worker thread.
pub(crate) fn run(core: Arc<PoolCore>, id: WorkerId) {
    let span = pool_span!(core.config.label.as_str(), %id);
    let _guard = span.enter();

    let mut state = WorkerState::Running;
    let mut own_handle = None;
    let mut misses: u32 = 0;
    log_worker!(core.config.label.as_str(), id, "started");

    while state != WorkerState::Terminated {
        state = match state {
            WorkerState::Running => {
                let ticket = core.quiescence_ticket();
                if let Some(handle) = core.retire(id) {
                    own_handle = Some(handle);
                    WorkerState::Declining
                } else if let Some(job) = core.queue.try_pop() {
                    misses = 0;
                    job();
                    core.record_executed();
                    WorkerState::Running
                } else if core.park_if_quiescing(ticket) {
                    WorkerState::Idle
                } else if ticket.is_none() && core.quiescence_ticket().is_some() {
                    // A phase opened during the poll; poll again right away.
                    WorkerState::Running
                } else {
                    backoff(&core, &mut misses);
                    WorkerState::Running
                }
            }
            // The phase already closed inside `park_if_quiescing`.
            WorkerState::Idle => WorkerState::Running,
            WorkerState::Declining => {
                // Detaches this very thread; it is no longer in the registry.
                drop(own_handle.take());
                WorkerState::Terminated
            }
            WorkerState::Terminated => WorkerState::Terminated,
        };
    }

    log_worker!(core.config.label.as_str(), id, "retired");
}

fn backoff(core: &PoolCore, misses: &mut u32) {
    if *misses < core.config.idle_spins {
        *misses += 1;
        thread::yield_now();
    } else {
        thread::sleep(core.config.idle_sleep);
    }
}
