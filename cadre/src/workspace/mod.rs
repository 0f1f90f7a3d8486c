//! # Workspace Module
//!
//! A [`Workspace`] owns a set of pools and supervisors behind opaque,
//! generation-checked handles and load-balances submissions across its pools.
//!
//! ## Routing
//! `submit` compares the pool under the cursor with the next one in
//! attachment order, sends the entry to whichever has the shorter queue
//! (the current pool on a tie), then moves the cursor to that next pool.
//!
//! ## Ownership
//! - Attaching moves a pool or supervisor in; detaching hands it back
//! - Stale handles fail lookups with a `*NotFound` error instead of
//!   reaching a different object
//! - Supervisors are dropped before pools when the workspace goes away

mod arena;
mod handle;

use std::fmt;
use std::ops::Index;

use parking_lot::Mutex;
use tracing::{debug, trace};

use cadre_api::{Priority, Submission, TaskHandle};

use crate::error::WorkspaceError;
use crate::pool::WorkerPool;
use crate::supervisor::Supervisor;

use self::arena::Arena;
pub use self::handle::{PoolHandle, SupervisorHandle};

/// Owner of pools and supervisors with a round-robin submission front.
///
/// # Examples
/// ```rust
/// use cadre::{Submission, WorkerPool, Workspace};
///
/// let mut workspace = Workspace::new();
/// let first = workspace.attach_pool(WorkerPool::new(1).unwrap());
/// workspace.attach_pool(WorkerPool::new(1).unwrap());
///
/// let handle = workspace.submit(Submission::normal(|| {})).unwrap();
/// handle.wait().unwrap();
/// workspace[first].wait_tasks();
/// ```
pub struct Workspace {
    // Declared first so supervisors drop before the pools they watch.
    supervisors: Arena<Supervisor>,
    pools: Arena<WorkerPool>,
    /// Attachment order of the pools; the cursor indexes into it.
    order: Vec<PoolHandle>,
    cursor: Mutex<usize>,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            supervisors: Arena::new(),
            pools: Arena::new(),
            order: Vec::new(),
            cursor: Mutex::new(0),
        }
    }

    /// Takes ownership of `pool` and rewinds the cursor to the first pool.
    pub fn attach_pool(&mut self, pool: WorkerPool) -> PoolHandle {
        let label = pool.label().to_string();
        let handle = PoolHandle(self.pools.insert(pool));
        self.order.push(handle);
        *self.cursor.get_mut() = 0;
        debug!(%handle, pool = %label, "Pool attached");
        handle
    }

    pub fn attach_supervisor(&mut self, supervisor: Supervisor) -> SupervisorHandle {
        let handle = SupervisorHandle(self.supervisors.insert(supervisor));
        debug!(%handle, "Supervisor attached");
        handle
    }

    /// Hands the pool back to the caller.
    ///
    /// If the cursor was on this pool it moves on to the next one first.
    pub fn detach_pool(&mut self, handle: PoolHandle) -> Result<WorkerPool, WorkspaceError> {
        let pool = self
            .pools
            .remove(handle.0)
            .ok_or(WorkspaceError::PoolNotFound(handle))?;

        if let Some(position) = self.order.iter().position(|h| *h == handle) {
            self.order.remove(position);
            let cursor = self.cursor.get_mut();
            if position < *cursor {
                *cursor -= 1;
            }
            // When position == cursor the cursor now names the following pool.
            if *cursor >= self.order.len() {
                *cursor = 0;
            }
        }
        debug!(%handle, pools = self.order.len(), "Pool detached");
        Ok(pool)
    }

    pub fn detach_supervisor(
        &mut self,
        handle: SupervisorHandle,
    ) -> Result<Supervisor, WorkspaceError> {
        let supervisor = self
            .supervisors
            .remove(handle.0)
            .ok_or(WorkspaceError::SupervisorNotFound(handle))?;
        debug!(%handle, "Supervisor detached");
        Ok(supervisor)
    }

    pub fn pool(&self, handle: PoolHandle) -> Result<&WorkerPool, WorkspaceError> {
        self.pools
            .get(handle.0)
            .ok_or(WorkspaceError::PoolNotFound(handle))
    }

    pub fn supervisor(&self, handle: SupervisorHandle) -> Result<&Supervisor, WorkspaceError> {
        self.supervisors
            .get(handle.0)
            .ok_or(WorkspaceError::SupervisorNotFound(handle))
    }

    /// Has the supervisor `sid` watch the pool `pid`; both must be attached here.
    pub fn supervise(
        &self,
        sid: SupervisorHandle,
        pid: PoolHandle,
    ) -> Result<(), WorkspaceError> {
        let supervisor = self.supervisor(sid)?;
        let pool = self.pool(pid)?;
        supervisor.supervise(pool);
        debug!(supervisor = %sid, pool = %pid, "Pool supervised");
        Ok(())
    }

    /// Visits every pool in attachment order.
    pub fn for_each_pool<F>(&self, mut action: F)
    where
        F: FnMut(PoolHandle, &WorkerPool),
    {
        for handle in &self.order {
            if let Some(pool) = self.pools.get(handle.0) {
                action(*handle, pool);
            }
        }
    }

    pub fn for_each_supervisor<F>(&self, mut action: F)
    where
        F: FnMut(SupervisorHandle, &Supervisor),
    {
        for (key, supervisor) in self.supervisors.iter() {
            action(SupervisorHandle(key), supervisor);
        }
    }

    /// Load-balanced submission; see the module docs for the routing rule.
    pub fn submit(&self, submission: Submission) -> Result<TaskHandle<()>, WorkspaceError> {
        let target = self.route()?;
        Ok(self[target].submit(submission))
    }

    /// Load-balanced value-producing submission.
    pub fn spawn<F, R>(&self, priority: Priority, f: F) -> Result<TaskHandle<R>, WorkspaceError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let target = self.route()?;
        Ok(self[target].spawn(priority, f))
    }

    /// Picks the target pool and advances the cursor.
    fn route(&self) -> Result<PoolHandle, WorkspaceError> {
        let mut cursor = self.cursor.lock();
        let len = self.order.len();
        if len == 0 {
            return Err(WorkspaceError::NoPools);
        }

        let current = *cursor % len;
        let next = (current + 1) % len;
        let (current_handle, next_handle) = (self.order[current], self.order[next]);
        let target = if self[next_handle].tasks_num() < self[current_handle].tasks_num() {
            next_handle
        } else {
            current_handle
        };
        *cursor = next;
        trace!(pool = %target, cursor = next, "Routed submission");
        Ok(target)
    }

    /// Pool under the cursor, if any pool is attached.
    pub fn current(&self) -> Option<PoolHandle> {
        let cursor = *self.cursor.lock();
        self.order.get(cursor).copied()
    }

    /// Pool handles in attachment order.
    pub fn pool_handles(&self) -> Vec<PoolHandle> {
        self.order.clone()
    }

    pub fn contains_pool(&self, handle: PoolHandle) -> bool {
        self.pools.contains(handle.0)
    }

    pub fn contains_supervisor(&self, handle: SupervisorHandle) -> bool {
        self.supervisors.contains(handle.0)
    }

    pub fn pools_num(&self) -> usize {
        self.pools.len()
    }

    pub fn supervisors_num(&self) -> usize {
        self.supervisors.len()
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<PoolHandle> for Workspace {
    type Output = WorkerPool;

    /// # Panics
    /// If the handle is not attached. Use [`Workspace::pool`] to check.
    fn index(&self, handle: PoolHandle) -> &WorkerPool {
        match self.pools.get(handle.0) {
            Some(pool) => pool,
            None => panic!("{} is not attached to this workspace", handle),
        }
    }
}

impl Index<SupervisorHandle> for Workspace {
    type Output = Supervisor;

    /// # Panics
    /// If the handle is not attached. Use [`Workspace::supervisor`] to check.
    fn index(&self, handle: SupervisorHandle) -> &Supervisor {
        match self.supervisors.get(handle.0) {
            Some(supervisor) => supervisor,
            None => panic!("{} is not attached to this workspace", handle),
        }
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("pools", &self.order)
            .field("supervisors", &self.supervisors.len())
            .field("cursor", &*self.cursor.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_pool() -> WorkerPool {
        WorkerPool::new(0).unwrap()
    }

    #[test]
    fn cursor_advances_round_robin() {
        let mut workspace = Workspace::new();
        let handles: Vec<_> = (0..3).map(|_| workspace.attach_pool(idle_pool())).collect();
        assert_eq!(workspace.current(), Some(handles[0]));

        workspace.submit(Submission::normal(|| {})).unwrap();
        assert_eq!(workspace.current(), Some(handles[1]));
        workspace.submit(Submission::normal(|| {})).unwrap();
        workspace.submit(Submission::normal(|| {})).unwrap();
        assert_eq!(workspace.current(), Some(handles[0]));
    }

    #[test]
    fn tie_goes_to_current_pool() {
        let mut workspace = Workspace::new();
        let a = workspace.attach_pool(idle_pool());
        let b = workspace.attach_pool(idle_pool());

        workspace.submit(Submission::normal(|| {})).unwrap();
        assert_eq!(workspace[a].tasks_num(), 1);
        assert_eq!(workspace[b].tasks_num(), 0);
        assert_eq!(workspace.current(), Some(b));
    }

    #[test]
    fn detaching_current_pool_moves_cursor_to_next() {
        let mut workspace = Workspace::new();
        let a = workspace.attach_pool(idle_pool());
        let b = workspace.attach_pool(idle_pool());
        let c = workspace.attach_pool(idle_pool());

        workspace.submit(Submission::normal(|| {})).unwrap();
        assert_eq!(workspace.current(), Some(b));

        workspace.detach_pool(b).unwrap();
        assert_eq!(workspace.current(), Some(c));

        workspace.detach_pool(c).unwrap();
        assert_eq!(workspace.current(), Some(a));
    }

    #[test]
    fn detaching_earlier_pool_keeps_cursor_on_same_pool() {
        let mut workspace = Workspace::new();
        let a = workspace.attach_pool(idle_pool());
        let b = workspace.attach_pool(idle_pool());
        workspace.attach_pool(idle_pool());

        workspace.submit(Submission::normal(|| {})).unwrap();
        assert_eq!(workspace.current(), Some(b));
        workspace.detach_pool(a).unwrap();
        assert_eq!(workspace.current(), Some(b));
    }

    #[test]
    fn attaching_rewinds_cursor_to_first_pool() {
        let mut workspace = Workspace::new();
        let a = workspace.attach_pool(idle_pool());
        let b = workspace.attach_pool(idle_pool());

        workspace.submit(Submission::normal(|| {})).unwrap();
        assert_eq!(workspace.current(), Some(b));

        let c = workspace.attach_pool(idle_pool());
        assert_eq!(workspace.current(), Some(a));
        workspace.submit(Submission::normal(|| {})).unwrap();
        assert_eq!(workspace[a].tasks_num(), 1);
        assert_eq!(workspace[b].tasks_num(), 1);
        assert_eq!(workspace[c].tasks_num(), 0);
    }

    #[test]
    fn empty_workspace_refuses_submissions() {
        let mut workspace = Workspace::new();
        assert_eq!(workspace.current(), None);
        assert_eq!(
            workspace.submit(Submission::normal(|| {})).unwrap_err(),
            WorkspaceError::NoPools
        );

        let only = workspace.attach_pool(idle_pool());
        workspace.detach_pool(only).unwrap();
        assert!(workspace.spawn(Priority::Normal, || 1).is_err());
    }
}
