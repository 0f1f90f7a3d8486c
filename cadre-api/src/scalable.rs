//! # Scalable Targets
//!
//! The seam between a supervisor and the executors it resizes. A supervisor
//! only ever holds a `Weak<dyn Scalable>`, resolved once per tick, so a
//! target that has been dropped is noticed and pruned instead of dangling.

/// An executor whose worker count can be observed and adjusted.
///
/// All methods must be callable concurrently with the executor's own
/// producers and workers.
pub trait Scalable: Send + Sync {
    /// Currently registered workers.
    fn workers_num(&self) -> usize;

    /// Entries waiting in the queue.
    fn tasks_num(&self) -> usize;

    /// Removal requests accepted but not yet honoured by a worker.
    fn pending_declines(&self) -> usize {
        0
    }

    /// Adds up to `count` workers, returning how many were started.
    fn scale_up(&self, count: usize) -> usize;

    /// Requests cooperative removal of one worker. Returns `false` if refused.
    fn scale_down(&self) -> bool;

    /// Whether the target is shutting down and should no longer be supervised.
    fn is_closed(&self) -> bool {
        false
    }

    /// Name used in logs.
    fn label(&self) -> &str {
        "anonymous"
    }
}
