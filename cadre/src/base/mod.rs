//! Collaborators the pools are built from: a locked double-ended queue and an
//! owned thread handle with a type-level exit policy.

pub mod managed_thread;
pub mod queue;

pub use managed_thread::{Detach, ExitPolicy, Join, ManagedThread};
pub use queue::ConcurrentQueue;
