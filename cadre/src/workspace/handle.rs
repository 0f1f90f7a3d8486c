use std::fmt;

use super::arena::Key;

/// Opaque reference to a pool attached to a [`Workspace`](super::Workspace).
///
/// Comparable and copyable; only meaningful to the workspace that issued it,
/// and only until the pool is detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolHandle(pub(crate) Key);

/// Opaque reference to a supervisor attached to a [`Workspace`](super::Workspace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SupervisorHandle(pub(crate) Key);

impl fmt::Display for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

impl fmt::Display for SupervisorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "supervisor#{}", self.0)
    }
}
