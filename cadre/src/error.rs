use thiserror::Error;

use crate::workspace::{PoolHandle, SupervisorHandle};

/// Errors related to worker pool operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Failed to spawn worker thread: {0}")]
    SpawnFailed(String),
    #[error("Worker pool is shutting down")]
    ShuttingDown,
}

/// Errors related to supervisor construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("Invalid worker bounds: min {min}, max {max}")]
    InvalidBounds { min: usize, max: usize },
    #[error("Failed to spawn supervisor thread: {0}")]
    SpawnFailed(String),
}

/// Errors related to the workspace façade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Pool not found: {0}")]
    PoolNotFound(PoolHandle),
    #[error("Supervisor not found: {0}")]
    SupervisorNotFound(SupervisorHandle),
    #[error("Workspace has no attached pools")]
    NoPools,
}
