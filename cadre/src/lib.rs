// Cadre Worker-Pool Runtime
//
// Thread pools that grow and shrink at runtime, a supervisor that resizes
// them from their backlog, and a workspace that owns several pools and
// spreads submissions across them.
//
// The submission vocabulary (tasks, submission modes, result handles) lives
// in `cadre-api` and is re-exported here.

pub mod base;
pub mod config;
pub mod error;
pub mod logging;
pub mod pool;
pub mod supervisor;
pub mod workspace;

// Re-export commonly used types
pub use cadre_api::{task, Priority, Scalable, Submission, TaskError, TaskHandle, TaskResult};
pub use config::{SupervisorConfig, WorkerPoolConfig};
pub use error::{PoolError, SupervisorError, WorkspaceError};
pub use pool::{PoolMetrics, WorkerId, WorkerPool};
pub use supervisor::{Adjustment, PoolAdjustment, Supervisor, TickReport};
pub use workspace::{PoolHandle, SupervisorHandle, Workspace};

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
