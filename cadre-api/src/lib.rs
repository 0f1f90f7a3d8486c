//! # Cadre API
//!
//! The vocabulary shared by every cadre executor: what a unit of work is, how
//! it is placed in a queue, how its result travels back to the caller, and how
//! a supervisor talks to something it can resize.
//!
//! ## Core Components
//!
//! - **Tasks**: boxed `FnOnce` closures consumed exactly once by one worker
//! - **Submissions**: the Normal / Urgent / Sequence queueing disciplines
//! - **Handles**: one-shot result channels, blocking or awaitable
//! - **Scalable**: the observation and resize surface used by supervisors
//!
//! ## Module Organization
//!
//! - [`task`]: task type and the panic-containing execution boundary
//! - [`submission`]: submission modes and placement
//! - [`handle`]: result handles and their completers
//! - [`scalable`]: the supervisor-facing trait
//! - [`errors`]: task failure types

pub mod errors;
pub mod handle;
pub mod scalable;
pub mod submission;
pub mod task;

pub use errors::{TaskError, TaskResult};
pub use handle::{completion, Completer, TaskHandle};
pub use scalable::Scalable;
pub use submission::{Priority, Submission};
pub use task::{run_guarded, run_steps, task, Task};
