//! # Task Error Types
//!
//! Errors surfaced through a [`TaskHandle`](crate::handle::TaskHandle) when a
//! submitted entry does not produce its value.
//!
//! A worker never lets a task failure escape its pull-loop: panics are caught
//! at the execution boundary and routed into the entry's result channel, so
//! the worker keeps draining the queue afterwards.
//!
//! ## Usage Example
//!
//! ```rust
//! use cadre_api::errors::TaskError;
//!
//! fn report(error: TaskError) {
//!     match error {
//!         TaskError::Panicked { message } => eprintln!("task panicked: {message}"),
//!         TaskError::StepPanicked { step, .. } => eprintln!("sequence stopped at step {step}"),
//!         TaskError::Abandoned => eprintln!("task was discarded before it ran"),
//!     }
//! }
//! ```

use thiserror::Error;

/// Failure of a single submitted entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task panicked while running on a worker.
    #[error("Task panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text
        message: String,
    },

    /// One step of a sequence panicked; the steps after it were skipped.
    #[error("Sequence step {step} panicked: {message}")]
    StepPanicked {
        /// Zero-based position of the failing step
        step: usize,
        /// Panic payload rendered as text
        message: String,
    },

    /// The entry was dropped without running, e.g. its pool shut down with a backlog.
    #[error("Task was abandoned before it ran")]
    Abandoned,
}

impl TaskError {
    /// Whether the task started running and then failed.
    pub fn is_panic(&self) -> bool {
        !matches!(self, TaskError::Abandoned)
    }
}

/// Result of a submitted entry.
pub type TaskResult<T> = Result<T, TaskError>;
