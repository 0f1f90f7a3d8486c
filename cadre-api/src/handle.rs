//! # Task Result Handles
//!
//! A [`TaskHandle`] is the caller's side of a one-shot channel whose other
//! end, a [`Completer`], travels inside the queued entry. The worker that runs
//! the entry writes the result exactly once; waiting on the handle blocks only
//! the caller, never a worker.
//!
//! Dropping a handle is fine: the entry still runs and its result is
//! discarded. Dropping the completer without writing (the entry was thrown
//! away before it ran) resolves the handle with [`TaskError::Abandoned`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::executor::block_on;

use crate::errors::{TaskError, TaskResult};

/// Creates a connected completer/handle pair.
pub fn completion<R>() -> (Completer<R>, TaskHandle<R>) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, TaskHandle { rx })
}

/// Write side of a task result.
pub struct Completer<R> {
    tx: oneshot::Sender<TaskResult<R>>,
}

impl<R> Completer<R> {
    /// Stores the result. Returns `false` if the handle was already dropped.
    pub fn complete(self, result: TaskResult<R>) -> bool {
        self.tx.send(result).is_ok()
    }

    /// Whether the caller still holds the matching handle.
    pub fn is_wanted(&self) -> bool {
        !self.tx.is_canceled()
    }
}

impl<R> fmt::Debug for Completer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("wanted", &self.is_wanted())
            .finish()
    }
}

/// Future-like handle to the result of a submitted entry.
#[must_use = "dropping a TaskHandle discards the task's result"]
pub struct TaskHandle<R> {
    rx: oneshot::Receiver<TaskResult<R>>,
}

impl<R> TaskHandle<R> {
    /// Blocks the calling thread until the entry finishes.
    ///
    /// Do not call this from inside an async task; `.await` the handle instead.
    pub fn wait(self) -> TaskResult<R> {
        block_on(self)
    }

    /// Returns the result if it is already available.
    pub fn try_result(&mut self) -> Option<TaskResult<R>> {
        match self.rx.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(TaskError::Abandoned)),
        }
    }
}

impl<R> Future for TaskHandle<R> {
    type Output = TaskResult<R>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::Abandoned)))
    }
}

impl<R> fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").finish_non_exhaustive()
    }
}
