//! # Managed Threads
//!
//! An owned OS thread that is released exactly once when its handle is
//! dropped. What "released" means is chosen at the type level:
//!
//! - [`Join`]: the dropping thread blocks until the managed thread returns
//! - [`Detach`]: the managed thread keeps running and is reclaimed by the OS
//!
//! Pool workers use `Detach` because a worker removes its own handle from the
//! registry right before it exits. The supervisor's control thread uses `Join`
//! so that dropping a supervisor waits for its loop to stop.

use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{error, trace};

/// What to do with a thread when its [`ManagedThread`] is dropped.
pub trait ExitPolicy {
    /// Name used in logs and debug output.
    const NAME: &'static str;

    fn release(handle: JoinHandle<()>);
}

/// Join the thread on drop.
#[derive(Debug)]
pub struct Join;

/// Detach the thread on drop.
#[derive(Debug)]
pub struct Detach;

impl ExitPolicy for Join {
    const NAME: &'static str = "join";

    fn release(handle: JoinHandle<()>) {
        // A thread dropping its own handle cannot wait for itself.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        let name = handle.thread().name().unwrap_or("unnamed").to_string();
        if let Err(payload) = handle.join() {
            error!(
                thread = %name,
                "Managed thread panicked: {}",
                cadre_api::task::panic_message(payload.as_ref())
            );
        } else {
            trace!(thread = %name, "Managed thread joined");
        }
    }
}

impl ExitPolicy for Detach {
    const NAME: &'static str = "detach";

    fn release(handle: JoinHandle<()>) {
        drop(handle);
    }
}

/// A thread handle released according to `P` on drop.
pub struct ManagedThread<P: ExitPolicy> {
    handle: Option<JoinHandle<()>>,
    _policy: PhantomData<P>,
}

impl<P: ExitPolicy> ManagedThread<P> {
    /// Spawns a named thread running `body`.
    pub fn spawn<F>(name: String, body: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new().name(name).spawn(body)?;
        Ok(Self {
            handle: Some(handle),
            _policy: PhantomData,
        })
    }

    /// Identity of the managed thread.
    pub fn id(&self) -> Option<ThreadId> {
        self.handle.as_ref().map(|h| h.thread().id())
    }

    pub fn name(&self) -> Option<&str> {
        self.handle.as_ref().and_then(|h| h.thread().name())
    }

    /// Whether the thread body has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }
}

impl<P: ExitPolicy> Drop for ManagedThread<P> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            P::release(handle);
        }
    }
}

impl<P: ExitPolicy> fmt::Debug for ManagedThread<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedThread")
            .field("name", &self.name())
            .field("policy", &P::NAME)
            .field("finished", &self.is_finished())
            .finish()
    }
}
