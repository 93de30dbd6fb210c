//! Synchronization primitives built on the thread lifecycle.
//!
//! Neither primitive adds a wait list or its own preemption mechanism:
//! [`Semaphore::pend`] waits by repeatedly suspending the caller, and
//! [`Queue`] is a plain ring buffer that callers serialize themselves.

pub mod queue;
pub mod semaphore;

pub use queue::Queue;
pub use semaphore::Semaphore;

use crate::errors::SuspendError;

/// Voluntary suspension of the calling thread.
///
/// Implemented by [`Kernel`](crate::Kernel); primitives that wait by
/// re-suspending take it as a parameter instead of reaching for a global.
pub trait Suspend {
    /// Suspend the caller for `quanta` scheduling quanta.
    fn suspend(&self, quanta: u32) -> Result<(), SuspendError>;
}

impl<S: Suspend + ?Sized> Suspend for &S {
    fn suspend(&self, quanta: u32) -> Result<(), SuspendError> {
        (**self).suspend(quanta)
    }
}
