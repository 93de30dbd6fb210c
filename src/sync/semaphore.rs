//! Counting semaphore that waits by re-suspending.
//!
//! A waiter that finds no token sleeps for a fixed number of quanta and
//! checks again. There is no wait list, so waiters are served in no
//! particular order: whichever retry runs first after a `post` wins.

use super::Suspend;
use crate::config::DEFAULT_PEND_RETRY;
use crate::errors::SuspendError;
use core::cell::Cell;
use critical_section::Mutex;

/// Counting semaphore.
pub struct Semaphore {
    tokens: Mutex<Cell<u32>>,
}

impl Semaphore {
    /// Semaphore holding `count` tokens.
    pub const fn new(count: u32) -> Self {
        Self {
            tokens: Mutex::new(Cell::new(count)),
        }
    }

    /// Binary semaphore, initially available.
    pub const fn binary() -> Self {
        Self::new(1)
    }

    /// Take a token if one is available.
    ///
    /// The check and the decrement happen in one critical section, so two
    /// threads can never both take the last token.
    pub fn try_pend(&self) -> bool {
        critical_section::with(|cs| {
            let tokens = self.tokens.borrow(cs);
            match tokens.get() {
                0 => false,
                n => {
                    tokens.set(n - 1);
                    true
                }
            }
        })
    }

    /// Take a token, suspending for `retry` quanta between attempts.
    ///
    /// # Errors
    ///
    /// Returns the suspension error if the caller cannot be suspended (for
    /// example when called from the idle thread or before the kernel starts).
    /// A `retry` of 0 degrades to a pure busy wait.
    pub fn pend<S: Suspend + ?Sized>(&self, suspender: &S, retry: u32) -> Result<(), SuspendError> {
        while !self.try_pend() {
            suspender.suspend(retry)?;
        }
        Ok(())
    }

    /// Take a token, retrying every [`DEFAULT_PEND_RETRY`] quanta.
    pub fn acquire<S: Suspend + ?Sized>(&self, suspender: &S) -> Result<(), SuspendError> {
        self.pend(suspender, DEFAULT_PEND_RETRY)
    }

    /// Return a token. Waiters notice it on their next retry.
    pub fn post(&self) {
        critical_section::with(|cs| {
            let tokens = self.tokens.borrow(cs);
            tokens.set(tokens.get().saturating_add(1));
        });
    }

    /// Tokens currently available.
    pub fn available(&self) -> u32 {
        critical_section::with(|cs| self.tokens.borrow(cs).get())
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::binary()
    }
}
