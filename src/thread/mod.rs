//! Thread control records.
//!
//! A thread is represented by one [`ThreadControl`] record in the kernel's
//! [`ThreadTable`]. Records are populated once, at creation, and never
//! destroyed; only their state and wake tick change afterwards.

pub mod table;

pub use table::ThreadTable;

use crate::arch::Entry;
use crate::config::THREAD_NAME_CAPACITY;
use crate::errors::NameError;
use crate::time::Tick;
use core::fmt;

/// Bounded, validated thread identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ThreadName(heapless::String<THREAD_NAME_CAPACITY>);

impl ThreadName {
    /// Validate and copy an identifier.
    pub fn new(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        let mut label = heapless::String::new();
        label.push_str(name).map_err(|_| NameError::TooLong {
            len: name.len(),
            capacity: THREAD_NAME_CAPACITY,
        })?;
        Ok(Self(label))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ThreadState {
    /// Eligible for selection
    Ready = 0,
    /// Selected to own the processor
    Running = 1,
    /// Waiting for an explicit resume
    Blocked = 2,
    /// Waiting for its wake tick
    Suspended = 3,
}

/// Per-thread control record.
pub struct ThreadControl<C> {
    /// Identifier used by block/resume lookups; `None` for the idle thread
    pub(crate) name: Option<ThreadName>,
    pub(crate) priority: u8,
    pub(crate) state: ThreadState,
    /// Only meaningful while `state == Suspended`
    pub(crate) wake_tick: Option<Tick>,
    pub(crate) entry: Entry,
    pub(crate) context: C,
}

impl<C> ThreadControl<C> {
    pub(crate) fn new(name: Option<ThreadName>, priority: u8, entry: Entry, context: C) -> Self {
        Self {
            name,
            priority,
            state: ThreadState::Ready,
            wake_tick: None,
            entry,
            context,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(ThreadName::as_str)
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn wake_tick(&self) -> Option<Tick> {
        self.wake_tick
    }

    pub fn entry(&self) -> Entry {
        self.entry
    }

    pub fn is_ready(&self) -> bool {
        self.state == ThreadState::Ready
    }

    /// Move to `state`, clearing the wake tick.
    pub(crate) fn set_state(&mut self, state: ThreadState) {
        self.state = state;
        self.wake_tick = None;
    }

    /// Suspend until the tick counter reads `wake_tick`.
    pub(crate) fn suspend_until(&mut self, wake_tick: Tick) {
        self.state = ThreadState::Suspended;
        self.wake_tick = Some(wake_tick);
    }
}
