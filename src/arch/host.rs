//! Host implementation of the architecture layer.
//!
//! No registers are switched: contexts only remember where a thread would
//! start and which stack it owns, which is enough to drive and observe the
//! scheduler from ordinary unit tests.

use super::{Arch, Entry};
use crate::time::TickSource;
use portable_atomic::{AtomicUsize, Ordering};
use spin::Mutex;

/// Saved context on the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostContext {
    /// Address of the thread entry point
    pub entry: usize,
    /// Initial stack pointer
    pub stack_pointer: usize,
    /// Opaque marker of the last persisted state (0 = never saved)
    pub generation: u32,
}

/// Architecture implementation for host builds.
pub struct HostArch;

impl Arch for HostArch {
    type Context = HostContext;

    fn initialize_context(stack: &mut [u32], entry: Entry) -> Self::Context {
        HostContext {
            entry: entry as usize,
            stack_pointer: stack.as_mut_ptr_range().end as usize & !0x7,
            generation: 0,
        }
    }
}

/// Tick source that records every request the kernel makes of it.
pub struct HostTimer {
    reload: Mutex<Option<u32>>,
    forced: AtomicUsize,
    resets: AtomicUsize,
}

impl HostTimer {
    pub const fn new() -> Self {
        Self {
            reload: Mutex::new(None),
            forced: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
        }
    }

    /// Reload value the periodic interrupt was armed with, if armed.
    pub fn armed_reload(&self) -> Option<u32> {
        *self.reload.lock()
    }

    /// Number of out-of-cycle interrupts requested.
    pub fn forced_interrupts(&self) -> usize {
        self.forced.load(Ordering::Acquire)
    }

    /// Number of countdown restarts requested.
    pub fn countdown_resets(&self) -> usize {
        self.resets.load(Ordering::Acquire)
    }
}

impl Default for HostTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for HostTimer {
    fn arm_periodic_interrupt(&self, reload: u32) {
        *self.reload.lock() = Some(reload);
    }

    fn force_immediate_interrupt(&self) {
        self.forced.fetch_add(1, Ordering::AcqRel);
    }

    fn reset_countdown(&self) {
        self.resets.fetch_add(1, Ordering::AcqRel);
    }
}
