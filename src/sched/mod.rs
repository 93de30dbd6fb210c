//! Thread selection.
//!
//! Selection is a pure function over the application slots: the ready thread
//! with the strictly highest priority wins, ties go to the lowest slot index,
//! and the idle slot is chosen when nothing else is ready.

use crate::thread::ThreadControl;

/// Pick the slot that should own the processor next.
///
/// `slots` are the application slots in index order; `idle_slot` is returned
/// when none of them is ready. The idle priority (0) is the starting bar, so
/// an application thread of priority 0 is never preferred over idle.
pub fn select_next<C>(slots: &[Option<ThreadControl<C>>], idle_slot: usize) -> usize {
    let mut next = idle_slot;
    let mut max = priority::IDLE;

    for (index, record) in slots.iter().enumerate() {
        if let Some(record) = record {
            if record.is_ready() && record.priority() > max {
                max = record.priority();
                next = index;
            }
        }
    }
    next
}

/// Priority levels for threads.
///
/// Higher values take precedence. These are convenience constants; any `u8`
/// is accepted at creation.
pub mod priority {
    /// Idle priority - reserved for the idle thread
    pub const IDLE: u8 = 0;

    /// Lowest priority an application thread should use
    pub const LOW: u8 = 1;

    /// Normal priority - default for most threads
    pub const NORMAL: u8 = 128;

    /// High priority - latency-sensitive threads
    pub const HIGH: u8 = 192;

    /// Highest priority
    pub const REALTIME: u8 = 255;
}
