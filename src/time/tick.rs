//! Tick counting.

use super::Tick;
use portable_atomic::{AtomicU64, Ordering};

/// Monotonic counter of elapsed scheduling quanta.
///
/// Created once when the kernel is built and never reset. Only the tick
/// interrupt advances it; everything else reads.
pub struct TickCounter {
    ticks: AtomicU64,
}

impl TickCounter {
    /// Create a counter starting at tick 0.
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Advance by one quantum (called from the tick interrupt only).
    pub(crate) fn increment(&self) {
        self.ticks.fetch_add(1, Ordering::AcqRel);
    }

    /// Get the current tick count.
    pub fn ticks(&self) -> Tick {
        self.ticks.load(Ordering::Acquire)
    }

    /// Absolute tick `delay` quanta from now.
    pub fn deadline(&self, delay: u32) -> Tick {
        self.ticks().wrapping_add(delay as Tick)
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_counter() {
        let counter = TickCounter::new();
        assert_eq!(counter.ticks(), 0);

        counter.increment();
        counter.increment();
        assert_eq!(counter.ticks(), 2);
        assert_eq!(counter.deadline(50), 52);
    }

    #[test]
    fn test_deadline_wraps() {
        let counter = TickCounter {
            ticks: AtomicU64::new(u64::MAX),
        };
        assert_eq!(counter.deadline(1), 0);
    }
}
