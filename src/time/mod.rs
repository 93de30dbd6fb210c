//! Time keeping.
//!
//! The kernel has no notion of wall-clock time: elapsed time is the number of
//! quanta delivered by the periodic tick source, counted by [`TickCounter`].

pub mod tick;

pub use tick::TickCounter;

/// Absolute tick value (number of quanta since the kernel started).
pub type Tick = u64;

/// Hardware tick source consumed by the kernel.
///
/// Implementations own the register-level details of the periodic timer. The
/// kernel only asks for three things: arm it, fire it now, and restart the
/// current countdown.
pub trait TickSource {
    /// Configure the timer to raise the scheduling interrupt every `reload + 1`
    /// cycles and start it.
    fn arm_periodic_interrupt(&self, reload: u32);

    /// Pend the scheduling interrupt immediately, outside the periodic cadence.
    fn force_immediate_interrupt(&self);

    /// Restart the countdown of the current quantum.
    fn reset_countdown(&self);
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn arm_periodic_interrupt(&self, reload: u32) {
        (**self).arm_periodic_interrupt(reload)
    }

    fn force_immediate_interrupt(&self) {
        (**self).force_immediate_interrupt()
    }

    fn reset_countdown(&self) {
        (**self).reset_countdown()
    }
}
