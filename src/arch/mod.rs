//! Architecture abstraction layer for context creation and switching.
//!
//! The portable kernel never looks inside a saved context. It asks the
//! architecture to build one for a fresh stack, and hands the outgoing and
//! incoming contexts to it when the trampoline switches threads.

/// Thread entry point. Threads never return.
pub type Entry = fn() -> !;

/// Architecture abstraction trait.
///
/// This trait must be implemented for each supported processor to provide
/// initial context construction and the register-state hand-over performed
/// by the context-switch trampoline.
pub trait Arch {
    /// Opaque saved execution context of one thread.
    ///
    /// On Cortex-M this is the saved process stack pointer; the registers
    /// themselves live on the thread's stack.
    type Context: Clone + Send;

    /// Build the initial context for a thread.
    ///
    /// `stack` is the thread's whole stack region, lowest address first. When
    /// the returned context is first restored, execution begins at `entry`.
    fn initialize_context(stack: &mut [u32], entry: Entry) -> Self::Context;

    /// Persist the live state of the outgoing thread and produce the state to
    /// restore for the incoming one.
    ///
    /// Called by the kernel with interrupts masked.
    fn swap_context(
        outgoing: &mut Self::Context,
        live: Self::Context,
        incoming: &Self::Context,
    ) -> Self::Context {
        *outgoing = live;
        incoming.clone()
    }

    /// Park the processor until the next interrupt. Used by the idle thread.
    fn wait_for_interrupt() {
        core::hint::spin_loop();
    }
}

/// Body of the idle thread: wait for interrupts forever.
pub fn idle_loop<A: Arch>() -> ! {
    loop {
        A::wait_for_interrupt();
    }
}

pub mod host;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use self::cortex_m::CortexM as DefaultArch;

// Host builds (tests, std-shim) run the portable core without real switching
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub use host::HostArch as DefaultArch;
