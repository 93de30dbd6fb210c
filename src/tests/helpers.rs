//! Test helper utilities and common functionality.

use crate::arch::host::{HostArch, HostContext, HostTimer};
use crate::config::KernelConfig;
use crate::kernel::Kernel;
use crate::thread::ThreadState;
use alloc::boxed::Box;

/// Host kernel with `N` application threads and small stacks.
pub(crate) type SimKernel<const N: usize> = Kernel<HostArch, HostTimer, N, 64>;

/// Entry point for threads whose bodies the simulation runs by hand.
pub(crate) fn park() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// Drives a host kernel the way the SysTick trampoline would.
pub(crate) struct Simulation<const N: usize> {
    pub(crate) kernel: Box<SimKernel<N>>,
}

impl<const N: usize> Simulation<N> {
    /// Create and start a kernel with one thread per `(name, priority)`.
    pub(crate) fn start(threads: [(&str, u8); N]) -> Self {
        let kernel = Box::new(Kernel::new(HostTimer::new(), KernelConfig::new()));
        for (name, priority) in threads {
            kernel.create(name, park, priority).expect("Failed to create thread");
        }
        kernel.start().expect("Failed to start kernel");
        Self { kernel }
    }

    /// Deliver one scheduling interrupt: the forced switch if one is
    /// pending, otherwise a quantum boundary.
    pub(crate) fn interrupt(&self) -> HostContext {
        self.kernel.switch_context(HostContext::default())
    }

    /// The calling thread suspends itself and the forced interrupt lands.
    pub(crate) fn suspend_current(&self, quanta: u32) {
        self.kernel.suspend(quanta).expect("Failed to suspend");
        self.interrupt();
    }

    pub(crate) fn current(&self) -> usize {
        self.kernel.current_slot().expect("Kernel not started")
    }

    pub(crate) fn idle(&self) -> usize {
        self.kernel.idle_slot()
    }

    pub(crate) fn state(&self, slot: usize) -> ThreadState {
        self.kernel.state(slot).expect("No such slot")
    }

    /// Number of records marked running, idle included.
    pub(crate) fn running_count(&self) -> usize {
        (0..=N).filter(|&slot| self.state(slot) == ThreadState::Running).count()
    }
}

/// Simple linear congruential generator for property testing.
pub(crate) struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    pub(crate) fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        min + ((self.next_u64() >> 33) % (max - min))
    }

    pub(crate) fn gen_bool(&mut self) -> bool {
        (self.next_u64() >> 33) & 1 == 0
    }
}
