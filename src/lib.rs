#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Priority-preemptive thread kernel for single-core microcontrollers.
//!
//! A fixed population of threads shares one processor. A periodic tick
//! interrupt marks quantum boundaries; at every boundary, and whenever a
//! thread suspends itself, the highest-priority ready thread is chosen to
//! run. When nothing is ready an automatically generated idle thread waits
//! for the next interrupt.
//!
//! # Target Platform
//!
//! - **Architecture**: ARMv7-M (Cortex-M3/M4/M7), `thumbv7m-none-eabi` and
//!   `thumbv7em-none-eabi`
//! - **Tick source**: SysTick
//! - **Host**: the portable core builds and tests on any host with
//!   [`arch::host::HostArch`], which does not switch registers
//!
//! # Features
//!
//! - `std-shim`: Provide `critical-section` through `std` for host builds
//! - `panic-handler`: Install a halting panic handler (bare-metal only)
//!
//! # Quick Start
//!
//! ```ignore
//! use priority_kernel::arch::cortex_m::{self, CortexM, SysTickSource};
//! use priority_kernel::{Kernel, KernelConfig, Semaphore};
//!
//! static KERNEL: Kernel<CortexM, SysTickSource, 2> =
//!     Kernel::new(SysTickSource::new(), KernelConfig::new());
//! static UART: Semaphore = Semaphore::binary();
//!
//! fn sampler() -> ! {
//!     loop {
//!         UART.pend(&KERNEL, 2).ok();
//!         /* write a sample */
//!         UART.post();
//!         KERNEL.suspend(10).ok();
//!     }
//! }
//!
//! fn logger() -> ! {
//!     loop {
//!         UART.acquire(&KERNEL).ok();
//!         /* flush the log buffer */
//!         UART.post();
//!         KERNEL.suspend(50).ok();
//!     }
//! }
//!
//! fn main() -> ! {
//!     KERNEL.create("sampler", sampler, 2).unwrap();
//!     KERNEL.create("logger", logger, 1).unwrap();
//!     match cortex_m::run(&KERNEL) {
//!         Ok(never) => match never {},
//!         Err(error) => panic!("{}", error),
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`thread::ThreadTable`]: N application slots plus the idle slot
//! - [`sched::select_next`]: strict-priority selection, ties to the lowest slot
//! - [`Kernel`]: lifecycle API, tick handling, trampoline entry
//! - [`sync`]: semaphore and bounded queue built on the lifecycle API

// Core modules
pub mod arch;
pub mod config;
pub mod errors;
pub mod kernel;
pub mod mem;
pub mod sched;
pub mod sync;
pub mod thread;
pub mod time;

#[cfg(test)]
mod tests;

#[cfg(test)]
extern crate std;

extern crate alloc;

// Panic handler for bare-metal
#[cfg(all(
    feature = "panic-handler",
    target_arch = "arm",
    target_os = "none",
    not(test)
))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    // On panic, disable interrupts and halt
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}

// ============================================================================
// Public API
// ============================================================================

// Architecture abstraction
pub use arch::{Arch, DefaultArch, Entry};

// Configuration
pub use config::KernelConfig;

// Kernel
pub use kernel::Kernel;

// Scheduler
pub use sched::select_next;

// Threads
pub use thread::{ThreadName, ThreadState};

// Synchronization
pub use sync::{Queue, Semaphore, Suspend};

// Time
pub use time::{Tick, TickSource};

// Errors
pub use errors::{
    ConfigError, KernelError, KernelResult, NameError, QueueError, QueueFull, SpawnError, StartError,
    SuspendError,
};
