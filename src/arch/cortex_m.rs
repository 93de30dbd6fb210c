//! ARMv7-M port: SysTick tick source and the SysTick context-switch trampoline.
//!
//! Threads run in thread mode on the process stack (PSP). Every SysTick
//! exception, natural or pended by [`SysTickSource::force_immediate_interrupt`],
//! enters the trampoline, which saves r4-r11 below the hardware-stacked frame,
//! asks the installed kernel for the next stack pointer, and unwinds from it.
//!
//! A saved context is therefore just the thread's stack pointer:
//!
//! ```text
//! High Address
//! +-----------+
//! |   xPSR    |  hardware frame
//! |    PC     |
//! |    LR     |
//! |    R12    |
//! |  R3..R0   |
//! +-----------+
//! |  R11..R4  |  software frame
//! +-----------+ <- saved SP
//! Low Address
//! ```
//!
//! Floating-point state is not preserved; threads must not use the FPU.

use super::{Arch, Entry};
use crate::errors::StartError;
use crate::kernel::Kernel;
use crate::time::TickSource;
use core::arch::{asm, global_asm};
use core::convert::Infallible;
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::{SCB, SYST};
use spin::Once;

/// Words in the software-saved frame (r4-r11).
const SOFTWARE_FRAME_WORDS: usize = 8;

/// Words in the hardware-stacked exception frame.
const HARDWARE_FRAME_WORDS: usize = 8;

/// Initial xPSR: Thumb state.
const INITIAL_XPSR: u32 = 0x0100_0000;

/// Lowest configurable exception priority, so SysTick never preempts a
/// device interrupt handler.
const SYSTICK_PRIORITY: u8 = 0xE0;

const CSR_ENABLE: u32 = 1 << 0;
const CSR_TICKINT: u32 = 1 << 1;
const CSR_CLKSOURCE: u32 = 1 << 2;

/// Cortex-M architecture implementation.
pub struct CortexM;

impl Arch for CortexM {
    type Context = u32;

    fn initialize_context(stack: &mut [u32], entry: Entry) -> u32 {
        // AAPCS requires an 8-byte aligned stack on exception return
        let mut top = stack.len();
        if (stack.as_ptr() as usize + top * 4) % 8 != 0 {
            top -= 1;
        }
        let base = top - SOFTWARE_FRAME_WORDS - HARDWARE_FRAME_WORDS;
        let frame = &mut stack[base..top];

        frame.fill(0);
        let hw = SOFTWARE_FRAME_WORDS;
        frame[hw + 6] = (entry as usize as u32) & !1;
        frame[hw + 7] = INITIAL_XPSR;

        frame.as_ptr() as u32
    }

    fn wait_for_interrupt() {
        cortex_m::asm::wfi();
    }
}

/// SysTick driven as the kernel's periodic tick source.
pub struct SysTickSource;

impl SysTickSource {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for SysTickSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for SysTickSource {
    fn arm_periodic_interrupt(&self, reload: u32) {
        // SAFETY: SysTick is owned by the kernel once started; the register
        // block pointer is the architecturally fixed SYST address.
        unsafe {
            let syst = &*SYST::PTR;
            syst.csr.write(0);
            syst.rvr.write(reload);
            syst.cvr.write(0);
            let mut peripherals = cortex_m::Peripherals::steal();
            peripherals.SCB.set_priority(SystemHandler::SysTick, SYSTICK_PRIORITY);
            syst.csr.write(CSR_CLKSOURCE | CSR_TICKINT | CSR_ENABLE);
        }
    }

    fn force_immediate_interrupt(&self) {
        SCB::set_pendst();
    }

    fn reset_countdown(&self) {
        // SAFETY: any write clears the current value register and restarts
        // the countdown from the reload value.
        unsafe { (*SYST::PTR).cvr.write(0) }
    }
}

/// Kernel as seen by the trampoline.
pub trait SwitchHook: Sync {
    /// Persist `psp` for the outgoing thread and return the incoming one's.
    fn switch(&self, psp: u32) -> u32;
}

impl<T, const N: usize, const W: usize> SwitchHook for Kernel<CortexM, T, N, W>
where
    T: TickSource + Sync,
{
    fn switch(&self, psp: u32) -> u32 {
        self.switch_context(psp)
    }
}

static HOOK: Once<&'static dyn SwitchHook> = Once::new();

/// Register the kernel the SysTick trampoline dispatches to.
///
/// Only the first registration takes effect.
pub fn install(kernel: &'static dyn SwitchHook) {
    HOOK.call_once(|| kernel);
}

/// Install `kernel`, start it, and launch its first thread.
///
/// Never returns on success.
pub fn run<T, const N: usize, const W: usize>(
    kernel: &'static Kernel<CortexM, T, N, W>,
) -> Result<Infallible, StartError>
where
    T: TickSource + Sync + 'static,
{
    install(kernel);
    cortex_m::interrupt::disable();
    match kernel.start() {
        // SAFETY: the context was built by `initialize_context` over a stack
        // owned by the 'static kernel.
        Ok(context) => unsafe { launch(context) },
        Err(error) => {
            // SAFETY: re-enabling after the failed start above
            unsafe { cortex_m::interrupt::enable() };
            Err(error)
        }
    }
}

/// Switch to the process stack and jump into the thread whose initial
/// context is `sp`, discarding the prepared frames.
///
/// # Safety
///
/// `sp` must come from [`CortexM::initialize_context`] and interrupts must be
/// masked.
unsafe fn launch(sp: u32) -> ! {
    // SAFETY: guaranteed by the caller
    unsafe {
        asm!(
            "add r0, r0, #32",
            "ldr r1, [r0, #24]",
            "add r0, r0, #32",
            "msr psp, r0",
            "movs r2, #2",
            "msr control, r2",
            "isb",
            "orr r1, r1, #1",
            "cpsie i",
            "bx r1",
            in("r0") sp,
            options(noreturn),
        )
    }
}

#[no_mangle]
extern "C" fn priority_kernel_switch(psp: u32) -> u32 {
    match HOOK.get() {
        Some(kernel) => kernel.switch(psp),
        None => psp,
    }
}

// r3 is pushed only to keep MSP 8-byte aligned across the call
global_asm!(
    ".section .text.SysTick, \"ax\"",
    ".global SysTick",
    ".type SysTick, %function",
    ".thumb_func",
    "SysTick:",
    "    cpsid i",
    "    mrs r0, psp",
    "    stmdb r0!, {{r4-r11}}",
    "    push {{r3, lr}}",
    "    bl priority_kernel_switch",
    "    pop {{r3, lr}}",
    "    ldmia r0!, {{r4-r11}}",
    "    msr psp, r0",
    "    isb",
    "    cpsie i",
    "    bx lr",
);
