//! Kernel: thread lifecycle, tick handling, and rescheduling.
//!
//! This module provides the main `Kernel` struct. All mutation of the thread
//! table happens inside a critical section; the tick counter is advanced only
//! from the tick interrupt.

use crate::arch::{Arch, Entry};
use crate::config::{KernelConfig, DEFAULT_STACK_WORDS};
use crate::errors::{SpawnError, StartError, SuspendError};
use crate::mem::MIN_STACK_WORDS;
use crate::sched::select_next;
use crate::sync::Suspend;
use crate::thread::{ThreadName, ThreadState, ThreadTable};
use crate::time::{Tick, TickCounter, TickSource};
use core::cell::RefCell;
use core::marker::PhantomData;
use critical_section::{CriticalSection, Mutex};
use portable_atomic::{AtomicBool, Ordering};

/// Priority-preemptive kernel for a fixed population of `N` threads.
///
/// # Type Parameters
///
/// * `A` - Architecture implementation
/// * `T` - Periodic tick source
/// * `N` - Number of application threads
/// * `W` - Stack size of every thread, in 32-bit words
///
/// The kernel embeds all thread stacks. On hardware it must live in a
/// `static`, since saved contexts point into those stacks.
pub struct Kernel<A: Arch, T: TickSource, const N: usize, const W: usize = DEFAULT_STACK_WORDS> {
    table: Mutex<RefCell<ThreadTable<A, N, W>>>,
    ticks: TickCounter,
    tick_source: T,
    config: KernelConfig,
    /// Whether `start` has dispatched the first thread
    started: AtomicBool,
    /// A reschedule already chose the next thread; the pending interrupt
    /// must only swap contexts, not count a quantum
    switch_requested: AtomicBool,
    _arch: PhantomData<A>,
}

impl<A: Arch, T: TickSource, const N: usize, const W: usize> Kernel<A, T, N, W> {
    const STACK_FITS: () = assert!(W >= MIN_STACK_WORDS, "thread stacks are too small");

    /// Create a kernel with an empty thread table.
    pub const fn new(tick_source: T, config: KernelConfig) -> Self {
        let () = Self::STACK_FITS;
        Self {
            table: Mutex::new(RefCell::new(ThreadTable::new())),
            ticks: TickCounter::new(),
            tick_source,
            config,
            started: AtomicBool::new(false),
            switch_requested: AtomicBool::new(false),
            _arch: PhantomData,
        }
    }

    fn with_table<R>(&self, f: impl FnOnce(CriticalSection<'_>, &mut ThreadTable<A, N, W>) -> R) -> R {
        critical_section::with(|cs| f(cs, &mut self.table.borrow_ref_mut(cs)))
    }

    /// Create a thread in the next free slot.
    ///
    /// The thread starts `Ready` and, when first dispatched, runs `entry`.
    /// Creating the `N`-th thread also generates the idle thread.
    ///
    /// # Returns
    ///
    /// The slot index of the new thread.
    pub fn create(&self, name: &str, entry: Entry, priority: u8) -> Result<usize, SpawnError> {
        if self.is_started() {
            return Err(SpawnError::AlreadyStarted);
        }
        let name = ThreadName::new(name)?;

        let slot = self.with_table(|_, table| table.allocate(name.clone(), entry, priority))?;
        log::debug!(target: "kernel::thread", "created {} in slot {} (priority {})", name, slot, priority);
        Ok(slot)
    }

    /// Start the kernel.
    ///
    /// Selects the first thread, marks it running, and arms the periodic tick
    /// interrupt. Returns the context the trampoline must launch.
    pub fn start(&self) -> Result<A::Context, StartError> {
        if N == 0 {
            log::error!(target: "kernel", "no application threads configured");
            return Err(StartError::NoThreads);
        }
        let reload = self.config.reload_value().map_err(|e| {
            log::error!(target: "kernel", "invalid timing configuration: {}", e);
            StartError::from(e)
        })?;

        let context = self.with_table(|_, table| {
            if !table.is_complete() {
                return Err(StartError::Incomplete { created: table.created(), capacity: N });
            }
            if self.started.swap(true, Ordering::AcqRel) {
                return Err(StartError::AlreadyStarted);
            }
            let first = select_next(table.application_slots(), table.idle_slot());
            table.set_on_cpu(first);
            let record = table.get_mut(first).ok_or(StartError::NoThreads)?;
            record.set_state(ThreadState::Running);
            log::info!(target: "kernel", "starting with slot {}", first);
            Ok(record.context.clone())
        })?;

        self.tick_source.arm_periodic_interrupt(reload);
        Ok(context)
    }

    /// Whether the kernel has been started.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Current tick count.
    pub fn ticks(&self) -> Tick {
        self.ticks.ticks()
    }

    /// Handle one quantum boundary.
    ///
    /// Wakes every suspended thread whose wake tick equals the current tick,
    /// then advances the counter, then reschedules. Returns the slot chosen to
    /// run, or `None` (and changes nothing) before the kernel has started.
    pub fn on_tick(&self) -> Option<usize> {
        if !self.is_started() {
            log::warn!(target: "kernel::sched", "tick before start ignored");
            return None;
        }
        let next = self.with_table(|_, table| {
            let now = self.ticks.ticks();
            for record in table.records_mut() {
                if record.state() == ThreadState::Suspended && record.wake_tick() == Some(now) {
                    record.set_state(ThreadState::Ready);
                }
            }
            self.ticks.increment();
            Self::reschedule_locked(table)
        });
        Some(next)
    }

    /// Choose the next thread and ask the trampoline to switch to it now.
    ///
    /// Returns the slot chosen to run, or `None` (and changes nothing) before
    /// the kernel has started.
    pub fn reschedule(&self) -> Option<usize> {
        if !self.is_started() {
            log::warn!(target: "kernel::sched", "reschedule before start ignored");
            return None;
        }
        let next = self.with_table(|_, table| Self::reschedule_locked(table));
        self.request_switch();
        Some(next)
    }

    fn reschedule_locked(table: &mut ThreadTable<A, N, W>) -> usize {
        // The outgoing thread competes again; idle is never left running
        // beside another selection
        for record in table.records_mut() {
            if record.state() == ThreadState::Running {
                record.set_state(ThreadState::Ready);
            }
        }
        let next = select_next(table.application_slots(), table.idle_slot());
        if let Some(record) = table.get_mut(next) {
            record.set_state(ThreadState::Running);
        }
        next
    }

    fn request_switch(&self) {
        self.switch_requested.store(true, Ordering::Release);
        if self.config.resync_on_forced_switch {
            self.tick_source.reset_countdown();
        }
        self.tick_source.force_immediate_interrupt();
    }

    /// Suspend the calling thread for `delay` quanta.
    ///
    /// A delay of 0 is a no-op. Otherwise the caller becomes `Suspended` until
    /// the tick counter reaches `now + delay` and an immediate switch is
    /// requested instead of waiting for the next quantum boundary.
    ///
    /// # Errors
    ///
    /// Fails if the kernel has not started, if called from the idle thread,
    /// or if the thread owning the processor is no longer marked running.
    pub fn suspend(&self, delay: u32) -> Result<(), SuspendError> {
        if delay == 0 {
            return Ok(());
        }
        if !self.is_started() {
            return Err(SuspendError::NotStarted);
        }

        let next = self.with_table(|_, table| {
            let caller = table.on_cpu().ok_or(SuspendError::NotStarted)?;
            if caller == table.idle_slot() {
                return Err(SuspendError::IdleThread);
            }
            let wake = self.ticks.deadline(delay);
            match table.get_mut(caller) {
                Some(record) if record.state() == ThreadState::Running => record.suspend_until(wake),
                _ => return Err(SuspendError::NotRunning),
            }
            log::trace!(target: "kernel::sched", "slot {} suspended until tick {}", caller, wake);
            Ok(Self::reschedule_locked(table))
        })?;

        log::trace!(target: "kernel::sched", "forced switch to slot {}", next);
        self.request_switch();
        Ok(())
    }

    /// Block the thread named `name` until it is resumed.
    ///
    /// Applies regardless of the thread's current state. An unknown name is
    /// silently ignored.
    pub fn block(&self, name: &str) {
        let found = self.with_table(|_, table| {
            let slot = table.find(name)?;
            table.get_mut(slot)?.set_state(ThreadState::Blocked);
            Some(slot)
        });
        match found {
            Some(slot) => log::debug!(target: "kernel::thread", "blocked {} (slot {})", name, slot),
            None => log::warn!(target: "kernel::thread", "block: no thread named {:?}", name),
        }
    }

    /// Make the thread named `name` ready again.
    ///
    /// Valid from any state and idempotent; the thread currently selected to
    /// run stays running. An unknown name is silently ignored.
    pub fn resume(&self, name: &str) {
        let found = self.with_table(|_, table| {
            let slot = table.find(name)?;
            let record = table.get_mut(slot)?;
            if record.state() != ThreadState::Running {
                record.set_state(ThreadState::Ready);
            }
            Some(slot)
        });
        match found {
            Some(slot) => log::debug!(target: "kernel::thread", "resumed {} (slot {})", name, slot),
            None => log::warn!(target: "kernel::thread", "resume: no thread named {:?}", name),
        }
    }

    /// Trampoline entry point, called with interrupts masked on every
    /// scheduling interrupt.
    ///
    /// `live` is the register state of the interrupted thread. A pending
    /// forced switch only swaps contexts; otherwise the interrupt counts as a
    /// quantum boundary and [`on_tick`](Self::on_tick) runs first. Returns the
    /// context to restore.
    pub fn switch_context(&self, live: A::Context) -> A::Context {
        if !self.is_started() {
            return live;
        }
        if !self.switch_requested.swap(false, Ordering::AcqRel) {
            self.on_tick();
        }

        self.with_table(|_, table| {
            let (Some(outgoing), Some(incoming)) = (table.on_cpu(), table.running()) else {
                return live;
            };
            if outgoing == incoming {
                return live;
            }
            let Some(next) = table.get(incoming).map(|r| r.context.clone()) else {
                return live;
            };
            let restored = match table.get_mut(outgoing) {
                Some(record) => A::swap_context(&mut record.context, live, &next),
                None => next,
            };
            table.set_on_cpu(incoming);
            restored
        })
    }

    /// Slot index reserved for the idle thread.
    pub const fn idle_slot(&self) -> usize {
        N
    }

    /// Number of application threads created so far.
    pub fn created(&self) -> usize {
        self.with_table(|_, table| table.created())
    }

    /// Slot currently marked running.
    pub fn running_slot(&self) -> Option<usize> {
        self.with_table(|_, table| table.running())
    }

    /// Slot whose code currently owns the processor.
    pub fn current_slot(&self) -> Option<usize> {
        self.with_table(|_, table| table.on_cpu())
    }

    /// Slot of the thread named `name`.
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.with_table(|_, table| table.find(name))
    }

    /// State of the thread in `slot`.
    pub fn state(&self, slot: usize) -> Option<ThreadState> {
        self.with_table(|_, table| table.get(slot).map(|r| r.state()))
    }

    /// State of the thread named `name`.
    pub fn state_of(&self, name: &str) -> Option<ThreadState> {
        self.with_table(|_, table| table.find(name).and_then(|slot| table.get(slot)).map(|r| r.state()))
    }

    /// Wake tick of the thread named `name`, while it is suspended.
    pub fn wake_tick_of(&self, name: &str) -> Option<Tick> {
        self.with_table(|_, table| table.find(name).and_then(|slot| table.get(slot)).and_then(|r| r.wake_tick()))
    }

    /// Priority of the thread in `slot`.
    pub fn priority(&self, slot: usize) -> Option<u8> {
        self.with_table(|_, table| table.get(slot).map(|r| r.priority()))
    }

    /// Saved context of the thread in `slot`.
    pub fn context(&self, slot: usize) -> Option<A::Context> {
        self.with_table(|_, table| table.get(slot).map(|r| r.context.clone()))
    }

    /// Whether the stack canary of `slot` is intact.
    pub fn stack_intact(&self, slot: usize) -> bool {
        self.with_table(|_, table| table.stack_intact(slot))
    }

    /// The tick source driving this kernel.
    pub fn tick_source(&self) -> &T {
        &self.tick_source
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }
}

impl<A: Arch, T: TickSource, const N: usize, const W: usize> Suspend for Kernel<A, T, N, W> {
    fn suspend(&self, quanta: u32) -> Result<(), SuspendError> {
        Kernel::suspend(self, quanta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::host::{HostArch, HostContext, HostTimer};
    use alloc::boxed::Box;
    use alloc::vec::Vec;

    type TestKernel = Kernel<HostArch, HostTimer, 3>;

    fn park() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    fn kernel() -> Box<TestKernel> {
        Box::new(Kernel::new(HostTimer::new(), KernelConfig::new()))
    }

    fn started(priorities: [u8; 3]) -> Box<TestKernel> {
        let k = kernel();
        for (i, prio) in priorities.iter().enumerate() {
            let name = ["t0", "t1", "t2"][i];
            k.create(name, park, *prio).unwrap();
        }
        k.start().unwrap();
        k
    }

    /// Emulate the trampoline delivering the pending interrupt.
    fn interrupt(k: &TestKernel) -> HostContext {
        k.switch_context(HostContext::default())
    }

    #[test]
    fn test_create_assigns_slots_and_idle() {
        let k = kernel();
        assert_eq!(k.create("a", park, 1), Ok(0));
        assert_eq!(k.create("b", park, 2), Ok(1));
        assert_eq!(k.state(3), None);
        assert_eq!(k.create("c", park, 3), Ok(2));

        assert_eq!(k.state(3), Some(ThreadState::Ready));
        assert_eq!(k.priority(3), Some(0));
        assert_eq!(k.create("d", park, 4), Err(SpawnError::TableFull));
        assert!((0..=3).all(|slot| k.stack_intact(slot)));
    }

    #[test]
    fn test_create_rejects_bad_names() {
        let k = kernel();
        assert!(matches!(k.create("", park, 1), Err(SpawnError::InvalidName(_))));
        assert!(matches!(k.create("0123456789abcdef", park, 1), Err(SpawnError::InvalidName(_))));
        k.create("x", park, 1).unwrap();
        assert_eq!(k.create("x", park, 1), Err(SpawnError::NameTaken));
        assert_eq!(k.created(), 1);
    }

    #[test]
    fn test_start_requires_full_table() {
        let k = kernel();
        k.create("a", park, 1).unwrap();
        assert_eq!(k.start(), Err(StartError::Incomplete { created: 1, capacity: 3 }));
        assert!(!k.is_started());
        assert_eq!(k.tick_source().armed_reload(), None);
    }

    #[test]
    fn test_start_rejects_zero_threads() {
        let k: Box<Kernel<HostArch, HostTimer, 0>> = Box::new(Kernel::new(HostTimer::new(), KernelConfig::new()));
        assert_eq!(k.start(), Err(StartError::NoThreads));
    }

    #[test]
    fn test_start_rejects_bad_config() {
        let k: Box<TestKernel> = Box::new(Kernel::new(HostTimer::new(), KernelConfig::new().quantum_ms(0)));
        for name in ["a", "b", "c"] {
            k.create(name, park, 1).unwrap();
        }
        assert!(matches!(k.start(), Err(StartError::Config(_))));
        assert!(!k.is_started());
    }

    #[test]
    fn test_start_dispatches_highest_priority() {
        let k = kernel();
        k.create("low", park, 1).unwrap();
        k.create("high", park, 7).unwrap();
        k.create("mid", park, 4).unwrap();

        let ctx = k.start().unwrap();
        assert_eq!(ctx, k.context(1).unwrap());
        assert_eq!(k.running_slot(), Some(1));
        assert_eq!(k.current_slot(), Some(1));
        assert_eq!(k.tick_source().armed_reload(), Some(1_599_999));
        assert_eq!(k.start(), Err(StartError::AlreadyStarted));
        assert_eq!(k.create("late", park, 1), Err(SpawnError::AlreadyStarted));
    }

    #[test]
    fn test_suspend_zero_is_noop() {
        let k = started([1, 2, 3]);
        assert_eq!(k.suspend(0), Ok(()));
        assert_eq!(k.state_of("t2"), Some(ThreadState::Running));
        assert_eq!(k.tick_source().forced_interrupts(), 0);
    }

    #[test]
    fn test_suspend_before_start_is_error() {
        let k = kernel();
        assert_eq!(k.suspend(5), Err(SuspendError::NotStarted));
    }

    #[test]
    fn test_suspend_forces_switch_without_ticking() {
        let k = started([1, 2, 3]);
        k.suspend(10).unwrap();

        assert_eq!(k.state_of("t2"), Some(ThreadState::Suspended));
        assert_eq!(k.wake_tick_of("t2"), Some(10));
        assert_eq!(k.running_slot(), Some(1));
        assert_eq!(k.tick_source().forced_interrupts(), 1);
        assert_eq!(k.tick_source().countdown_resets(), 1);

        let restored = interrupt(&k);
        assert_eq!(restored, k.context(1).unwrap());
        assert_eq!(k.current_slot(), Some(1));
        assert_eq!(k.ticks(), 0);
    }

    #[test]
    fn test_forced_switch_keeps_countdown_when_resync_disabled() {
        let k: Box<TestKernel> = Box::new(Kernel::new(
            HostTimer::new(),
            KernelConfig::new().resync_on_forced_switch(false),
        ));
        for name in ["a", "b", "c"] {
            k.create(name, park, 1).unwrap();
        }
        k.start().unwrap();
        k.suspend(1).unwrap();
        assert_eq!(k.tick_source().forced_interrupts(), 1);
        assert_eq!(k.tick_source().countdown_resets(), 0);
    }

    #[test]
    fn test_tick_and_reschedule_before_start_change_nothing() {
        let k = kernel();
        k.create("a", park, 1).unwrap();
        k.create("b", park, 3).unwrap();
        k.create("c", park, 2).unwrap();

        assert_eq!(k.on_tick(), None);
        assert_eq!(k.reschedule(), None);
        assert_eq!(k.ticks(), 0);
        assert_eq!(k.running_slot(), None);
        assert_eq!(k.tick_source().forced_interrupts(), 0);

        let ctx = k.start().unwrap();
        assert_eq!(ctx, k.context(1).unwrap());
        let running: Vec<usize> = (0..=3).filter(|&slot| k.state(slot) == Some(ThreadState::Running)).collect();
        assert_eq!(running, [1]);

        // First natural interrupt counts as a quantum
        interrupt(&k);
        assert_eq!(k.ticks(), 1);
    }

    #[test]
    fn test_reschedule_switches_to_highest_ready() {
        let k = started([1, 2, 3]);
        k.suspend(10).unwrap();
        interrupt(&k);
        assert_eq!(k.current_slot(), Some(1));

        k.resume("t2");
        let forced = k.tick_source().forced_interrupts();
        assert_eq!(k.reschedule(), Some(2));

        assert_eq!(k.state_of("t1"), Some(ThreadState::Ready));
        assert_eq!(k.state_of("t2"), Some(ThreadState::Running));
        assert_eq!(k.tick_source().forced_interrupts(), forced + 1);

        // The pending interrupt only swaps
        let restored = interrupt(&k);
        assert_eq!(restored, k.context(2).unwrap());
        assert_eq!(k.current_slot(), Some(2));
        assert_eq!(k.ticks(), 0);
    }

    #[test]
    fn test_switch_persists_outgoing_context() {
        let k = started([1, 2, 3]);
        k.suspend(3).unwrap();
        let live = HostContext { entry: 0xabc, stack_pointer: 0x1000, generation: 7 };
        k.switch_context(live);
        assert_eq!(k.context(2), Some(live));
    }

    #[test]
    fn test_natural_tick_counts_quantum() {
        let k = started([1, 2, 3]);
        let restored = interrupt(&k);
        assert_eq!(k.ticks(), 1);
        // Same thread keeps running: live context handed straight back
        assert_eq!(restored, HostContext::default());
        assert_eq!(k.running_slot(), Some(2));
    }

    #[test]
    fn test_idle_runs_when_all_suspended() {
        let k = started([1, 2, 3]);
        for _ in 0..3 {
            k.suspend(5).unwrap();
            interrupt(&k);
        }
        assert_eq!(k.running_slot(), Some(3));
        assert_eq!(k.current_slot(), Some(3));
        assert_eq!(k.suspend(1), Err(SuspendError::IdleThread));
    }

    #[test]
    fn test_block_and_resume() {
        let k = started([1, 2, 3]);
        k.block("t1");
        assert_eq!(k.state_of("t1"), Some(ThreadState::Blocked));

        // Never released by ticks
        for _ in 0..20 {
            k.on_tick();
        }
        assert_eq!(k.state_of("t1"), Some(ThreadState::Blocked));

        k.resume("t1");
        assert_eq!(k.state_of("t1"), Some(ThreadState::Ready));
    }

    #[test]
    fn test_block_clears_wake_tick() {
        let k = started([1, 2, 3]);
        k.suspend(4).unwrap();
        interrupt(&k);
        assert_eq!(k.wake_tick_of("t2"), Some(4));

        k.block("t2");
        assert_eq!(k.wake_tick_of("t2"), None);
        for _ in 0..10 {
            k.on_tick();
        }
        assert_eq!(k.state_of("t2"), Some(ThreadState::Blocked));
    }

    #[test]
    fn test_resume_wakes_suspended_early() {
        let k = started([1, 2, 3]);
        k.suspend(100).unwrap();
        interrupt(&k);

        k.resume("t2");
        assert_eq!(k.state_of("t2"), Some(ThreadState::Ready));
        assert_eq!(k.wake_tick_of("t2"), None);

        k.on_tick();
        assert_eq!(k.running_slot(), Some(2));
    }

    #[test]
    fn test_resume_keeps_running_thread_running() {
        let k = started([1, 2, 3]);
        k.resume("t2");
        assert_eq!(k.state_of("t2"), Some(ThreadState::Running));
        assert_eq!(k.running_slot(), Some(2));
    }

    #[test]
    fn test_blocking_running_thread_takes_effect_next_tick() {
        let k = started([1, 2, 3]);
        k.block("t2");
        assert_eq!(k.running_slot(), None);
        assert_eq!(k.current_slot(), Some(2));

        interrupt(&k);
        assert_eq!(k.running_slot(), Some(1));
        assert_eq!(k.current_slot(), Some(1));
        assert_eq!(k.state_of("t2"), Some(ThreadState::Blocked));
    }

    #[test]
    fn test_suspend_after_self_block_is_error() {
        let k = started([1, 2, 3]);
        k.block("t2");
        assert_eq!(k.suspend(5), Err(SuspendError::NotRunning));
    }

    #[test]
    fn test_unknown_names_change_nothing() {
        let k = started([1, 2, 3]);
        let before: [Option<ThreadState>; 4] = core::array::from_fn(|slot| k.state(slot));

        k.block("ghost");
        k.resume("ghost");
        k.block("");

        let after: [Option<ThreadState>; 4] = core::array::from_fn(|slot| k.state(slot));
        assert_eq!(before, after);
    }

    #[test]
    fn test_switch_before_start_is_passthrough() {
        let k = kernel();
        let live = HostContext { entry: 1, stack_pointer: 2, generation: 3 };
        assert_eq!(k.switch_context(live), live);
        assert_eq!(k.ticks(), 0);
    }
}
