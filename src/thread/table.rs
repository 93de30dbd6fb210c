//! Fixed-capacity thread table.
//!
//! `N` application slots are handed out by a monotonic bump allocator in
//! creation order. Slot `N` is reserved for the idle thread, which is
//! generated automatically when the last application slot is filled.

use super::{ThreadControl, ThreadName, ThreadState};
use crate::arch::{idle_loop, Arch, Entry};
use crate::errors::SpawnError;
use crate::mem::Stack;

/// Arena of thread control records and their stacks.
pub struct ThreadTable<A: Arch, const N: usize, const W: usize> {
    slots: [Option<ThreadControl<A::Context>>; N],
    idle: Option<ThreadControl<A::Context>>,
    stacks: [Stack<W>; N],
    idle_stack: Stack<W>,
    /// Slots handed out so far
    created: usize,
    /// Slot whose code currently owns the processor
    on_cpu: Option<usize>,
}

impl<A: Arch, const N: usize, const W: usize> ThreadTable<A, N, W> {
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; N],
            idle: None,
            stacks: [const { Stack::new() }; N],
            idle_stack: Stack::new(),
            created: 0,
            on_cpu: None,
        }
    }

    /// Index of the idle slot.
    pub const fn idle_slot(&self) -> usize {
        N
    }

    /// Number of application slots populated.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Whether every application slot (and therefore the idle slot) exists.
    pub fn is_complete(&self) -> bool {
        self.created == N && self.idle.is_some()
    }

    /// Populate the next application slot.
    ///
    /// Returns the slot index. Filling the last slot also generates the idle
    /// thread record.
    pub fn allocate(
        &mut self,
        name: ThreadName,
        entry: Entry,
        priority: u8,
    ) -> Result<usize, SpawnError> {
        if self.created >= N {
            return Err(SpawnError::TableFull);
        }
        if self.find(name.as_str()).is_some() {
            return Err(SpawnError::NameTaken);
        }

        let slot = self.created;
        let stack = &mut self.stacks[slot];
        stack.install_canary();
        let context = A::initialize_context(stack.words_mut(), entry);
        self.slots[slot] = Some(ThreadControl::new(Some(name), priority, entry, context));
        self.created += 1;

        if self.created == N {
            self.generate_idle();
        }
        Ok(slot)
    }

    fn generate_idle(&mut self) {
        let entry: Entry = idle_loop::<A>;
        self.idle_stack.install_canary();
        let context = A::initialize_context(self.idle_stack.words_mut(), entry);
        self.idle = Some(ThreadControl::new(None, crate::sched::priority::IDLE, entry, context));
        log::debug!(target: "kernel::thread", "idle thread generated in slot {}", N);
    }

    /// Slot of the application thread named `name` (exact match).
    pub fn find(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(record) if record.name() == Some(name)))
    }

    /// Record in `slot`, where slot `N` is the idle thread.
    pub fn get(&self, slot: usize) -> Option<&ThreadControl<A::Context>> {
        if slot == N {
            self.idle.as_ref()
        } else {
            self.slots.get(slot)?.as_ref()
        }
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut ThreadControl<A::Context>> {
        if slot == N {
            self.idle.as_mut()
        } else {
            self.slots.get_mut(slot)?.as_mut()
        }
    }

    /// Application slots in index order (the idle slot is excluded).
    pub fn application_slots(&self) -> &[Option<ThreadControl<A::Context>>] {
        &self.slots
    }

    /// Iterate mutably over every populated record, idle last.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut ThreadControl<A::Context>> {
        self.slots.iter_mut().flatten().chain(self.idle.as_mut())
    }

    /// Slot currently marked `Running`, if any.
    pub fn running(&self) -> Option<usize> {
        (0..=N).find(|&slot| matches!(self.get(slot), Some(r) if r.state() == ThreadState::Running))
    }

    pub fn on_cpu(&self) -> Option<usize> {
        self.on_cpu
    }

    pub(crate) fn set_on_cpu(&mut self, slot: usize) {
        self.on_cpu = Some(slot);
    }

    /// Whether the stack canary of `slot` is intact.
    pub fn stack_intact(&self, slot: usize) -> bool {
        if slot == N {
            self.idle.is_some() && self.idle_stack.check_canary()
        } else {
            self.slots.get(slot).is_some_and(Option::is_some) && self.stacks[slot].check_canary()
        }
    }
}

impl<A: Arch, const N: usize, const W: usize> Default for ThreadTable<A, N, W> {
    fn default() -> Self {
        Self::new()
    }
}
