//! Fixed-size thread stacks.
//!
//! Every thread record owns exactly one stack region for the lifetime of the
//! kernel. Regions are plain arrays embedded in the kernel value, so a kernel
//! placed in a `static` needs no allocator for its threads.

/// Value written at the lowest word of every stack for overflow detection.
pub const STACK_CANARY: u32 = 0xDEAD_BEEF;

/// Smallest stack able to hold an initial register frame plus the canary.
pub const MIN_STACK_WORDS: usize = 32;

/// A thread stack of `W` 32-bit words.
///
/// The stack grows downward: the initial stack pointer is the highest
/// 8-byte aligned address inside the region, the canary sits at the lowest.
#[repr(C, align(8))]
#[derive(Clone, Copy)]
pub struct Stack<const W: usize> {
    words: [u32; W],
}

impl<const W: usize> Stack<W> {
    /// A zero-filled stack.
    pub const fn new() -> Self {
        Self { words: [0; W] }
    }

    /// Backing words, lowest address first.
    pub fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    /// Install the overflow canary at the lowest word.
    pub fn install_canary(&mut self) {
        if let Some(first) = self.words.first_mut() {
            *first = STACK_CANARY;
        }
    }

    /// Check whether the canary is still intact.
    pub fn check_canary(&self) -> bool {
        self.words.first() == Some(&STACK_CANARY)
    }
}

impl<const W: usize> Default for Stack<W> {
    fn default() -> Self {
        Self::new()
    }
}
