//! Memory management for thread stacks.

pub mod stack;

pub use stack::{Stack, MIN_STACK_WORDS, STACK_CANARY};
