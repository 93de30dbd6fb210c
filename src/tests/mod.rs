//! Host test suites that drive the kernel through simulated interrupts.

mod helpers;
