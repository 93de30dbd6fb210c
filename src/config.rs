//! Kernel configuration.
//!
//! Thread capacity and per-thread stack size are fixed at compile time through
//! the kernel's const generics; the timing parameters below are carried at
//! runtime in [`KernelConfig`] and validated when the kernel starts.

use crate::errors::ConfigError;

/// Default core clock feeding the tick source, in Hz.
pub const DEFAULT_CPU_HZ: u32 = 16_000_000;

/// Default scheduling quantum, in milliseconds.
pub const DEFAULT_QUANTUM_MS: u32 = 100;

/// Maximum length of a thread identifier, in bytes.
pub const THREAD_NAME_CAPACITY: usize = 15;

/// Default stack size per thread, in 32-bit words.
pub const DEFAULT_STACK_WORDS: usize = 100;

/// Default number of quanta a semaphore waiter sleeps between retries.
pub const DEFAULT_PEND_RETRY: u32 = 2;

/// Largest value the 24-bit SysTick reload register accepts.
pub const MAX_RELOAD: u32 = 0x00FF_FFFF;

/// Convert a duration in milliseconds to tick-source clock cycles.
pub const fn ms_to_cycles(ms: u32, cpu_hz: u32) -> u64 {
    (ms as u64 * cpu_hz as u64) / 1000
}

/// Runtime timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Clock driving the periodic tick source, in Hz.
    pub cpu_hz: u32,
    /// Length of one scheduling quantum, in milliseconds.
    pub quantum_ms: u32,
    /// Restart the quantum countdown whenever a thread forces a switch, so the
    /// incoming thread receives a full quantum.
    pub resync_on_forced_switch: bool,
}

impl KernelConfig {
    /// Configuration with the crate defaults.
    pub const fn new() -> Self {
        Self {
            cpu_hz: DEFAULT_CPU_HZ,
            quantum_ms: DEFAULT_QUANTUM_MS,
            resync_on_forced_switch: true,
        }
    }

    pub const fn cpu_hz(mut self, hz: u32) -> Self {
        self.cpu_hz = hz;
        self
    }

    pub const fn quantum_ms(mut self, ms: u32) -> Self {
        self.quantum_ms = ms;
        self
    }

    pub const fn resync_on_forced_switch(mut self, enabled: bool) -> Self {
        self.resync_on_forced_switch = enabled;
        self
    }

    /// Number of tick-source cycles in one quantum.
    pub const fn quantum_cycles(&self) -> u64 {
        ms_to_cycles(self.quantum_ms, self.cpu_hz)
    }

    /// Check that the configuration can be programmed into the tick source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cpu_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        if self.quantum_ms == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        let cycles = self.quantum_cycles();
        if cycles == 0 || cycles - 1 > MAX_RELOAD as u64 {
            return Err(ConfigError::ReloadOutOfRange(cycles));
        }
        Ok(())
    }

    /// Reload value for a down-counting timer that fires once per quantum.
    pub fn reload_value(&self) -> Result<u32, ConfigError> {
        self.validate()?;
        Ok((self.quantum_cycles() - 1) as u32)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
