//! Error types for kernel operations.
//!
//! Every condition here is local and recoverable: it is returned to the
//! immediate caller and never unwinds across thread boundaries. The only
//! conditions that stop the kernel are start-up misconfigurations reported by
//! [`StartError`].

#![allow(clippy::uninlined_format_args)]

use core::fmt;

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Umbrella error type for all kernel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Thread creation errors
    Spawn(SpawnError),
    /// Voluntary suspension errors
    Suspend(SuspendError),
    /// Kernel start-up errors
    Start(StartError),
    /// Timing configuration errors
    Config(ConfigError),
    /// Bounded queue errors
    Queue(QueueError),
}

/// Errors that can occur when creating a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// Every application slot is already populated
    TableFull,
    /// Another thread already uses this identifier
    NameTaken,
    /// Threads cannot be created once the kernel is running
    AlreadyStarted,
    /// The identifier cannot be stored in a thread record
    InvalidName(NameError),
}

/// Errors produced when validating a thread identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// Identifier is the empty string
    Empty,
    /// Identifier does not fit in the bounded label
    TooLong { len: usize, capacity: usize },
}

/// Errors that can occur when a thread asks to be suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendError {
    /// The kernel has not dispatched any thread yet
    NotStarted,
    /// The idle thread never suspends
    IdleThread,
    /// The thread owning the CPU is no longer marked running
    NotRunning,
}

/// Errors that abort kernel start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    /// The kernel was configured with zero application threads
    NoThreads,
    /// Not every application slot has been populated
    Incomplete { created: usize, capacity: usize },
    /// `start` was already called
    AlreadyStarted,
    /// Timing configuration cannot be programmed
    Config(ConfigError),
}

/// Timing configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Tick source clock of 0 Hz
    ZeroFrequency,
    /// Quantum of 0 ms
    ZeroQuantum,
    /// Quantum length in cycles does not fit the reload register
    ReloadOutOfRange(u64),
}

/// Bounded queue errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// A queue must hold at least one element
    ZeroLength,
    /// Backing storage could not be allocated
    AllocationFailed,
    /// Every slot is occupied
    Full,
    /// No element is stored
    Empty,
}

/// A write into a full queue; carries the rejected value back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull<T>(pub T);

impl<T> QueueFull<T> {
    /// Recover the value that could not be written.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Spawn(e) => write!(f, "Thread spawn error: {}", e),
            KernelError::Suspend(e) => write!(f, "Suspend error: {}", e),
            KernelError::Start(e) => write!(f, "Kernel start error: {}", e),
            KernelError::Config(e) => write!(f, "Configuration error: {}", e),
            KernelError::Queue(e) => write!(f, "Queue error: {}", e),
        }
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnError::TableFull => write!(f, "All thread slots are in use"),
            SpawnError::NameTaken => write!(f, "Thread identifier already in use"),
            SpawnError::AlreadyStarted => write!(f, "Kernel already started"),
            SpawnError::InvalidName(e) => write!(f, "Invalid thread identifier: {}", e),
        }
    }
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "identifier is empty"),
            NameError::TooLong { len, capacity } => {
                write!(f, "identifier is {} bytes, at most {} allowed", len, capacity)
            }
        }
    }
}

impl fmt::Display for SuspendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspendError::NotStarted => write!(f, "Kernel has not started"),
            SuspendError::IdleThread => write!(f, "The idle thread cannot suspend"),
            SuspendError::NotRunning => write!(f, "Caller is not the running thread"),
        }
    }
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartError::NoThreads => write!(f, "Kernel configured with zero threads"),
            StartError::Incomplete { created, capacity } => {
                write!(f, "Only {} of {} threads created", created, capacity)
            }
            StartError::AlreadyStarted => write!(f, "Kernel already started"),
            StartError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroFrequency => write!(f, "Tick source frequency is zero"),
            ConfigError::ZeroQuantum => write!(f, "Quantum length is zero"),
            ConfigError::ReloadOutOfRange(cycles) => {
                write!(f, "Quantum of {} cycles does not fit the reload register", cycles)
            }
        }
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::ZeroLength => write!(f, "Queue length must be non-zero"),
            QueueError::AllocationFailed => write!(f, "Queue storage allocation failed"),
            QueueError::Full => write!(f, "Queue is full"),
            QueueError::Empty => write!(f, "Queue is empty"),
        }
    }
}

impl<T> fmt::Display for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Queue is full")
    }
}

// Conversion implementations for ergonomic error handling

impl From<SpawnError> for KernelError {
    fn from(error: SpawnError) -> Self {
        KernelError::Spawn(error)
    }
}

impl From<SuspendError> for KernelError {
    fn from(error: SuspendError) -> Self {
        KernelError::Suspend(error)
    }
}

impl From<StartError> for KernelError {
    fn from(error: StartError) -> Self {
        KernelError::Start(error)
    }
}

impl From<ConfigError> for KernelError {
    fn from(error: ConfigError) -> Self {
        KernelError::Config(error)
    }
}

impl From<QueueError> for KernelError {
    fn from(error: QueueError) -> Self {
        KernelError::Queue(error)
    }
}

impl From<NameError> for SpawnError {
    fn from(error: NameError) -> Self {
        SpawnError::InvalidName(error)
    }
}

impl From<ConfigError> for StartError {
    fn from(error: ConfigError) -> Self {
        StartError::Config(error)
    }
}

impl<T> From<QueueFull<T>> for QueueError {
    fn from(_: QueueFull<T>) -> Self {
        QueueError::Full
    }
}

impl<T> From<QueueFull<T>> for KernelError {
    fn from(_: QueueFull<T>) -> Self {
        KernelError::Queue(QueueError::Full)
    }
}
