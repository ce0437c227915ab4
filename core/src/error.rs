//! Error type for kernel operations.

use core::fmt;

/// Failure modes of thread, semaphore, and console operations. The trap
/// layer folds these into the −1 syscall result; inside the kernel they
/// stay distinguishable for logging and unwinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// The thread table is full.
    NoThreadSlot,
    /// The semaphore table is full.
    NoSemSlot,
    /// The block allocator could not satisfy a kernel allocation.
    OutOfMemory,
    /// A handle does not name a live thread or semaphore.
    InvalidHandle,
    /// A required argument was null or zero.
    InvalidArgument,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoThreadSlot => write!(f, "thread table full"),
            Self::NoSemSlot => write!(f, "semaphore table full"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::InvalidHandle => write!(f, "invalid handle"),
            Self::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

pub type KernelResult<T = ()> = Result<T, KernelError>;
