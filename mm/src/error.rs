//! Error type for the memory subsystem.

use core::fmt;

/// Failure modes of the block allocator.
///
/// The integer codes are ABI: `free` reports them through the syscall
/// result register, so their values must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmError {
    /// Catch-all failure.
    Failed,
    /// A null address was passed to `free`.
    AddressNull,
    /// The address is not block-aligned, so it never came from `alloc`.
    NotAligned,
    /// No live allocation is recorded at this address; covers untracked
    /// addresses and double frees alike.
    NotUsed,
}

impl MmError {
    /// Stable ABI code; success is 0.
    pub const fn to_code(self) -> i64 {
        match self {
            Self::Failed => -1,
            Self::AddressNull => -2,
            Self::NotAligned => -3,
            Self::NotUsed => -4,
        }
    }
}

impl fmt::Display for MmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => write!(f, "allocator operation failed"),
            Self::AddressNull => write!(f, "null address"),
            Self::NotAligned => write!(f, "address not block-aligned"),
            Self::NotUsed => write!(f, "no allocation recorded at address"),
        }
    }
}

/// Convenience result type for allocator operations.
pub type MmResult<T = ()> = Result<T, MmError>;
