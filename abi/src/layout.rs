//! Global memory-layout and timing configuration.
//!
//! Supplied here as named constants rather than scattered magic numbers;
//! the heap arena bounds themselves are passed to the allocator at boot.

/// Granularity of the heap. Every allocation is a whole number of blocks.
pub const MEM_BLOCK_SIZE: usize = 64;

/// Size of every thread stack, user and privileged alike.
pub const DEFAULT_STACK_SIZE: usize = 4096;

/// Timer ticks a thread may run before preemptive dispatch.
pub const DEFAULT_TIME_SLICE: u64 = 2;

/// Capacity of each console circular buffer, in bytes.
pub const IO_BUFFER_SIZE: usize = 2048;

/// Byte size of one instruction; the dispatcher steps sepc past the
/// trapping ecall by this much.
pub const INSTRUCTION_SIZE: u64 = 4;

/// Round a byte count up to whole heap blocks.
pub const fn to_blocks(n_bytes: usize) -> usize {
    n_bytes.div_ceil(MEM_BLOCK_SIZE)
}
