//! Syscall code definitions (privilege-boundary ABI).
//!
//! This module is the **single source of truth** for the numeric operation
//! codes accepted by the trap dispatcher. Userland marshaling wrappers and
//! the kernel both import from here.
//!
//! # Calling convention
//!
//! The code travels in `a0`, arguments in `a1..a4`, and the result comes
//! back in `a0` of the caller's restored context. Every operation uses the
//! same result convention: [`SYSCALL_SUCCESS`] on success,
//! [`SYSCALL_FAILED`] on failure. Two exceptions are documented on their
//! codes: allocate returns an address (0 when out of memory) and free
//! returns the allocator's distinct error codes.

// =============================================================================
// Memory
// =============================================================================

/// Allocate a run of heap blocks. a1 = block count, a0 ← address or 0.
pub const SYSCALL_MEM_ALLOC: u64 = 0x01;
/// Free a previous allocation. a1 = address, a0 ← allocator error code.
pub const SYSCALL_MEM_FREE: u64 = 0x02;

// =============================================================================
// Threads
// =============================================================================

/// Create a thread. a1 = handle out-pointer, a2 = body, a3 = argument,
/// a4 = user stack top.
pub const SYSCALL_THREAD_CREATE: u64 = 0x11;
/// Terminate the calling thread (rejected for the main thread).
pub const SYSCALL_THREAD_EXIT: u64 = 0x12;
/// Voluntarily give up the processor.
pub const SYSCALL_THREAD_DISPATCH: u64 = 0x13;
/// Block until the thread in a1 exits.
pub const SYSCALL_THREAD_JOIN: u64 = 0x14;

// =============================================================================
// Semaphores
// =============================================================================

/// Create a semaphore. a1 = handle out-pointer, a2 = initial counter.
pub const SYSCALL_SEM_OPEN: u64 = 0x21;
/// Close and release a semaphore, waking all waiters with failure.
pub const SYSCALL_SEM_CLOSE: u64 = 0x22;
/// P operation; may suspend the caller.
pub const SYSCALL_SEM_WAIT: u64 = 0x23;
/// V operation; wakes the longest-waiting thread if any.
pub const SYSCALL_SEM_SIGNAL: u64 = 0x24;

// =============================================================================
// Time
// =============================================================================

/// Suspend the caller for a1 timer ticks (a1 must be > 0).
pub const SYSCALL_TIME_SLEEP: u64 = 0x31;

// =============================================================================
// Console
// =============================================================================

/// Blocking read of one byte from the input buffer. a0 ← the byte.
pub const SYSCALL_GET_BYTE: u64 = 0x41;
/// Blocking write of one byte (a1) into the output buffer.
pub const SYSCALL_PUT_BYTE: u64 = 0x42;

// =============================================================================
// Privilege
// =============================================================================

/// Drop the calling context to user privilege on trap return.
pub const SYSCALL_USER_MODE: u64 = 0xFF;

/// Result written to a0 when an operation succeeds.
pub const SYSCALL_SUCCESS: i64 = 0;
/// Result written to a0 when an operation fails; also the default the
/// dispatcher installs before decoding the code.
pub const SYSCALL_FAILED: i64 = -1;
