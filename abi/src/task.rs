//! Thread and semaphore handle types shared across the kernel.

/// Index handle into the thread table.
pub type ThreadId = u32;
/// Index handle into the semaphore table.
pub type SemId = u32;

/// Sentinel for "no thread"; never a valid table index.
pub const INVALID_THREAD_ID: ThreadId = u32::MAX;
/// Sentinel for "no semaphore".
pub const INVALID_SEM_ID: SemId = u32::MAX;

/// The kernel's own thread, created at boot and never reclaimed.
pub const MAIN_THREAD_ID: ThreadId = 0;

/// Capacity of the thread table.
pub const MAX_THREADS: usize = 64;
/// Capacity of the semaphore table.
pub const MAX_SEMAPHORES: usize = 128;

/// Lifecycle state of a thread control block.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadStatus {
    /// Slot is free.
    Invalid = 0,
    /// Created but not yet enqueued.
    Initializing,
    /// Waiting in the ready queue.
    Ready,
    /// The one thread whose context is live.
    Running,
    /// Parked on a semaphore or the sleep queue.
    Suspended,
    /// Exited; reclaimed by the next dispatch.
    Terminating,
}
