//! Thread control blocks and the fixed-slot thread table.

use core::ffi::c_void;
use core::ptr;

use rvos_abi::context::Context;
use rvos_abi::layout::DEFAULT_TIME_SLICE;
use rvos_abi::task::{
    INVALID_SEM_ID, INVALID_THREAD_ID, MAIN_THREAD_ID, MAX_THREADS, SemId, ThreadId, ThreadStatus,
};

use crate::queue::QueueTag;

/// Entry point of a thread, invoked through the trampoline.
pub type ThreadBody = fn(*mut c_void);

/// What to do for a parked thread when it is woken: the deferred half of
/// a blocking syscall, completed by writing into the saved context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingOp {
    None,
    /// Plain semaphore wait (also join): result 0, or −1 if interrupted.
    SemResult,
    /// Console read: pop a byte from the input buffer into `a0`.
    GetByte,
    /// Console write: push the byte into the output buffer.
    PutByte(u8),
}

/// One thread's kernel record. Slots with status `Invalid` are free.
pub struct Tcb {
    pub context: Context,
    pub status: ThreadStatus,
    /// Which intrusive list this TCB is on, if any. A TCB is on at most
    /// one list at a time; list operations check this tag.
    pub queue_tag: QueueTag,
    pub next: ThreadId,
    pub prev: ThreadId,
    /// Ticks to sleep beyond the predecessor in the sleep queue.
    pub sleep_for: i64,
    pub time_slice: u64,
    /// Set when a semaphore close released this thread from a wait.
    pub interrupted: bool,
    pub pending: PendingOp,
    pub body: Option<ThreadBody>,
    pub arg: *mut c_void,
    /// Top of the caller-supplied unprivileged stack.
    pub usr_stack_top: u64,
    /// Base of the allocator-backed privileged stack.
    pub sys_stack: u64,
    pub join_sem: SemId,
}

impl Tcb {
    pub const fn empty() -> Self {
        Self {
            context: Context::zeroed(),
            status: ThreadStatus::Invalid,
            queue_tag: QueueTag::None,
            next: INVALID_THREAD_ID,
            prev: INVALID_THREAD_ID,
            sleep_for: 0,
            time_slice: DEFAULT_TIME_SLICE,
            interrupted: false,
            pending: PendingOp::None,
            body: None,
            arg: ptr::null_mut(),
            usr_stack_top: 0,
            sys_stack: 0,
            join_sem: INVALID_SEM_ID,
        }
    }
}

pub struct ThreadTable {
    slots: [Tcb; MAX_THREADS],
}

impl ThreadTable {
    /// Fresh table with the main thread live in slot 0, already Running.
    /// Its stacks and join semaphore are filled in by kernel init.
    pub fn new() -> Self {
        let mut table = Self {
            slots: [const { Tcb::empty() }; MAX_THREADS],
        };
        table.slots[MAIN_THREAD_ID as usize].status = ThreadStatus::Running;
        table
    }

    pub fn tcb(&self, id: ThreadId) -> &Tcb {
        &self.slots[id as usize]
    }

    pub fn tcb_mut(&mut self, id: ThreadId) -> &mut Tcb {
        &mut self.slots[id as usize]
    }

    pub fn is_live(&self, id: ThreadId) -> bool {
        (id as usize) < MAX_THREADS && self.slots[id as usize].status != ThreadStatus::Invalid
    }

    /// Claim a free slot, leaving it Initializing.
    pub fn claim_slot(&mut self) -> Option<ThreadId> {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.status == ThreadStatus::Invalid {
                *slot = Tcb::empty();
                slot.status = ThreadStatus::Initializing;
                return Some(idx as ThreadId);
            }
        }
        None
    }

    pub fn release_slot(&mut self, id: ThreadId) {
        self.slots[id as usize] = Tcb::empty();
    }

    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|t| t.status != ThreadStatus::Invalid)
            .count()
    }
}
