//! Counting semaphores with FIFO wake order.
//!
//! Semaphores live in a fixed slot table addressed by `SemId`. The wait
//! path parks the caller with a recorded [`PendingOp`]; signal and close
//! complete that operation against the parked thread's saved context
//! before handing it back to the scheduler.

use rvos_abi::task::{MAX_SEMAPHORES, SemId};

use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::platform::Platform;
use crate::queue::{QueueTag, ThreadList};
use crate::thread::PendingOp;

pub struct Semaphore {
    pub value: i64,
    /// Once set, every released waiter observes a failed wait. Never
    /// cleared for the lifetime of the slot.
    pub closing: bool,
    pub in_use: bool,
    /// Held by the kernel for its own use (console backpressure and
    /// availability, join). The close syscall refuses these; only kernel
    /// paths may close or release them.
    pub kernel_owned: bool,
    pub waiters: ThreadList,
}

impl Semaphore {
    const fn empty() -> Self {
        Self {
            value: 0,
            closing: false,
            in_use: false,
            kernel_owned: false,
            waiters: ThreadList::new(QueueTag::None),
        }
    }
}

pub struct SemTable {
    slots: [Semaphore; MAX_SEMAPHORES],
}

impl SemTable {
    pub fn new() -> Self {
        Self {
            slots: [const { Semaphore::empty() }; MAX_SEMAPHORES],
        }
    }

    pub fn open(&mut self, initial: i64) -> KernelResult<SemId> {
        self.open_slot(initial, false)
    }

    /// Open a semaphore the kernel keeps for itself.
    pub fn open_kernel(&mut self, initial: i64) -> KernelResult<SemId> {
        self.open_slot(initial, true)
    }

    fn open_slot(&mut self, initial: i64, kernel_owned: bool) -> KernelResult<SemId> {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if !slot.in_use {
                *slot = Semaphore {
                    value: initial,
                    closing: false,
                    in_use: true,
                    kernel_owned,
                    waiters: ThreadList::new(QueueTag::Waiters(idx as SemId)),
                };
                return Ok(idx as SemId);
            }
        }
        Err(KernelError::NoSemSlot)
    }

    /// Free the slot. The waiter list must already be empty; `close`
    /// guarantees that.
    pub fn release(&mut self, id: SemId) {
        self.slots[id as usize] = Semaphore::empty();
    }

    pub fn is_live(&self, id: SemId) -> bool {
        (id as usize) < MAX_SEMAPHORES && self.slots[id as usize].in_use
    }

    pub fn slot(&self, id: SemId) -> &Semaphore {
        &self.slots[id as usize]
    }

    pub fn slot_mut(&mut self, id: SemId) -> &mut Semaphore {
        &mut self.slots[id as usize]
    }
}

impl<P: Platform> Kernel<P> {
    pub fn sem_open(&mut self, initial: i64) -> KernelResult<SemId> {
        self.sems.open(initial)
    }

    /// Decrement the counter; park the current thread when it goes
    /// negative, otherwise complete `pending` in place.
    pub fn sem_wait(&mut self, id: SemId, pending: PendingOp) {
        let sem = self.sems.slot_mut(id);
        sem.value -= 1;

        if sem.value < 0 {
            let current = self.current;
            {
                let tcb = self.threads.tcb_mut(current);
                tcb.status = rvos_abi::task::ThreadStatus::Suspended;
                tcb.pending = pending;
            }
            if !self
                .sems
                .slot_mut(id)
                .waiters
                .push_back(&mut self.threads, current)
            {
                rvos_lib::klog_error!("SEM: thread {} already queued", current);
            }
            self.dispatch();
        } else {
            let current = self.current;
            {
                let tcb = self.threads.tcb_mut(current);
                tcb.interrupted = false;
                tcb.pending = pending;
            }
            self.complete_pending(current);
        }
    }

    /// Increment the counter; a non-positive result means somebody was
    /// waiting, so release the head of the list.
    pub fn sem_signal(&mut self, id: SemId) {
        let sem = self.sems.slot_mut(id);
        sem.value += 1;
        if sem.value <= 0 {
            let _ = self.sem_unblock(id);
        }
    }

    /// Mark the semaphore closing and release every waiter with a failed
    /// wait result.
    pub fn sem_close(&mut self, id: SemId) {
        self.sems.slot_mut(id).closing = true;
        while self.sem_unblock(id) {}
    }

    /// Pop one waiter, transfer the closing flag into its interrupted
    /// flag, complete its pending operation, and make it Ready.
    fn sem_unblock(&mut self, id: SemId) -> bool {
        let waiter = self
            .sems
            .slot_mut(id)
            .waiters
            .pop_front(&mut self.threads);
        let Some(waiter) = waiter else {
            return false;
        };

        let closing = self.sems.slot(id).closing;
        self.threads.tcb_mut(waiter).interrupted = closing;
        self.complete_pending(waiter);
        self.ready_put(waiter);
        true
    }
}
