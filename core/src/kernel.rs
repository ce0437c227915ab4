//! The kernel state machine.
//!
//! One `Kernel` value owns every subsystem: allocator, thread table,
//! semaphore table, ready queue, sleep queue, and console. It is built
//! once at boot and driven exclusively through [`Kernel::handle_trap`]
//! (plus the flush path the output thread runs). All state transitions
//! happen against *saved* contexts; the hardware side of a context
//! switch belongs to the boot crate below the [`Platform`] seam.

use core::ffi::c_void;

use rvos_abi::context::{Context, SstatusFlags};
use rvos_abi::layout::{DEFAULT_STACK_SIZE, DEFAULT_TIME_SLICE, IO_BUFFER_SIZE, to_blocks};
use rvos_abi::syscall::{SYSCALL_FAILED, SYSCALL_SUCCESS};
use rvos_abi::task::{
    INVALID_SEM_ID, MAIN_THREAD_ID, ThreadId, ThreadStatus,
};
use rvos_lib::{klog_debug, klog_error, klog_info, klog_warn};
use rvos_mm::BlockAllocator;

use crate::console::Console;
use crate::error::{KernelError, KernelResult};
use crate::platform::Platform;
use crate::queue::{QueueTag, ThreadList};
use crate::sem::SemTable;
use crate::sleep::SleepList;
use crate::thread::{PendingOp, Tcb, ThreadBody, ThreadTable};

pub struct Kernel<P: Platform> {
    pub platform: P,
    pub(crate) alloc: BlockAllocator,
    pub(crate) threads: ThreadTable,
    pub(crate) sems: SemTable,
    pub(crate) ready: ThreadList,
    pub(crate) sleep: SleepList,
    pub(crate) console: Console,
    pub(crate) current: ThreadId,
    pub(crate) elapsed_ticks: u64,
    pub(crate) halted: bool,
}

// SAFETY: the raw pointers inside (allocator arena, thread arguments) are
// only dereferenced under the single kernel lock; the kernel moves between
// threads as one unit.
unsafe impl<P: Platform + Send> Send for Kernel<P> {}

impl<P: Platform> Kernel<P> {
    /// Bring the kernel up over the heap arena `[heap_start, heap_end)`.
    ///
    /// Order matters: the allocator first (everything else allocates from
    /// it), then the main TCB's privileged stack, the console semaphores,
    /// and finally the always-ready flush thread running `flush_body`.
    ///
    /// # Safety
    ///
    /// The arena must be valid, writable, and exclusively owned, per
    /// [`BlockAllocator::init`].
    pub unsafe fn init(
        platform: P,
        heap_start: *mut u8,
        heap_end: *mut u8,
        flush_body: ThreadBody,
    ) -> KernelResult<Self> {
        let alloc = unsafe { BlockAllocator::init(heap_start, heap_end) };

        let mut kernel = Self {
            platform,
            alloc,
            threads: ThreadTable::new(),
            sems: SemTable::new(),
            ready: ThreadList::new(QueueTag::Ready),
            sleep: SleepList::new(),
            console: Console::new(),
            current: MAIN_THREAD_ID,
            elapsed_ticks: 0,
            halted: false,
        };

        // The main thread's privileged stack, for completeness; the main
        // TCB itself is never reclaimed so this is never freed.
        let sys_stack = kernel
            .alloc
            .alloc(to_blocks(DEFAULT_STACK_SIZE) as u32)
            .ok_or(KernelError::OutOfMemory)? as u64;
        let main = kernel.threads.tcb_mut(MAIN_THREAD_ID);
        main.time_slice = DEFAULT_TIME_SLICE;
        main.sys_stack = sys_stack;
        main.context.sys_sp = sys_stack + DEFAULT_STACK_SIZE as u64;

        // Console semaphores: the empty output buffer has a full buffer's
        // worth of space, the empty input buffer has nothing to take.
        kernel.console.out_sem = kernel.sems.open_kernel(IO_BUFFER_SIZE as i64)?;
        kernel.console.in_sem = kernel.sems.open_kernel(0)?;

        kernel.spawn_flush_thread(flush_body)?;

        klog_info!("KERNEL: core up, {} threads live", kernel.threads.live_count());
        Ok(kernel)
    }

    /// Thread whose saved context the trap exit restores.
    pub fn current_thread(&self) -> ThreadId {
        self.current
    }

    /// Saved context of the current thread, for the trap entry/exit
    /// assembly.
    pub fn current_context_ptr(&mut self) -> *mut Context {
        &mut self.threads.tcb_mut(self.current).context
    }

    /// Body and argument of the current thread, for the trampoline.
    pub fn current_body(&self) -> Option<(ThreadBody, *mut c_void)> {
        let tcb = self.threads.tcb(self.current);
        tcb.body.map(|body| (body, tcb.arg))
    }

    /// Create a thread: claim a slot, allocate the privileged stack and
    /// the join semaphore, seed the initial context so the first restore
    /// lands in the trampoline. Failures unwind in reverse order.
    pub fn create_thread(
        &mut self,
        body: ThreadBody,
        arg: *mut c_void,
        user_stack_top: u64,
    ) -> KernelResult<ThreadId> {
        if user_stack_top == 0 {
            return Err(KernelError::InvalidArgument);
        }

        let id = self.threads.claim_slot().ok_or(KernelError::NoThreadSlot)?;

        let sys_stack = match self.alloc.alloc(to_blocks(DEFAULT_STACK_SIZE) as u32) {
            Some(stack) => stack as u64,
            None => {
                self.threads.release_slot(id);
                return Err(KernelError::OutOfMemory);
            }
        };

        let join_sem = match self.sems.open_kernel(0) {
            Ok(sem) => sem,
            Err(err) => {
                if let Err(mm_err) = self.alloc.free(sys_stack as *mut u8) {
                    klog_error!("THREAD: unwind stack free failed: {}", mm_err);
                }
                self.threads.release_slot(id);
                return Err(err);
            }
        };

        // The new context inherits the creator's sstatus with SPIE forced
        // on, so interrupts come back up after its first trap return.
        let sstatus =
            self.threads.tcb(self.current).context.sstatus | SstatusFlags::SPIE.bits();
        let trampoline = self.platform.trampoline_addr();

        let tcb = self.threads.tcb_mut(id);
        *tcb = Tcb::empty();
        tcb.status = ThreadStatus::Initializing;
        tcb.body = Some(body);
        tcb.arg = arg;
        tcb.usr_stack_top = user_stack_top;
        tcb.sys_stack = sys_stack;
        tcb.join_sem = join_sem;
        tcb.context.ra = trampoline;
        tcb.context.sepc = trampoline;
        tcb.context.usr_sp = user_stack_top;
        tcb.context.sys_sp = sys_stack + DEFAULT_STACK_SIZE as u64;
        tcb.context.tp = 0;
        tcb.context.sstatus = sstatus;

        klog_debug!("THREAD: created {}", id);
        Ok(id)
    }

    /// Reclaim an exited thread: user stack, privileged stack, join
    /// semaphore, then the slot. No-op for the main thread.
    pub(crate) fn destroy_thread(&mut self, id: ThreadId) {
        if id == MAIN_THREAD_ID {
            return;
        }

        let (usr_stack_top, sys_stack, join_sem) = {
            let tcb = self.threads.tcb(id);
            (tcb.usr_stack_top, tcb.sys_stack, tcb.join_sem)
        };

        if usr_stack_top != 0 {
            let base = usr_stack_top - DEFAULT_STACK_SIZE as u64;
            if let Err(err) = self.alloc.free(base as *mut u8) {
                klog_warn!("THREAD: user stack free failed: {}", err);
            }
        }
        if sys_stack != 0 {
            if let Err(err) = self.alloc.free(sys_stack as *mut u8) {
                klog_warn!("THREAD: privileged stack free failed: {}", err);
            }
        }
        if join_sem != INVALID_SEM_ID {
            self.sems.release(join_sem);
        }

        self.threads.release_slot(id);
        klog_debug!("THREAD: reclaimed {}", id);
    }

    /// Mark Ready and append to the ready queue.
    pub(crate) fn ready_put(&mut self, id: ThreadId) {
        if !self.threads.is_live(id) {
            return;
        }
        self.threads.tcb_mut(id).status = ThreadStatus::Ready;
        if !self.ready.push_back(&mut self.threads, id) {
            klog_error!("SCHED: thread {} already on a queue", id);
        }
    }

    /// The scheduling decision point. Re-queue or reclaim the current
    /// thread, then publish the ready-queue head as the new current.
    pub fn dispatch(&mut self) {
        let prev = self.current;
        match self.threads.tcb(prev).status {
            ThreadStatus::Running => self.ready_put(prev),
            ThreadStatus::Terminating => {
                // Closing the join semaphore releases every joiner with a
                // failed-wait result before the TCB goes away.
                let join_sem = self.threads.tcb(prev).join_sem;
                if join_sem != INVALID_SEM_ID {
                    self.sem_close(join_sem);
                }
                self.destroy_thread(prev);
            }
            // Suspended threads are already parked on a wait or sleep
            // list; nothing to requeue.
            _ => {}
        }

        let Some(next) = self.ready.pop_front(&mut self.threads) else {
            // The flush thread is always runnable, so this is a lost
            // wakeup, not a normal idle condition.
            klog_error!("SCHED: ready queue empty, thread {} keeps the core", prev);
            return;
        };

        self.threads.tcb_mut(next).status = ThreadStatus::Running;
        self.current = next;
        self.elapsed_ticks = 0;
        self.platform.context_switched(next);
    }

    /// Finish a (possibly deferred) blocking operation by writing its
    /// outcome into the thread's saved context. An interrupted wake
    /// always delivers failure.
    pub(crate) fn complete_pending(&mut self, id: ThreadId) {
        let pending = core::mem::replace(&mut self.threads.tcb_mut(id).pending, PendingOp::None);
        let interrupted = self.threads.tcb(id).interrupted;

        let result = match pending {
            PendingOp::None => return,
            _ if interrupted => SYSCALL_FAILED,
            PendingOp::SemResult => SYSCALL_SUCCESS,
            PendingOp::GetByte => match self.console.inp.try_pop() {
                Some(byte) => byte as i64,
                None => SYSCALL_FAILED,
            },
            PendingOp::PutByte(byte) => {
                if self.console.out.try_push(byte) {
                    SYSCALL_SUCCESS
                } else {
                    SYSCALL_FAILED
                }
            }
        };
        self.threads.tcb_mut(id).context.set_result(result);
    }

    /// The internal thread that keeps the output buffer draining so the
    /// system never deadlocks on console backpressure. Its user stack
    /// comes from the kernel heap.
    fn spawn_flush_thread(&mut self, body: ThreadBody) -> KernelResult<ThreadId> {
        let stack = self
            .alloc
            .alloc(to_blocks(DEFAULT_STACK_SIZE) as u32)
            .ok_or(KernelError::OutOfMemory)? as u64;

        match self.create_thread(body, core::ptr::null_mut(), stack + DEFAULT_STACK_SIZE as u64) {
            Ok(id) => {
                self.ready_put(id);
                Ok(id)
            }
            Err(err) => {
                if let Err(mm_err) = self.alloc.free(stack as *mut u8) {
                    klog_error!("KERNEL: flush stack free failed: {}", mm_err);
                }
                Err(err)
            }
        }
    }

    /// Allocator counters, for diagnostics.
    pub fn heap_stats(&self) -> rvos_mm::AllocStats {
        self.alloc.stats()
    }
}
