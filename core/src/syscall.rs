//! Syscall decode and dispatch.
//!
//! Arguments live in the caller's *saved* context: the call code in `a0`,
//! arguments in `a1..a4`, and the result goes back into `a0`. Every path
//! starts from a failure result; only the cases below overwrite it.

use core::ffi::c_void;

use rvos_abi::context::SstatusFlags;
use rvos_abi::layout::INSTRUCTION_SIZE;
use rvos_abi::syscall::{
    SYSCALL_FAILED, SYSCALL_GET_BYTE, SYSCALL_MEM_ALLOC, SYSCALL_MEM_FREE, SYSCALL_PUT_BYTE,
    SYSCALL_SEM_CLOSE, SYSCALL_SEM_OPEN, SYSCALL_SEM_SIGNAL, SYSCALL_SEM_WAIT, SYSCALL_SUCCESS,
    SYSCALL_THREAD_CREATE, SYSCALL_THREAD_DISPATCH, SYSCALL_THREAD_EXIT, SYSCALL_THREAD_JOIN,
    SYSCALL_TIME_SLEEP, SYSCALL_USER_MODE,
};
use rvos_abi::task::{MAIN_THREAD_ID, SemId, ThreadId, ThreadStatus};
use rvos_lib::{klog_debug, klog_warn};

use crate::kernel::Kernel;
use crate::platform::Platform;
use crate::thread::{PendingOp, ThreadBody};

impl<P: Platform> Kernel<P> {
    pub(crate) fn handle_syscall(&mut self) {
        let caller = self.current;

        // Step sepc past the ecall so resumption does not re-trap, ack
        // the software-pending bit, and assume failure until a case
        // proves otherwise.
        let (code, a1, a2, a3, a4) = {
            let ctx = &mut self.threads.tcb_mut(caller).context;
            ctx.sepc = ctx.sepc.wrapping_add(INSTRUCTION_SIZE);
            let args = (ctx.a0, ctx.a1, ctx.a2, ctx.a3, ctx.a4);
            ctx.set_result(SYSCALL_FAILED);
            args
        };
        self.platform.clear_soft_pending();

        match code {
            SYSCALL_MEM_ALLOC => {
                let address = self.alloc.alloc(a1 as u32).map_or(0, |p| p as u64);
                self.threads.tcb_mut(caller).context.a0 = address;
            }

            SYSCALL_MEM_FREE => {
                let result = match self.alloc.free(a1 as *mut u8) {
                    Ok(()) => SYSCALL_SUCCESS,
                    Err(err) => err.to_code(),
                };
                self.threads.tcb_mut(caller).context.set_result(result);
            }

            SYSCALL_THREAD_CREATE => {
                let handle_out = a1 as *mut u64;
                if handle_out.is_null() || a2 == 0 {
                    return;
                }
                // The body arrives as a raw address; the ABI guarantees
                // it is a `fn(*mut c_void)`.
                let body: ThreadBody = unsafe { core::mem::transmute(a2 as usize) };
                match self.create_thread(body, a3 as *mut c_void, a4) {
                    Ok(id) => {
                        unsafe { handle_out.write(id as u64) };
                        self.ready_put(id);
                        self.threads
                            .tcb_mut(caller)
                            .context
                            .set_result(SYSCALL_SUCCESS);
                    }
                    Err(err) => klog_warn!("SYSCALL: thread create failed: {}", err),
                }
            }

            SYSCALL_THREAD_EXIT => {
                // The main thread cannot exit; everyone else is reclaimed
                // by the dispatch that follows.
                if caller != MAIN_THREAD_ID {
                    let tcb = self.threads.tcb_mut(caller);
                    tcb.status = ThreadStatus::Terminating;
                    tcb.context.set_result(SYSCALL_SUCCESS);
                    self.dispatch();
                }
            }

            SYSCALL_THREAD_DISPATCH => {
                self.threads
                    .tcb_mut(caller)
                    .context
                    .set_result(SYSCALL_SUCCESS);
                self.dispatch();
            }

            SYSCALL_THREAD_JOIN => {
                let target = a1 as ThreadId;
                if self.threads.is_live(target) {
                    let join_sem = self.threads.tcb(target).join_sem;
                    if self.sems.is_live(join_sem) {
                        self.sem_wait(join_sem, PendingOp::SemResult);
                    }
                }
            }

            SYSCALL_SEM_OPEN => {
                let handle_out = a1 as *mut u64;
                if handle_out.is_null() {
                    return;
                }
                match self.sem_open(a2 as i64) {
                    Ok(id) => {
                        unsafe { handle_out.write(id as u64) };
                        self.threads
                            .tcb_mut(caller)
                            .context
                            .set_result(SYSCALL_SUCCESS);
                    }
                    Err(err) => klog_warn!("SYSCALL: sem open failed: {}", err),
                }
            }

            SYSCALL_SEM_CLOSE => {
                // Kernel-owned semaphores (console, join) are not the
                // caller's to close, no matter how it got the handle.
                let id = a1 as SemId;
                if self.sems.is_live(id) && !self.sems.slot(id).kernel_owned {
                    self.sem_close(id);
                    self.sems.release(id);
                    self.threads
                        .tcb_mut(caller)
                        .context
                        .set_result(SYSCALL_SUCCESS);
                }
            }

            SYSCALL_SEM_WAIT => {
                let id = a1 as SemId;
                if self.sems.is_live(id) {
                    self.sem_wait(id, PendingOp::SemResult);
                }
            }

            SYSCALL_SEM_SIGNAL => {
                let id = a1 as SemId;
                if self.sems.is_live(id) {
                    self.sem_signal(id);
                    self.threads
                        .tcb_mut(caller)
                        .context
                        .set_result(SYSCALL_SUCCESS);
                }
            }

            SYSCALL_TIME_SLEEP => {
                let ticks = a1 as i64;
                if ticks > 0 {
                    self.threads
                        .tcb_mut(caller)
                        .context
                        .set_result(SYSCALL_SUCCESS);
                    if !self.sleep.put_to_sleep(&mut self.threads, caller, ticks) {
                        klog_warn!("SYSCALL: thread {} already queued for sleep", caller);
                        self.threads
                            .tcb_mut(caller)
                            .context
                            .set_result(SYSCALL_FAILED);
                        self.threads.tcb_mut(caller).status = ThreadStatus::Running;
                        return;
                    }
                    self.dispatch();
                }
            }

            SYSCALL_GET_BYTE => {
                let sem = self.console.in_sem;
                if self.sems.is_live(sem) {
                    self.sem_wait(sem, PendingOp::GetByte);
                }
            }

            SYSCALL_PUT_BYTE => {
                let sem = self.console.out_sem;
                if self.sems.is_live(sem) {
                    self.sem_wait(sem, PendingOp::PutByte(a1 as u8));
                }
            }

            SYSCALL_USER_MODE => {
                // Drop to user privilege on trap return: clear the saved
                // previous-privilege bit.
                let ctx = &mut self.threads.tcb_mut(caller).context;
                ctx.sstatus &= !SstatusFlags::SPP.bits();
                ctx.set_result(SYSCALL_SUCCESS);
            }

            _ => klog_debug!("SYSCALL: unknown code {:#x}", code),
        }
    }
}
