//! Trap dispatch.
//!
//! Invoked once per trap with the decoded cause, after the entry path has
//! saved the interrupted thread's registers into its TCB. Exactly one
//! kernel operation runs per trap; control then returns to the exit path,
//! which restores whichever context is current by then.

use rvos_abi::trap::{SCAUSE_ILLEGAL_INSTRUCTION, SCAUSE_LOAD_FAULT, TrapCause};
use rvos_lib::{for_each_decimal_digit, klog_warn};

use crate::kernel::Kernel;
use crate::platform::Platform;

impl<P: Platform> Kernel<P> {
    pub fn handle_trap(&mut self, cause: TrapCause) {
        if self.halted {
            return;
        }

        match cause {
            TrapCause::Syscall => self.handle_syscall(),
            TrapCause::Fault(scause) => self.handle_fault(scause),
            TrapCause::Timer => self.handle_timer(),
            TrapCause::External => self.handle_external(),
            TrapCause::Unknown(scause) => {
                klog_warn!("TRAP: unhandled cause {:#x}", scause);
            }
        }
    }

    /// Periodic timer: age the sleep queue, wake everything due, and
    /// preempt once the current thread's quantum is spent.
    fn handle_timer(&mut self) {
        self.platform.clear_soft_pending();

        self.sleep.tick(&mut self.threads);
        while let Some(id) = self.sleep.pop_expired(&mut self.threads) {
            self.ready_put(id);
        }

        self.elapsed_ticks += 1;
        if self.elapsed_ticks >= self.threads.tcb(self.current).time_slice {
            self.dispatch();
        }
    }

    /// External device interrupt: claim/complete handshake with the
    /// interrupt controller, then the console receive path if the line
    /// was the console's.
    fn handle_external(&mut self) {
        let irq = self.platform.plic_claim();
        self.platform.clear_external_pending();
        self.platform.plic_complete(irq);

        if irq == self.platform.console_irq() {
            self.console_receive();
        }
    }

    /// Unrecoverable fault. Push the diagnostic and the faulting address
    /// through the output buffer so it lands after anything already
    /// queued, then stop for good. There is no supervisor above us to
    /// catch this.
    fn handle_fault(&mut self, scause: u64) {
        self.flush_output();

        let message: &str = match scause {
            SCAUSE_ILLEGAL_INSTRUCTION => "KERNEL PANIC! ILLEGAL INSTRUCTION AT: ",
            SCAUSE_LOAD_FAULT => "KERNEL PANIC! ILLEGAL READ OPERATION AT: ",
            _ => "KERNEL PANIC! ILLEGAL WRITE OPERATION AT: ",
        };
        let sepc = self.threads.tcb(self.current).context.sepc;

        for byte in message.bytes() {
            let _ = self.console.out.try_push(byte);
        }
        for_each_decimal_digit(sepc, |digit| {
            let _ = self.console.out.try_push(digit);
        });
        let _ = self.console.out.try_push(b'\n');

        self.flush_output();
        self.halted = true;
        self.platform.halt();
    }
}
