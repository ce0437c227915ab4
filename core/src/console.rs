//! Buffered console core.
//!
//! Two fixed-capacity byte rings sit between threads and the device. The
//! output ring is guarded by a semaphore counting free space
//! (backpressure), the input ring by a semaphore counting buffered bytes
//! (availability). The always-ready flush thread drains output; the
//! device interrupt fills input.

use rvos_abi::layout::IO_BUFFER_SIZE;
use rvos_abi::task::{INVALID_SEM_ID, SemId};
use rvos_lib::{RingBuffer, klog_warn};

use crate::kernel::Kernel;
use crate::platform::Platform;

pub struct Console {
    pub out: RingBuffer<u8, IO_BUFFER_SIZE>,
    pub inp: RingBuffer<u8, IO_BUFFER_SIZE>,
    /// Counts free output slots; initialized to the buffer capacity.
    pub out_sem: SemId,
    /// Counts buffered input bytes; initialized to zero.
    pub in_sem: SemId,
}

impl Console {
    pub const fn new() -> Self {
        Self {
            out: RingBuffer::new_with(0),
            inp: RingBuffer::new_with(0),
            out_sem: INVALID_SEM_ID,
            in_sem: INVALID_SEM_ID,
        }
    }
}

impl<P: Platform> Kernel<P> {
    /// Drain the output ring to the device while its transmit-ready bit
    /// holds, signalling a freed slot per byte.
    ///
    /// Interrupts are masked for the duration: the device interrupt also
    /// reaches the semaphore table and the ring, and a half-applied push
    /// under the drain loop would corrupt both.
    pub fn flush_output(&mut self) {
        let irq_state = self.platform.irq_save_disable();

        while !self.console.out.is_empty() && self.platform.console_tx_ready() {
            if let Some(byte) = self.console.out.try_pop() {
                self.platform.console_write(byte);
                self.sem_signal(self.console.out_sem);
            }
        }

        self.platform.irq_restore(irq_state);
    }

    /// Receive path, from the device interrupt: pull one byte if the
    /// device has one, buffer it, and signal availability. A full buffer
    /// drops the byte.
    pub(crate) fn console_receive(&mut self) {
        if !self.platform.console_rx_ready() {
            return;
        }

        let byte = self.platform.console_read();
        if !self.console.inp.try_push(byte) {
            klog_warn!("CONSOLE: input buffer full, byte dropped");
            return;
        }

        self.sem_signal(self.console.in_sem);
        self.dispatch();
    }
}
