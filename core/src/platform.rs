//! Platform hardware abstraction.
//!
//! The one seam between the portable kernel and the machine. The boot
//! crate implements it over the real CSRs, PLIC, and UART; host tests
//! implement it with a recording double that plays the part of the CPU.

use rvos_abi::task::ThreadId;

pub trait Platform {
    /// Acknowledge a software-pending interrupt (the SSIP bit). Called
    /// for every handled ecall and timer trap.
    fn clear_soft_pending(&mut self);

    /// Acknowledge an external-pending interrupt (the SEIP bit).
    fn clear_external_pending(&mut self);

    /// Claim the highest-priority pending interrupt at the controller.
    fn plic_claim(&mut self) -> u32;

    /// Complete the claim/complete handshake for `irq`.
    fn plic_complete(&mut self, irq: u32);

    /// Interrupt line of the console device.
    fn console_irq(&self) -> u32;

    /// Transmit-ready status bit of the console device.
    fn console_tx_ready(&self) -> bool;

    /// Write one byte to the console transmit register.
    fn console_write(&mut self, byte: u8);

    /// Receive-ready status bit of the console device.
    fn console_rx_ready(&self) -> bool;

    /// Read one byte from the console receive register.
    fn console_read(&mut self) -> u8;

    /// Mask interrupts, returning the state to restore. Brackets the
    /// output-flush critical section.
    fn irq_save_disable(&mut self) -> u64;

    /// Undo a matching [`Platform::irq_save_disable`].
    fn irq_restore(&mut self, state: u64);

    /// Address a fresh thread's saved `ra` points at: the trampoline that
    /// calls the thread body and then issues the exit ecall.
    fn trampoline_addr(&self) -> u64;

    /// A different thread's context is now the one the trap exit will
    /// restore.
    fn context_switched(&mut self, thread: ThreadId);

    /// Stop executing after a fatal fault. Real hardware never returns
    /// from this; test doubles record the call and do.
    fn halt(&mut self);
}
