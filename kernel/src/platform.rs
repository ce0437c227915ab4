//! Hardware glue for the qemu `virt` board: 16550 UART at `0x1000_0000`
//! and the PLIC claim/complete registers for hart 0 supervisor mode.

use core::ptr::{read_volatile, write_volatile};

use rvos_abi::task::ThreadId;
use rvos_core::Platform;

use crate::{arch, boot};

const UART0_BASE: usize = 0x1000_0000;
/// Receive/transmit holding register.
const UART_DATA: usize = UART0_BASE;
/// Line status register.
const UART_LSR: usize = UART0_BASE + 5;
const LSR_RX_READY: u8 = 0x01;
const LSR_TX_IDLE: u8 = 0x20;

/// UART0 interrupt source on the virt board.
pub const UART0_IRQ: u32 = 10;

const PLIC_BASE: usize = 0x0c00_0000;
/// Claim/complete register of the hart 0 supervisor context.
const PLIC_SCLAIM: usize = PLIC_BASE + 0x20_1004;

pub(crate) fn uart_tx_ready() -> bool {
    unsafe { read_volatile(UART_LSR as *const u8) & LSR_TX_IDLE != 0 }
}

pub(crate) fn uart_write(byte: u8) {
    unsafe { write_volatile(UART_DATA as *mut u8, byte) };
}

/// Spin until the transmitter is idle, then write. Only the klog backend
/// and the panic path use this; the console proper goes through the
/// buffered flush thread.
pub(crate) fn uart_blocking_write(byte: u8) {
    while !uart_tx_ready() {}
    uart_write(byte);
}

pub struct VirtPlatform;

impl VirtPlatform {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for VirtPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for VirtPlatform {
    fn clear_soft_pending(&mut self) {
        arch::clear_sip(arch::SIP_SSIP);
    }

    fn clear_external_pending(&mut self) {
        arch::clear_sip(arch::SIP_SEIP);
    }

    fn plic_claim(&mut self) -> u32 {
        unsafe { read_volatile(PLIC_SCLAIM as *const u32) }
    }

    fn plic_complete(&mut self, irq: u32) {
        unsafe { write_volatile(PLIC_SCLAIM as *mut u32, irq) };
    }

    fn console_irq(&self) -> u32 {
        UART0_IRQ
    }

    fn console_tx_ready(&self) -> bool {
        uart_tx_ready()
    }

    fn console_write(&mut self, byte: u8) {
        uart_write(byte);
    }

    fn console_rx_ready(&self) -> bool {
        unsafe { read_volatile(UART_LSR as *const u8) & LSR_RX_READY != 0 }
    }

    fn console_read(&mut self) -> u8 {
        unsafe { read_volatile(UART_DATA as *const u8) }
    }

    fn irq_save_disable(&mut self) -> u64 {
        arch::irq_save_disable()
    }

    fn irq_restore(&mut self, state: u64) {
        arch::irq_restore(state);
    }

    fn trampoline_addr(&self) -> u64 {
        boot::thread_trampoline as usize as u64
    }

    fn context_switched(&mut self, _thread: ThreadId) {}

    fn halt(&mut self) {
        loop {
            arch::wait_for_interrupt();
        }
    }
}
