//! riscv64 privileged-architecture access.
//!
//! CSR helpers, the interrupt mask hooks the library layer calls through,
//! and the trap entry/exit assembly. The assembly spills the interrupted
//! thread's register file into the context published via
//! [`set_current_context`], runs the dispatcher on the thread's privileged
//! stack, then reloads whichever context the dispatcher left published.

use core::arch::{asm, global_asm};
use core::sync::atomic::{AtomicPtr, Ordering};

use rvos_abi::context::{Context, SstatusFlags};

/// Supervisor software-interrupt bit in sip/sie.
pub const SIP_SSIP: u64 = 1 << 1;
/// Supervisor external-interrupt bit in sip/sie.
pub const SIP_SEIP: u64 = 1 << 9;

/// Saved-context slot the trap assembly reads. Republished by the
/// dispatcher after every scheduling decision.
#[unsafe(no_mangle)]
static CURRENT_CONTEXT: AtomicPtr<Context> = AtomicPtr::new(core::ptr::null_mut());

unsafe extern "C" {
    fn __trap_entry();
}

/// Publish the context the next trap saves into and restores from.
pub fn set_current_context(ctx: *mut Context) {
    CURRENT_CONTEXT.store(ctx, Ordering::Release);
}

pub fn read_scause() -> u64 {
    let value: u64;
    unsafe { asm!("csrr {}, scause", out(reg) value) };
    value
}

/// Clear pending-interrupt bits in sip.
pub fn clear_sip(mask: u64) {
    unsafe { asm!("csrc sip, {}", in(reg) mask) };
}

/// Point stvec at the trap entry, direct mode.
pub fn install_trap_vector() {
    unsafe { asm!("csrw stvec, {}", in(reg) __trap_entry as usize) };
}

/// Unmask software and external interrupts, then enable globally.
pub fn enable_interrupts() {
    unsafe {
        asm!("csrs sie, {}", in(reg) SIP_SSIP | SIP_SEIP);
        asm!("csrs sstatus, {}", in(reg) SstatusFlags::SIE.bits());
    }
}

pub fn wait_for_interrupt() {
    unsafe { asm!("wfi") };
}

/// Mask interrupts; the return value feeds [`irq_restore`].
pub fn irq_save_disable() -> u64 {
    let prev: u64;
    unsafe {
        asm!("csrrc {}, sstatus, {}", out(reg) prev, in(reg) SstatusFlags::SIE.bits());
    }
    prev & SstatusFlags::SIE.bits()
}

pub fn irq_restore(saved: u64) {
    if saved & SstatusFlags::SIE.bits() != 0 {
        unsafe { asm!("csrs sstatus, {}", in(reg) SstatusFlags::SIE.bits()) };
    }
}

/// Issue one environment call: `code` in a0, one argument in a1. The
/// result lands back in a0 when the calling thread is next resumed.
pub fn ecall(code: u64, arg: u64) -> i64 {
    let result: i64;
    unsafe {
        asm!("ecall", inout("a0") code => result, in("a1") arg);
    }
    result
}

// Offsets into `Context`; part of the contract documented there.
global_asm!(
    r#"
    .section .text
    .balign 4
    .global __trap_entry
__trap_entry:
    csrw sscratch, t6
    la t6, CURRENT_CONTEXT
    ld t6, 0(t6)

    sd ra, 0x00(t6)
    sd sp, 0x08(t6)
    sd gp, 0x18(t6)
    sd tp, 0x20(t6)
    sd s11, 0x28(t6)
    sd s10, 0x30(t6)
    sd s9, 0x38(t6)
    sd s8, 0x40(t6)
    sd s7, 0x48(t6)
    sd s6, 0x50(t6)
    sd s5, 0x58(t6)
    sd s4, 0x60(t6)
    sd s3, 0x68(t6)
    sd s2, 0x70(t6)
    sd s1, 0x78(t6)
    sd s0, 0x80(t6)
    sd t5, 0x90(t6)
    sd t4, 0x98(t6)
    sd t3, 0xa0(t6)
    sd t2, 0xa8(t6)
    sd t1, 0xb0(t6)
    sd t0, 0xb8(t6)
    sd a7, 0xc0(t6)
    sd a6, 0xc8(t6)
    sd a5, 0xd0(t6)
    sd a4, 0xd8(t6)
    sd a3, 0xe0(t6)
    sd a2, 0xe8(t6)
    sd a1, 0xf0(t6)
    sd a0, 0xf8(t6)
    csrr t5, sscratch
    sd t5, 0x88(t6)
    csrr t5, sepc
    sd t5, 0x100(t6)
    csrr t5, sstatus
    sd t5, 0x108(t6)

    ld sp, 0x10(t6)
    call trap_dispatch

    la t6, CURRENT_CONTEXT
    ld t6, 0(t6)

    ld t5, 0x100(t6)
    csrw sepc, t5
    ld t5, 0x108(t6)
    csrw sstatus, t5
    ld ra, 0x00(t6)
    ld sp, 0x08(t6)
    ld gp, 0x18(t6)
    ld tp, 0x20(t6)
    ld s11, 0x28(t6)
    ld s10, 0x30(t6)
    ld s9, 0x38(t6)
    ld s8, 0x40(t6)
    ld s7, 0x48(t6)
    ld s6, 0x50(t6)
    ld s5, 0x58(t6)
    ld s4, 0x60(t6)
    ld s3, 0x68(t6)
    ld s2, 0x70(t6)
    ld s1, 0x78(t6)
    ld s0, 0x80(t6)
    ld t5, 0x90(t6)
    ld t4, 0x98(t6)
    ld t3, 0xa0(t6)
    ld t2, 0xa8(t6)
    ld t1, 0xb0(t6)
    ld t0, 0xb8(t6)
    ld a7, 0xc0(t6)
    ld a6, 0xc8(t6)
    ld a5, 0xd0(t6)
    ld a4, 0xd8(t6)
    ld a3, 0xe0(t6)
    ld a2, 0xe8(t6)
    ld a1, 0xf0(t6)
    ld a0, 0xf8(t6)
    ld t6, 0x88(t6)
    sret
"#
);
