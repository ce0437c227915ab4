//! The saved execution context of a thread.
//!
//! One `Context` is embedded in every thread control block. The trap entry
//! stores the full register file of the interrupted thread here before the
//! dispatcher runs, and the trap exit reloads the current thread's context
//! on the way out. Exactly one context is live at any instant; all others
//! are frozen snapshots.

use bitflags::bitflags;

/// Saved register file of a riscv64 hart plus the two trap CSRs.
///
/// The field order and byte offsets are part of the trap-entry contract
/// with the assembly layer; do not reorder. Offsets are from the start of
/// the record, 8 bytes per field.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct Context {
    /// x1, return address. Seeded with the trampoline for fresh threads.
    pub ra: u64, // 0x00
    /// x2 while running unprivileged.
    pub usr_sp: u64, // 0x08
    /// x2 while running privileged.
    pub sys_sp: u64, // 0x10
    /// x3, global pointer.
    pub gp: u64, // 0x18
    /// x4, thread pointer.
    pub tp: u64, // 0x20

    // Callee-saved registers, x27 down to x8.
    pub s11: u64, // 0x28
    pub s10: u64, // 0x30
    pub s9: u64,  // 0x38
    pub s8: u64,  // 0x40
    pub s7: u64,  // 0x48
    pub s6: u64,  // 0x50
    pub s5: u64,  // 0x58
    pub s4: u64,  // 0x60
    pub s3: u64,  // 0x68
    pub s2: u64,  // 0x70
    pub s1: u64,  // 0x78
    pub s0: u64,  // 0x80

    // Temporaries, x31 down to x5.
    pub t6: u64, // 0x88
    pub t5: u64, // 0x90
    pub t4: u64, // 0x98
    pub t3: u64, // 0xa0
    pub t2: u64, // 0xa8
    pub t1: u64, // 0xb0
    pub t0: u64, // 0xb8

    // Argument registers, x17 down to x10. a0 doubles as the syscall
    // code on entry and the result slot on exit.
    pub a7: u64, // 0xc0
    pub a6: u64, // 0xc8
    pub a5: u64, // 0xd0
    pub a4: u64, // 0xd8
    pub a3: u64, // 0xe0
    pub a2: u64, // 0xe8
    pub a1: u64, // 0xf0
    pub a0: u64, // 0xf8

    /// Trap return address (points at the trapping instruction).
    pub sepc: u64, // 0x100
    /// Saved supervisor status word, see [`SstatusFlags`].
    pub sstatus: u64, // 0x108
}

impl Context {
    pub const fn zeroed() -> Self {
        Self {
            ra: 0,
            usr_sp: 0,
            sys_sp: 0,
            gp: 0,
            tp: 0,
            s11: 0,
            s10: 0,
            s9: 0,
            s8: 0,
            s7: 0,
            s6: 0,
            s5: 0,
            s4: 0,
            s3: 0,
            s2: 0,
            s1: 0,
            s0: 0,
            t6: 0,
            t5: 0,
            t4: 0,
            t3: 0,
            t2: 0,
            t1: 0,
            t0: 0,
            a7: 0,
            a6: 0,
            a5: 0,
            a4: 0,
            a3: 0,
            a2: 0,
            a1: 0,
            a0: 0,
            sepc: 0,
            sstatus: 0,
        }
    }

    /// Signed view of the result slot.
    pub fn result(&self) -> i64 {
        self.a0 as i64
    }

    pub fn set_result(&mut self, result: i64) {
        self.a0 = result as u64;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::zeroed()
    }
}

bitflags! {
    /// The sstatus bits the kernel manipulates.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SstatusFlags: u64 {
        /// Supervisor interrupt enable.
        const SIE = 1 << 1;
        /// Interrupt-enable state to restore on trap return.
        const SPIE = 1 << 5;
        /// Privilege to return to: set = supervisor, clear = user.
        const SPP = 1 << 8;
    }
}
