//! Trap cause values (scause ABI).

/// scause: attempt to execute an illegal instruction.
pub const SCAUSE_ILLEGAL_INSTRUCTION: u64 = 2;
/// scause: illegal load address.
pub const SCAUSE_LOAD_FAULT: u64 = 5;
/// scause: illegal store address.
pub const SCAUSE_STORE_FAULT: u64 = 7;
/// scause: environment call from user mode.
pub const SCAUSE_ECALL_USER: u64 = 8;
/// scause: environment call from supervisor mode.
pub const SCAUSE_ECALL_SUPERVISOR: u64 = 9;
/// scause: supervisor software interrupt, raised by the periodic timer.
pub const SCAUSE_TIMER: u64 = 0x8000_0000_0000_0001;
/// scause: supervisor external interrupt from the interrupt controller.
pub const SCAUSE_EXTERNAL: u64 = 0x8000_0000_0000_0009;

/// Decoded trap cause, as handed to the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapCause {
    /// Synchronous system call (user or supervisor ecall).
    Syscall,
    /// Fatal synchronous fault; the payload is the raw scause value.
    Fault(u64),
    /// Periodic timer interrupt.
    Timer,
    /// External device interrupt.
    External,
    /// Anything this kernel does not handle.
    Unknown(u64),
}

impl TrapCause {
    pub fn from_scause(scause: u64) -> Self {
        match scause {
            SCAUSE_ECALL_USER | SCAUSE_ECALL_SUPERVISOR => Self::Syscall,
            SCAUSE_ILLEGAL_INSTRUCTION | SCAUSE_LOAD_FAULT | SCAUSE_STORE_FAULT => {
                Self::Fault(scause)
            }
            SCAUSE_TIMER => Self::Timer,
            SCAUSE_EXTERNAL => Self::External,
            other => Self::Unknown(other),
        }
    }
}
