//! Board composition crate for the qemu `virt` machine.
//!
//! Everything here is riscv64-only: the trap entry/exit assembly, the
//! CSR and MMIO access, and the boot sequence that assembles a
//! [`rvos_core::Kernel`] over the [`rvos_core::Platform`] seam. The
//! portable kernel logic lives in `rvos-core` and is tested on the host;
//! this crate is the thin layer the host build compiles away.
#![no_std]

#[cfg(target_arch = "riscv64")]
pub mod arch;
#[cfg(target_arch = "riscv64")]
pub mod boot;
#[cfg(target_arch = "riscv64")]
pub mod platform;
