//! rvos kernel core: thread control blocks, the FIFO scheduler, counting
//! semaphores, the delta sleep queue, buffered console, and the trap
//! dispatcher that ties them together.
//!
//! Everything here is portable logic over saved [`rvos_abi::Context`]
//! records. Hardware access goes through the [`Platform`] seam, so the
//! whole crate runs under host tests with a recording platform double.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod console;
pub mod error;
pub mod kernel;
pub mod platform;
pub mod queue;
pub mod sem;
pub mod sleep;
pub mod syscall;
pub mod thread;
pub mod trap;

#[cfg(test)]
mod test_platform;

#[cfg(test)]
mod trap_tests;

pub use error::{KernelError, KernelResult};
pub use kernel::Kernel;
pub use platform::Platform;
pub use thread::ThreadBody;
