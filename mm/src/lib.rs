//! rvos memory management: the block-granularity heap allocator.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod block_alloc;
pub mod error;

#[cfg(test)]
mod tests;

pub use block_alloc::{AllocStats, BlockAllocator};
pub use error::{MmError, MmResult};
