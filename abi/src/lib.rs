//! rvos kernel ABI types.
//!
//! This crate provides the canonical definitions for everything that
//! crosses the privilege boundary: syscall codes, trap cause values, the
//! saved register context, and the handle/status types shared between the
//! kernel subsystems. Having a single source of truth eliminates:
//! - Duplicate constant definitions
//! - ABI mismatches between the trap assembly and the dispatcher
//! - The need for unsafe conversions at the boundary
//!
//! The context record is `#[repr(C)]`; its field order is part of the
//! trap-entry/trap-exit contract and must not change.

#![no_std]
#![forbid(unsafe_code)]

pub mod context;
pub mod layout;
pub mod syscall;
pub mod task;
pub mod trap;

pub use context::{Context, SstatusFlags};
pub use layout::*;
pub use syscall::*;
pub use task::*;
pub use trap::*;
