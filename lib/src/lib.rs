#![no_std]

pub mod irq;
pub mod klog;
pub mod numfmt;
pub mod ring_buffer;
pub mod spinlock;

pub use irq::{irq_register_mask_hooks, irq_restore, irq_save_disable};
pub use klog::{KlogLevel, klog_get_level, klog_register_backend, klog_set_level};
pub use numfmt::{decimal_weight, for_each_decimal_digit};
pub use ring_buffer::RingBuffer;
pub use spinlock::{IrqMutex, IrqMutexGuard};
