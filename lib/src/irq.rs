//! Interrupt mask hooks.
//!
//! The locking and flush paths need to mask interrupts around critical
//! sections, but the actual CSR access lives in the boot crate's
//! architecture layer. It registers a save-and-disable / restore pair
//! here once at startup; until then (and on hosted test targets) the
//! hooks are no-ops.

use core::sync::atomic::{AtomicPtr, Ordering};

/// Disable interrupts and return the previous mask state.
pub type IrqSaveDisableFn = fn() -> u64;
/// Restore a mask state produced by the save hook.
pub type IrqRestoreFn = fn(u64);

static SAVE_DISABLE: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());
static RESTORE: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

pub fn irq_register_mask_hooks(save_disable: IrqSaveDisableFn, restore: IrqRestoreFn) {
    SAVE_DISABLE.store(save_disable as *mut (), Ordering::Release);
    RESTORE.store(restore as *mut (), Ordering::Release);
}

#[inline]
pub fn irq_save_disable() -> u64 {
    let ptr = SAVE_DISABLE.load(Ordering::Acquire);
    if ptr.is_null() {
        return 0;
    }
    // SAFETY: only `irq_register_mask_hooks` stores here, and it stores a
    // valid `IrqSaveDisableFn`.
    let f: IrqSaveDisableFn = unsafe { core::mem::transmute(ptr) };
    f()
}

#[inline]
pub fn irq_restore(saved: u64) {
    let ptr = RESTORE.load(Ordering::Acquire);
    if ptr.is_null() {
        return;
    }
    // SAFETY: as above.
    let f: IrqRestoreFn = unsafe { core::mem::transmute(ptr) };
    f(saved)
}
