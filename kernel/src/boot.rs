//! Boot sequence and the kernel singleton.
//!
//! Bring-up order follows the dependencies: trap vector and mask hooks
//! first (logging needs masking), the klog backend, then the kernel
//! proper over the linker-provided heap arena. Interrupts stay off until
//! the singleton is published and the trap assembly has a context to
//! save into.

use core::ffi::c_void;
use core::fmt::{self, Write};

use rvos_abi::syscall::{SYSCALL_THREAD_DISPATCH, SYSCALL_THREAD_EXIT};
use rvos_abi::trap::TrapCause;
use rvos_core::Kernel;
use rvos_lib::{IrqMutex, irq_register_mask_hooks, klog_error, klog_info, klog_register_backend};
use spin::Once;

use crate::arch;
use crate::platform::{self, VirtPlatform};

// Heap arena bounds, defined by the board linker script.
unsafe extern "C" {
    static mut __heap_start: u8;
    static mut __heap_end: u8;
}

static KERNEL: Once<IrqMutex<Kernel<VirtPlatform>>> = Once::new();

/// Run `f` under the kernel lock. `None` until boot publishes the
/// singleton.
pub fn with_kernel<R>(f: impl FnOnce(&mut Kernel<VirtPlatform>) -> R) -> Option<R> {
    let kernel = KERNEL.get()?;
    let mut guard = kernel.lock();
    Some(f(&mut guard))
}

/// Entry point, reached from the assembly startup stub with a valid
/// stack and a zeroed BSS. Becomes the main thread.
pub extern "C" fn kernel_main() -> ! {
    arch::install_trap_vector();
    irq_register_mask_hooks(arch::irq_save_disable, arch::irq_restore);
    klog_register_backend(uart_backend);

    let (heap_start, heap_end) = unsafe { (&raw mut __heap_start, &raw mut __heap_end) };
    let kernel =
        match unsafe { Kernel::init(VirtPlatform::new(), heap_start, heap_end, flush_loop) } {
            Ok(kernel) => kernel,
            Err(err) => {
                klog_error!("BOOT: kernel init failed: {}", err);
                loop {
                    arch::wait_for_interrupt();
                }
            }
        };

    let lock = KERNEL.call_once(|| IrqMutex::new(kernel));
    arch::set_current_context(lock.lock().current_context_ptr());

    klog_info!("BOOT: handing the core to the scheduler");
    arch::enable_interrupts();

    loop {
        arch::ecall(SYSCALL_THREAD_DISPATCH, 0);
        arch::wait_for_interrupt();
    }
}

/// Called from the trap entry assembly, on the interrupted thread's
/// privileged stack, with its registers already saved.
#[unsafe(no_mangle)]
extern "C" fn trap_dispatch() {
    let cause = TrapCause::from_scause(arch::read_scause());
    let Some(lock) = KERNEL.get() else {
        return;
    };

    // A fault while the kernel lock is held means the kernel itself
    // faulted mid-operation; the holder can never release it, so spinning
    // would mask the trap forever. Emit the diagnostic raw and stop.
    let mut kernel = match lock.try_lock() {
        Some(guard) => guard,
        None if matches!(cause, TrapCause::Fault(_)) => {
            let _ = write!(UartWriter, "KERNEL PANIC! FAULT WITH KERNEL LOCK HELD");
            platform::uart_blocking_write(b'\n');
            loop {
                arch::wait_for_interrupt();
            }
        }
        None => lock.lock(),
    };
    kernel.handle_trap(cause);
    arch::set_current_context(kernel.current_context_ptr());
}

/// Where every fresh thread's first trap return lands. Runs the body,
/// then exits through the normal syscall path.
pub extern "C" fn thread_trampoline() -> ! {
    if let Some(Some((body, arg))) = with_kernel(|kernel| kernel.current_body()) {
        body(arg);
    }
    loop {
        arch::ecall(SYSCALL_THREAD_EXIT, 0);
    }
}

/// Body of the internal flush thread: drain the output buffer, yield,
/// repeat.
fn flush_loop(_arg: *mut c_void) {
    loop {
        let _ = with_kernel(|kernel| kernel.flush_output());
        arch::ecall(SYSCALL_THREAD_DISPATCH, 0);
    }
}

struct UartWriter;

impl fmt::Write for UartWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            platform::uart_blocking_write(byte);
        }
        Ok(())
    }
}

/// klog backend: polled UART writes, whole line under one mask so trap
/// and thread output do not interleave.
fn uart_backend(args: fmt::Arguments<'_>) {
    let saved = arch::irq_save_disable();
    let _ = fmt::write(&mut UartWriter, args);
    platform::uart_blocking_write(b'\n');
    arch::irq_restore(saved);
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    let _ = arch::irq_save_disable();
    let _ = write!(UartWriter, "KERNEL PANIC! {}", info);
    platform::uart_blocking_write(b'\n');
    loop {
        arch::wait_for_interrupt();
    }
}
