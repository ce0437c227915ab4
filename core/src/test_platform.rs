//! Recording platform double and the test harness driving the kernel
//! through traps, the way the CPU would.

use std::boxed::Box;
use std::collections::VecDeque;
use std::vec::Vec;

use rvos_abi::layout::DEFAULT_STACK_SIZE;
use rvos_abi::syscall::{SYSCALL_MEM_ALLOC, SYSCALL_THREAD_CREATE, SYSCALL_THREAD_DISPATCH};
use rvos_abi::task::ThreadId;
use rvos_abi::trap::TrapCause;

use crate::kernel::Kernel;
use crate::platform::Platform;
use crate::thread::ThreadBody;

pub const TEST_CONSOLE_IRQ: u32 = 10;
pub const TEST_TRAMPOLINE: u64 = 0x8000_1000;

#[derive(Default)]
pub struct TestPlatform {
    pub soft_clears: usize,
    pub external_clears: usize,
    /// What the next `plic_claim` returns.
    pub claim_irq: u32,
    pub completed: Vec<u32>,
    pub tx_ready: bool,
    pub tx: Vec<u8>,
    pub rx: VecDeque<u8>,
    pub mask_depth: i64,
    pub mask_saves: usize,
    pub switches: Vec<ThreadId>,
    pub halts: usize,
}

impl Platform for TestPlatform {
    fn clear_soft_pending(&mut self) {
        self.soft_clears += 1;
    }

    fn clear_external_pending(&mut self) {
        self.external_clears += 1;
    }

    fn plic_claim(&mut self) -> u32 {
        self.claim_irq
    }

    fn plic_complete(&mut self, irq: u32) {
        self.completed.push(irq);
    }

    fn console_irq(&self) -> u32 {
        TEST_CONSOLE_IRQ
    }

    fn console_tx_ready(&self) -> bool {
        self.tx_ready
    }

    fn console_write(&mut self, byte: u8) {
        self.tx.push(byte);
    }

    fn console_rx_ready(&self) -> bool {
        !self.rx.is_empty()
    }

    fn console_read(&mut self) -> u8 {
        self.rx.pop_front().unwrap_or(0)
    }

    fn irq_save_disable(&mut self) -> u64 {
        self.mask_saves += 1;
        self.mask_depth += 1;
        self.mask_depth as u64
    }

    fn irq_restore(&mut self, state: u64) {
        assert_eq!(state, self.mask_depth as u64, "unbalanced irq restore");
        self.mask_depth -= 1;
    }

    fn trampoline_addr(&self) -> u64 {
        TEST_TRAMPOLINE
    }

    fn context_switched(&mut self, thread: ThreadId) {
        self.switches.push(thread);
    }

    fn halt(&mut self) {
        self.halts += 1;
    }
}

pub fn noop_body(_arg: *mut core::ffi::c_void) {}

pub fn body_addr(body: ThreadBody) -> u64 {
    body as usize as u64
}

const ARENA_BYTES: usize = 128 * 1024;

#[repr(align(64))]
struct ArenaBuf([u8; ARENA_BYTES]);

pub struct Harness {
    pub kernel: Kernel<TestPlatform>,
    _arena: Box<ArenaBuf>,
}

/// Kernel over a boxed arena, with the flush thread in slot 1 and the
/// transmitter ready.
pub fn boot() -> Harness {
    let mut arena = Box::new(ArenaBuf([0u8; ARENA_BYTES]));
    let start = arena.0.as_mut_ptr();
    let end = unsafe { start.add(ARENA_BYTES) };

    let platform = TestPlatform {
        tx_ready: true,
        ..TestPlatform::default()
    };

    let kernel = unsafe { Kernel::init(platform, start, end, noop_body) }.unwrap();
    Harness {
        kernel,
        _arena: arena,
    }
}

impl Harness {
    /// Issue a syscall from the current thread and return the caller's
    /// result slot (which may have been completed by a later wake).
    pub fn syscall(&mut self, code: u64, args: &[u64]) -> i64 {
        let caller = self.syscall_caller(code, args);
        self.kernel.threads.tcb(caller).context.result()
    }

    /// Like `syscall`, but returns who issued it; useful when the caller
    /// parks and the result is checked after a wake.
    pub fn syscall_caller(&mut self, code: u64, args: &[u64]) -> ThreadId {
        let caller = self.kernel.current_thread();
        {
            let ctx = &mut self.kernel.threads.tcb_mut(caller).context;
            ctx.a0 = code;
            ctx.a1 = args.first().copied().unwrap_or(0);
            ctx.a2 = args.get(1).copied().unwrap_or(0);
            ctx.a3 = args.get(2).copied().unwrap_or(0);
            ctx.a4 = args.get(3).copied().unwrap_or(0);
        }
        self.kernel.handle_trap(TrapCause::Syscall);
        caller
    }

    pub fn result_of(&self, id: ThreadId) -> i64 {
        self.kernel.threads.tcb(id).context.result()
    }

    /// Yield through the ready queue until `id` holds the core.
    pub fn rotate_to(&mut self, id: ThreadId) {
        for _ in 0..256 {
            if self.kernel.current_thread() == id {
                return;
            }
            self.syscall(SYSCALL_THREAD_DISPATCH, &[]);
        }
        panic!("thread {id} never became current");
    }

    /// Allocate a stack and create a thread with a no-op body, returning
    /// its handle.
    pub fn spawn(&mut self) -> ThreadId {
        let blocks = rvos_abi::layout::to_blocks(DEFAULT_STACK_SIZE) as u64;
        self.syscall(SYSCALL_MEM_ALLOC, &[blocks]);
        let caller = self.kernel.current_thread();
        let stack = self.kernel.threads.tcb(caller).context.a0;
        assert_ne!(stack, 0, "stack allocation failed");

        let mut handle: u64 = u64::MAX;
        let rc = self.syscall(
            SYSCALL_THREAD_CREATE,
            &[
                &mut handle as *mut u64 as u64,
                body_addr(noop_body),
                0,
                stack + DEFAULT_STACK_SIZE as u64,
            ],
        );
        assert_eq!(rc, 0);
        handle as ThreadId
    }

    pub fn timer(&mut self) {
        self.kernel.handle_trap(TrapCause::Timer);
    }

    /// Deliver one console interrupt carrying `byte`.
    pub fn console_irq_with(&mut self, byte: u8) {
        self.kernel.platform.rx.push_back(byte);
        self.kernel.platform.claim_irq = TEST_CONSOLE_IRQ;
        self.kernel.handle_trap(TrapCause::External);
    }

    /// Position of `id` in the ready queue, if queued.
    pub fn ready_position(&self, id: ThreadId) -> Option<usize> {
        let mut pos = 0;
        let mut curr = self.kernel.ready.head();
        while let Some(node) = curr {
            if node == id {
                return Some(pos);
            }
            pos += 1;
            curr = self.kernel.ready.next_of(&self.kernel.threads, node);
        }
        None
    }
}
