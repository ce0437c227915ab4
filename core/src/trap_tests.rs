use rvos_abi::layout::{IO_BUFFER_SIZE, MEM_BLOCK_SIZE};
use rvos_abi::syscall::{
    SYSCALL_GET_BYTE, SYSCALL_MEM_ALLOC, SYSCALL_MEM_FREE, SYSCALL_PUT_BYTE,
    SYSCALL_THREAD_DISPATCH,
};
use rvos_abi::task::{MAIN_THREAD_ID, ThreadStatus};
use rvos_abi::trap::{
    SCAUSE_ILLEGAL_INSTRUCTION, SCAUSE_LOAD_FAULT, SCAUSE_STORE_FAULT, TrapCause,
};

use crate::test_platform::{TEST_CONSOLE_IRQ, boot};

#[test]
fn test_syscall_steps_sepc_and_acks_pending() {
    let mut fx = boot();
    fx.kernel.threads.tcb_mut(MAIN_THREAD_ID).context.sepc = 0x100;

    // Unknown code: result stays at the failure default, but the trap
    // bookkeeping still happened.
    assert_eq!(fx.syscall(0x77, &[]), -1);
    assert_eq!(fx.kernel.threads.tcb(MAIN_THREAD_ID).context.sepc, 0x104);
    assert_eq!(fx.kernel.platform.soft_clears, 1);
}

#[test]
fn test_mem_alloc_and_free_codes() {
    let mut fx = boot();

    let address = fx.syscall(SYSCALL_MEM_ALLOC, &[2]) as u64;
    assert_ne!(address, 0);
    assert_eq!(address as usize % MEM_BLOCK_SIZE, 0);

    assert_eq!(fx.syscall(SYSCALL_MEM_FREE, &[address]), 0);
    // Second free of the same address: not-used.
    assert_eq!(fx.syscall(SYSCALL_MEM_FREE, &[address]), -4);
    // Null and unaligned addresses get their own codes.
    assert_eq!(fx.syscall(SYSCALL_MEM_FREE, &[0]), -2);
    assert_eq!(fx.syscall(SYSCALL_MEM_FREE, &[address + 1]), -3);

    // Allocation beyond the heap fails with a null address.
    let huge = fx.kernel.heap_stats().total_blocks as u64 + 1;
    assert_eq!(fx.syscall(SYSCALL_MEM_ALLOC, &[huge]), 0);
}

#[test]
fn test_fault_emits_diagnostic_and_halts() {
    let mut fx = boot();
    fx.kernel.threads.tcb_mut(MAIN_THREAD_ID).context.sepc = 9050;

    fx.kernel.handle_trap(TrapCause::Fault(SCAUSE_ILLEGAL_INSTRUCTION));

    assert_eq!(
        fx.kernel.platform.tx,
        b"KERNEL PANIC! ILLEGAL INSTRUCTION AT: 9050\n"
    );
    assert_eq!(fx.kernel.platform.halts, 1);

    // The kernel is dead: further traps do nothing.
    fx.syscall(SYSCALL_THREAD_DISPATCH, &[]);
    fx.kernel.handle_trap(TrapCause::Timer);
    assert!(fx.kernel.platform.switches.is_empty());
    assert_eq!(fx.kernel.platform.tx.len(), 43);
}

#[test]
fn test_fault_messages_per_cause() {
    for (scause, message) in [
        (SCAUSE_LOAD_FAULT, &b"KERNEL PANIC! ILLEGAL READ OPERATION AT: 7\n"[..]),
        (SCAUSE_STORE_FAULT, &b"KERNEL PANIC! ILLEGAL WRITE OPERATION AT: 7\n"[..]),
    ] {
        let mut fx = boot();
        fx.kernel.threads.tcb_mut(MAIN_THREAD_ID).context.sepc = 7;
        fx.kernel.handle_trap(TrapCause::Fault(scause));
        assert_eq!(fx.kernel.platform.tx, message);
    }
}

#[test]
fn test_fault_flushes_queued_output_first() {
    let mut fx = boot();
    assert_eq!(fx.syscall(SYSCALL_PUT_BYTE, &[b'h' as u64]), 0);
    assert_eq!(fx.syscall(SYSCALL_PUT_BYTE, &[b'i' as u64]), 0);
    fx.kernel.threads.tcb_mut(MAIN_THREAD_ID).context.sepc = 1;

    fx.kernel.handle_trap(TrapCause::Fault(SCAUSE_ILLEGAL_INSTRUCTION));
    assert!(fx.kernel.platform.tx.starts_with(b"hi"));
    assert!(fx.kernel.platform.tx.ends_with(b"AT: 1\n"));
}

#[test]
fn test_put_byte_reaches_device_only_after_flush() {
    let mut fx = boot();

    assert_eq!(fx.syscall(SYSCALL_PUT_BYTE, &[b'A' as u64]), 0);
    assert!(fx.kernel.platform.tx.is_empty());
    assert_eq!(
        fx.kernel.sems.slot(fx.kernel.console.out_sem).value,
        IO_BUFFER_SIZE as i64 - 1
    );

    fx.kernel.flush_output();
    assert_eq!(fx.kernel.platform.tx, b"A");
    assert_eq!(
        fx.kernel.sems.slot(fx.kernel.console.out_sem).value,
        IO_BUFFER_SIZE as i64
    );
}

#[test]
fn test_full_output_buffer_blocks_writer_until_drained() {
    let mut fx = boot();
    fx.kernel.platform.tx_ready = false;

    for i in 0..IO_BUFFER_SIZE {
        assert_eq!(fx.syscall(SYSCALL_PUT_BYTE, &[(i % 251) as u64]), 0);
    }
    assert!(fx.kernel.console.out.is_full());
    assert_eq!(fx.kernel.sems.slot(fx.kernel.console.out_sem).value, 0);

    // The next writer parks under backpressure.
    let writer = fx.syscall_caller(SYSCALL_PUT_BYTE, &[b'Z' as u64]);
    assert_eq!(writer, MAIN_THREAD_ID);
    assert_eq!(
        fx.kernel.threads.tcb(writer).status,
        ThreadStatus::Suspended
    );

    // Draining frees a slot, wakes the writer, and its byte goes out in
    // the same drain pass.
    fx.kernel.platform.tx_ready = true;
    fx.kernel.flush_output();

    assert_eq!(fx.kernel.threads.tcb(writer).status, ThreadStatus::Ready);
    assert_eq!(fx.result_of(writer), 0);
    assert_eq!(fx.kernel.platform.tx.len(), IO_BUFFER_SIZE + 1);
    assert_eq!(*fx.kernel.platform.tx.last().unwrap(), b'Z');
    assert_eq!(
        fx.kernel.sems.slot(fx.kernel.console.out_sem).value,
        IO_BUFFER_SIZE as i64
    );
}

#[test]
fn test_get_byte_blocks_until_device_delivers() {
    let mut fx = boot();

    let reader = fx.syscall_caller(SYSCALL_GET_BYTE, &[]);
    assert_eq!(reader, MAIN_THREAD_ID);
    assert_eq!(
        fx.kernel.threads.tcb(reader).status,
        ThreadStatus::Suspended
    );

    fx.console_irq_with(b'x');

    // The wake's dispatch hands the core straight to the reader: it went
    // to the head of the ready queue before the interrupted thread was
    // re-queued behind it.
    assert_eq!(fx.kernel.current_thread(), reader);
    assert_eq!(
        fx.kernel.threads.tcb(reader).status,
        ThreadStatus::Running
    );
    assert_eq!(fx.result_of(reader), b'x' as i64);
    assert_eq!(fx.kernel.platform.completed, [TEST_CONSOLE_IRQ]);
    assert_eq!(fx.kernel.platform.external_clears, 1);
}

#[test]
fn test_get_byte_immediate_when_already_buffered() {
    let mut fx = boot();

    // Byte arrives before anyone asks for it.
    fx.console_irq_with(b'q');
    assert_eq!(fx.kernel.sems.slot(fx.kernel.console.in_sem).value, 1);

    fx.rotate_to(MAIN_THREAD_ID);
    assert_eq!(fx.syscall(SYSCALL_GET_BYTE, &[]), b'q' as i64);
    assert_eq!(fx.kernel.current_thread(), MAIN_THREAD_ID);
}

#[test]
fn test_full_input_buffer_drops_byte() {
    let mut fx = boot();
    while fx.kernel.console.inp.try_push(0) {}
    let sem_value = fx.kernel.sems.slot(fx.kernel.console.in_sem).value;

    fx.console_irq_with(b'!');

    // Claimed and completed, but the byte went nowhere.
    assert_eq!(fx.kernel.platform.completed, [TEST_CONSOLE_IRQ]);
    assert!(fx.kernel.platform.rx.is_empty());
    assert_eq!(fx.kernel.console.inp.len() as usize, IO_BUFFER_SIZE);
    assert_eq!(
        fx.kernel.sems.slot(fx.kernel.console.in_sem).value,
        sem_value
    );
}

#[test]
fn test_non_console_interrupt_is_only_acknowledged() {
    let mut fx = boot();
    fx.kernel.platform.claim_irq = 7;

    fx.kernel.handle_trap(TrapCause::External);

    assert_eq!(fx.kernel.platform.completed, [7]);
    assert_eq!(fx.kernel.platform.external_clears, 1);
    assert!(fx.kernel.platform.switches.is_empty());
}

#[test]
fn test_flush_masks_interrupts_around_drain() {
    let mut fx = boot();
    fx.syscall(SYSCALL_PUT_BYTE, &[b'm' as u64]);

    fx.kernel.flush_output();

    assert_eq!(fx.kernel.platform.mask_saves, 1);
    assert_eq!(fx.kernel.platform.mask_depth, 0);
}
