use std::boxed::Box;
use std::vec::Vec;

use rvos_abi::layout::MEM_BLOCK_SIZE;

use crate::{BlockAllocator, MmError};

const ARENA_BYTES: usize = 64 * 1024;

#[repr(align(64))]
struct ArenaBuf([u8; ARENA_BYTES]);

struct Fixture {
    // Keeps the arena alive for as long as the allocator points into it.
    _arena: Box<ArenaBuf>,
    alloc: BlockAllocator,
}

fn fixture() -> Fixture {
    let mut arena = Box::new(ArenaBuf([0u8; ARENA_BYTES]));
    let start = arena.0.as_mut_ptr();
    let end = unsafe { start.add(ARENA_BYTES) };
    let alloc = unsafe { BlockAllocator::init(start, end) };
    Fixture {
        _arena: arena,
        alloc,
    }
}

fn free_runs(alloc: &BlockAllocator) -> Vec<(u32, u32)> {
    let mut runs = Vec::new();
    alloc.for_each_free_run(|offset, len| runs.push((offset, len)));
    runs
}

#[test]
fn test_init_seeds_single_run() {
    let fx = fixture();
    let stats = fx.alloc.stats();
    assert!(stats.total_blocks > 0);
    assert_eq!(stats.free_runs, 1);
    assert_eq!(stats.free_blocks, stats.total_blocks);
    assert_eq!(stats.allocated_blocks, 0);
}

#[test]
fn test_allocations_disjoint_and_accounted() {
    let mut fx = fixture();
    let total = fx.alloc.stats().total_blocks;

    let sizes = [1u32, 4, 2, 7, 1, 3];
    let mut live: Vec<(usize, usize)> = Vec::new();
    for &n in &sizes {
        let p = fx.alloc.alloc(n).unwrap() as usize;
        assert_eq!(p % MEM_BLOCK_SIZE, 0);
        live.push((p, n as usize * MEM_BLOCK_SIZE));
    }

    for (i, &(a_start, a_len)) in live.iter().enumerate() {
        for &(b_start, b_len) in &live[i + 1..] {
            let disjoint = a_start + a_len <= b_start || b_start + b_len <= a_start;
            assert!(disjoint, "allocations overlap");
        }
    }

    let stats = fx.alloc.stats();
    let handed_out: u32 = sizes.iter().sum();
    assert_eq!(stats.allocated_blocks, handed_out);
    assert_eq!(stats.free_blocks + stats.allocated_blocks, total);
}

#[test]
fn test_free_coalesces_in_any_order() {
    for order in [[0usize, 1, 2], [2, 1, 0], [1, 0, 2], [0, 2, 1]] {
        let mut fx = fixture();
        let total = fx.alloc.stats().total_blocks;

        let ptrs = [
            fx.alloc.alloc(2).unwrap(),
            fx.alloc.alloc(3).unwrap(),
            fx.alloc.alloc(2).unwrap(),
        ];
        for idx in order {
            fx.alloc.free(ptrs[idx]).unwrap();
        }

        let stats = fx.alloc.stats();
        assert_eq!(stats.free_runs, 1, "order {order:?} left fragments");
        assert_eq!(stats.free_blocks, total);
        assert_eq!(stats.allocated_blocks, 0);
    }
}

#[test]
fn test_best_fit_prefers_smallest_run() {
    let mut fx = fixture();

    // Carve two small free runs out of the front of the arena, fenced
    // off by live single-block allocations so they cannot merge.
    let run3 = fx.alloc.alloc(3).unwrap();
    let _fence1 = fx.alloc.alloc(1).unwrap();
    let run5 = fx.alloc.alloc(5).unwrap();
    let _fence2 = fx.alloc.alloc(1).unwrap();
    fx.alloc.free(run3).unwrap();
    fx.alloc.free(run5).unwrap();
    // Free list: 3-run, 5-run, huge tail.
    assert_eq!(free_runs(&fx.alloc).len(), 3);

    // Smallest qualifying run wins even though the tail also fits.
    let p = fx.alloc.alloc(2).unwrap();
    assert_eq!(p, run3);
    // The remainder of the 3-run stays free.
    let p2 = fx.alloc.alloc(1).unwrap();
    assert_eq!(p2 as usize, run3 as usize + 2 * MEM_BLOCK_SIZE);
}

#[test]
fn test_exact_fit_consumes_whole_run() {
    let mut fx = fixture();

    let run2 = fx.alloc.alloc(2).unwrap();
    let _fence = fx.alloc.alloc(1).unwrap();
    fx.alloc.free(run2).unwrap();
    assert_eq!(fx.alloc.stats().free_runs, 2);

    // An exact match removes the run from the list entirely.
    let p = fx.alloc.alloc(2).unwrap();
    assert_eq!(p, run2);
    assert_eq!(fx.alloc.stats().free_runs, 1);
}

#[test]
fn test_double_free_rejected() {
    let mut fx = fixture();

    let p = fx.alloc.alloc(4).unwrap();
    fx.alloc.free(p).unwrap();
    let before = fx.alloc.stats();

    assert_eq!(fx.alloc.free(p), Err(MmError::NotUsed));
    assert_eq!(fx.alloc.stats(), before);
}

#[test]
fn test_free_rejects_foreign_addresses() {
    let mut fx = fixture();

    let p = fx.alloc.alloc(3).unwrap();

    assert_eq!(
        fx.alloc.free(core::ptr::null_mut()),
        Err(MmError::AddressNull)
    );
    assert_eq!(
        fx.alloc.free(unsafe { p.add(1) }),
        Err(MmError::NotAligned)
    );
    // Block-aligned but interior to a live allocation.
    assert_eq!(
        fx.alloc.free(unsafe { p.add(MEM_BLOCK_SIZE) }),
        Err(MmError::NotUsed)
    );
    // Aligned address that was never handed out.
    let never = unsafe { p.add(16 * MEM_BLOCK_SIZE) };
    assert_eq!(fx.alloc.free(never), Err(MmError::NotUsed));

    // The live allocation is untouched by the rejected calls.
    fx.alloc.free(p).unwrap();
}

#[test]
fn test_exhaustion_and_recovery() {
    let mut fx = fixture();
    let total = fx.alloc.stats().total_blocks;

    assert!(fx.alloc.alloc(total + 1).is_none());
    assert!(fx.alloc.alloc(0).is_none());

    let everything = fx.alloc.alloc(total).unwrap();
    assert!(fx.alloc.alloc(1).is_none());

    fx.alloc.free(everything).unwrap();
    assert!(fx.alloc.alloc(1).is_some());
}

#[test]
fn test_churn_preserves_accounting() {
    let mut fx = fixture();
    let total = fx.alloc.stats().total_blocks;

    let mut live: Vec<*mut u8> = Vec::new();
    for round in 0..8u32 {
        for n in 1..=6u32 {
            live.push(fx.alloc.alloc(n).unwrap());
        }
        // Drop every other allocation, alternating phase per round.
        let mut idx = 0;
        live.retain(|&p| {
            idx += 1;
            if (idx + round) % 2 == 0 {
                fx.alloc.free(p).unwrap();
                false
            } else {
                true
            }
        });

        let stats = fx.alloc.stats();
        assert_eq!(stats.free_blocks + stats.allocated_blocks, total);
        // Free runs stay address sorted and non-adjacent.
        let runs = free_runs(&fx.alloc);
        for pair in runs.windows(2) {
            assert!(pair[0].0 + pair[0].1 < pair[1].0);
        }
    }

    for p in live {
        fx.alloc.free(p).unwrap();
    }
    let stats = fx.alloc.stats();
    assert_eq!(stats.free_runs, 1);
    assert_eq!(stats.free_blocks, total);
}
