//! Block-granularity heap allocator.
//!
//! The heap arena is split into [`MEM_BLOCK_SIZE`]-byte blocks. Free space
//! is tracked by an address-sorted doubly linked list of free runs whose
//! headers live *inside* the freed memory itself, so bookkeeping costs no
//! space beyond a side table recording, for the first block of each live
//! allocation, how many blocks it spans.
//!
//! Two invariants hold at every quiescent point:
//! - the free list never contains two address-adjacent runs (adjacency is
//!   merged on free), and never overlaps allocated space;
//! - `alloc_table[i] != 0` iff block `i` is the first block of a live
//!   allocation.
//!
//! Correctness of the in-place header scheme depends entirely on `free`
//! rejecting foreign addresses, so the null/alignment/not-used checks run
//! before the header is written.

use core::ptr;

use rvos_abi::layout::{MEM_BLOCK_SIZE, to_blocks};
use rvos_lib::klog_info;

use crate::error::{MmError, MmResult};

/// Header of one contiguous run of free blocks, embedded at the run's
/// starting address.
#[repr(C)]
struct FreeRun {
    next: *mut FreeRun,
    prev: *mut FreeRun,
    n_blocks: u32,
}

/// Counters reported by [`BlockAllocator::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Blocks the arena can hand out in total.
    pub total_blocks: u32,
    /// Blocks currently on the free list.
    pub free_blocks: u32,
    /// Number of free runs.
    pub free_runs: u32,
    /// Blocks recorded in the allocation table.
    pub allocated_blocks: u32,
}

pub struct BlockAllocator {
    /// First block-aligned byte past the allocation table.
    heap_start: *mut u8,
    /// Blocks between `heap_start` and the arena end.
    heap_blocks: u32,
    /// One entry per block: span of the allocation starting there, or 0.
    alloc_table: *mut u32,
    fb_head: *mut FreeRun,
}

// SAFETY: BlockAllocator owns its arena exclusively; access is serialized
// by the kernel lock one level up.
unsafe impl Send for BlockAllocator {}

impl BlockAllocator {
    /// Take ownership of the arena `[heap_start, heap_end)`.
    ///
    /// The allocation table is carved from the front of the arena, the
    /// remainder realigned to block granularity and seeded as one free
    /// run spanning everything.
    ///
    /// # Safety
    ///
    /// The range must be valid, writable, unused by anything else, and
    /// at least large enough for the table plus a few blocks.
    pub unsafe fn init(heap_start: *mut u8, heap_end: *mut u8) -> Self {
        let table_entries = (heap_end as usize - heap_start as usize) / MEM_BLOCK_SIZE;

        let alloc_table = heap_start as *mut u32;
        unsafe { ptr::write_bytes(alloc_table, 0, table_entries) };

        let mut first_block = unsafe { heap_start.add(table_entries * size_of::<u32>()) };
        let misalign = first_block as usize % MEM_BLOCK_SIZE;
        if misalign > 0 {
            first_block = unsafe { first_block.add(MEM_BLOCK_SIZE - misalign) };
        }

        let heap_blocks = ((heap_end as usize - first_block as usize) / MEM_BLOCK_SIZE) as u32;

        let fb_head = first_block as *mut FreeRun;
        unsafe {
            (*fb_head).n_blocks = heap_blocks;
            (*fb_head).next = ptr::null_mut();
            (*fb_head).prev = ptr::null_mut();
        }

        klog_info!(
            "MM: block allocator over {} blocks of {} bytes",
            heap_blocks,
            MEM_BLOCK_SIZE
        );

        Self {
            heap_start: first_block,
            heap_blocks,
            alloc_table,
            fb_head,
        }
    }

    fn block_index(&self, address: *mut u8) -> u32 {
        ((address as usize - self.heap_start as usize) / MEM_BLOCK_SIZE) as u32
    }

    /// Allocate a run of `n_blocks` contiguous blocks, best fit.
    ///
    /// Among qualifying runs the smallest wins, earliest-in-list on ties;
    /// an exact-size run ends the search immediately. Returns `None` when
    /// no run qualifies.
    pub fn alloc(&mut self, n_blocks: u32) -> Option<*mut u8> {
        if n_blocks == 0 {
            return None;
        }

        let mut best: *mut FreeRun = ptr::null_mut();
        let mut curr = self.fb_head;
        while !curr.is_null() && (best.is_null() || unsafe { (*best).n_blocks } != n_blocks) {
            unsafe {
                if (*curr).n_blocks >= n_blocks
                    && (best.is_null() || (*curr).n_blocks < (*best).n_blocks)
                {
                    best = curr;
                }
                curr = (*curr).next;
            }
        }

        if best.is_null() {
            return None;
        }

        unsafe {
            let remaining_blocks = (*best).n_blocks - n_blocks;
            if to_blocks(size_of::<FreeRun>()) as u32 <= remaining_blocks {
                // The tail of the run can host a header: keep it free,
                // relinked in place of the old run.
                let new_fb =
                    (best as *mut u8).add(n_blocks as usize * MEM_BLOCK_SIZE) as *mut FreeRun;
                (*new_fb).n_blocks = remaining_blocks;
                (*new_fb).next = (*best).next;
                (*new_fb).prev = (*best).prev;
                if !(*new_fb).prev.is_null() {
                    (*(*new_fb).prev).next = new_fb;
                }
                if !(*new_fb).next.is_null() {
                    (*(*new_fb).next).prev = new_fb;
                }
                if self.fb_head == best {
                    self.fb_head = new_fb;
                }
            } else {
                // Remainder too small for a header; consume the whole run.
                if !(*best).prev.is_null() {
                    (*(*best).prev).next = (*best).next;
                }
                if !(*best).next.is_null() {
                    (*(*best).next).prev = (*best).prev;
                }
                if self.fb_head == best {
                    self.fb_head = (*best).next;
                }
            }

            let address = best as *mut u8;
            *self.alloc_table.add(self.block_index(address) as usize) = n_blocks;
            Some(address)
        }
    }

    /// Return an allocation to the free list and merge with its direct
    /// address neighbors.
    pub fn free(&mut self, address: *mut u8) -> MmResult {
        if address.is_null() {
            return Err(MmError::AddressNull);
        }
        if address as usize % MEM_BLOCK_SIZE != 0 {
            return Err(MmError::NotAligned);
        }
        if (address as usize) < self.heap_start as usize
            || self.block_index(address) >= self.heap_blocks
        {
            return Err(MmError::NotUsed);
        }

        let idx = self.block_index(address) as usize;
        let n_blocks = unsafe { *self.alloc_table.add(idx) };
        if n_blocks == 0 {
            return Err(MmError::NotUsed);
        }

        // Locate the sorted insertion point. An address strictly inside an
        // existing free run means a double free or corrupted table.
        let new_fb = address as *mut FreeRun;
        let mut prev: *mut FreeRun = ptr::null_mut();
        let mut curr = self.fb_head;
        while !curr.is_null() && new_fb >= curr {
            unsafe {
                let run_end = (curr as *mut u8).add((*curr).n_blocks as usize * MEM_BLOCK_SIZE);
                if (new_fb as *mut u8) < run_end {
                    return Err(MmError::NotUsed);
                }
                prev = curr;
                curr = (*curr).next;
            }
        }

        // Only now that the checks passed is the header written over the
        // freed memory.
        unsafe {
            (*new_fb).n_blocks = n_blocks;

            if !prev.is_null() {
                (*new_fb).prev = prev;
                (*new_fb).next = (*prev).next;
                if !(*new_fb).next.is_null() {
                    (*(*new_fb).next).prev = new_fb;
                }
                (*prev).next = new_fb;
            } else {
                (*new_fb).next = self.fb_head;
                (*new_fb).prev = ptr::null_mut();
                if !self.fb_head.is_null() {
                    (*self.fb_head).prev = new_fb;
                }
                self.fb_head = new_fb;
            }

            *self.alloc_table.add(idx) = 0;

            Self::merge_with_next(new_fb);
            Self::merge_with_next((*new_fb).prev);
        }

        Ok(())
    }

    /// Merge `fb` with its list successor iff the successor starts exactly
    /// where `fb` ends. Not reapplied transitively; longer chains are
    /// picked up by the next adjoining free.
    unsafe fn merge_with_next(fb: *mut FreeRun) {
        if fb.is_null() {
            return;
        }
        unsafe {
            let run_end = (fb as *mut u8).add((*fb).n_blocks as usize * MEM_BLOCK_SIZE);
            let next = (*fb).next;
            if !next.is_null() && next == run_end as *mut FreeRun {
                (*fb).n_blocks += (*next).n_blocks;
                (*fb).next = (*next).next;
                if !(*fb).next.is_null() {
                    (*(*fb).next).prev = fb;
                }
            }
        }
    }

    pub fn stats(&self) -> AllocStats {
        let mut stats = AllocStats {
            total_blocks: self.heap_blocks,
            ..AllocStats::default()
        };

        let mut curr = self.fb_head;
        while !curr.is_null() {
            unsafe {
                stats.free_blocks += (*curr).n_blocks;
                stats.free_runs += 1;
                curr = (*curr).next;
            }
        }

        for idx in 0..self.heap_blocks as usize {
            stats.allocated_blocks += unsafe { *self.alloc_table.add(idx) };
        }

        stats
    }

    /// Visit every free run in list (address) order as (offset from heap
    /// start in blocks, run length in blocks).
    pub fn for_each_free_run(&self, mut visit: impl FnMut(u32, u32)) {
        let mut curr = self.fb_head;
        while !curr.is_null() {
            unsafe {
                visit(self.block_index(curr as *mut u8), (*curr).n_blocks);
                curr = (*curr).next;
            }
        }
    }
}
