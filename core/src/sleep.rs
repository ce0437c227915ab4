//! The delta sleep queue.
//!
//! Sleepers are kept in one intrusive list storing *relative* ticks: each
//! TCB's `sleep_for` is the ticks beyond its predecessor's expiry, so the
//! sum from the head through any node is that node's absolute remaining
//! time. One head decrement per timer tick then ages every sleeper at
//! once. Ties wake in insertion order.

use rvos_abi::task::{ThreadId, ThreadStatus};

use crate::queue::{QueueTag, ThreadList};
use crate::thread::ThreadTable;

pub struct SleepList {
    list: ThreadList,
}

impl SleepList {
    pub const fn new() -> Self {
        Self {
            list: ThreadList::new(QueueTag::Sleep),
        }
    }

    /// Suspend `id` for `ticks` and insert it at its expiry position.
    #[must_use]
    pub fn put_to_sleep(&mut self, threads: &mut ThreadTable, id: ThreadId, ticks: i64) -> bool {
        threads.tcb_mut(id).status = ThreadStatus::Suspended;

        // Walk the queue summing relative deltas until the cumulative
        // total passes the requested ticks; that node becomes the
        // successor and absorbs the difference.
        let mut total: i64 = 0;
        let mut curr = self.list.head();
        while let Some(node) = curr {
            let node_sleep = threads.tcb(node).sleep_for;
            total += node_sleep;
            if ticks >= total {
                curr = self.list.next_of(threads, node);
                continue;
            }

            total -= node_sleep;
            let delta = ticks - total;
            threads.tcb_mut(id).sleep_for = delta;
            threads.tcb_mut(node).sleep_for = node_sleep - delta;
            return self.list.insert_before(threads, id, node);
        }

        // Sleeps at least as long as everything queued: append the
        // remainder past the current tail.
        threads.tcb_mut(id).sleep_for = ticks - total;
        self.list.push_back(threads, id)
    }

    /// Age the queue by one tick.
    pub fn tick(&mut self, threads: &mut ThreadTable) {
        if let Some(head) = self.list.head() {
            threads.tcb_mut(head).sleep_for -= 1;
        }
    }

    /// Pop the head if its time has expired. Several sleepers can expire
    /// on the same tick; callers drain in a loop.
    pub fn pop_expired(&mut self, threads: &mut ThreadTable) -> Option<ThreadId> {
        let head = self.list.head()?;
        if threads.tcb(head).sleep_for <= 0 {
            self.list.pop_front(threads)
        } else {
            None
        }
    }

    pub fn len(&self, threads: &ThreadTable) -> usize {
        self.list.len(threads)
    }
}
