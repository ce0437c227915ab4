//! Intrusive thread lists.
//!
//! The ready queue, every semaphore's waiter list, and the sleep queue
//! are all doubly linked lists threaded through the TCBs' `next`/`prev`
//! handles. Each list stamps its members with a [`QueueTag`]; a TCB whose
//! tag is not `None` is refused by `push_back`, which makes the
//! at-most-one-list invariant a runtime check instead of an unlink
//! discipline.

use rvos_abi::task::{INVALID_THREAD_ID, SemId, ThreadId};

use crate::thread::ThreadTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueTag {
    None,
    Ready,
    /// Waiter list of the named semaphore.
    Waiters(SemId),
    Sleep,
}

pub struct ThreadList {
    head: ThreadId,
    tail: ThreadId,
    tag: QueueTag,
}

impl ThreadList {
    pub const fn new(tag: QueueTag) -> Self {
        Self {
            head: INVALID_THREAD_ID,
            tail: INVALID_THREAD_ID,
            tag,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head == INVALID_THREAD_ID
    }

    pub fn head(&self) -> Option<ThreadId> {
        (self.head != INVALID_THREAD_ID).then_some(self.head)
    }

    pub fn next_of(&self, threads: &ThreadTable, id: ThreadId) -> Option<ThreadId> {
        let next = threads.tcb(id).next;
        (next != INVALID_THREAD_ID).then_some(next)
    }

    /// Append `id`. Refused (false) if the TCB is already on some list.
    #[must_use]
    pub fn push_back(&mut self, threads: &mut ThreadTable, id: ThreadId) -> bool {
        if threads.tcb(id).queue_tag != QueueTag::None {
            return false;
        }

        let tcb = threads.tcb_mut(id);
        tcb.queue_tag = self.tag;
        tcb.next = INVALID_THREAD_ID;
        tcb.prev = self.tail;

        if self.tail != INVALID_THREAD_ID {
            threads.tcb_mut(self.tail).next = id;
        } else {
            self.head = id;
        }
        self.tail = id;
        true
    }

    /// Insert `id` directly before `before`, which must be a member.
    #[must_use]
    pub fn insert_before(
        &mut self,
        threads: &mut ThreadTable,
        id: ThreadId,
        before: ThreadId,
    ) -> bool {
        if threads.tcb(id).queue_tag != QueueTag::None
            || threads.tcb(before).queue_tag != self.tag
        {
            return false;
        }

        let prev = threads.tcb(before).prev;
        {
            let tcb = threads.tcb_mut(id);
            tcb.queue_tag = self.tag;
            tcb.next = before;
            tcb.prev = prev;
        }
        threads.tcb_mut(before).prev = id;
        if prev != INVALID_THREAD_ID {
            threads.tcb_mut(prev).next = id;
        } else {
            self.head = id;
        }
        true
    }

    pub fn pop_front(&mut self, threads: &mut ThreadTable) -> Option<ThreadId> {
        let id = self.head();
        if let Some(id) = id {
            self.detach(threads, id);
        }
        id
    }

    /// Remove `id` if it is a member of this list.
    pub fn unlink(&mut self, threads: &mut ThreadTable, id: ThreadId) -> bool {
        if threads.tcb(id).queue_tag != self.tag {
            return false;
        }
        self.detach(threads, id);
        true
    }

    fn detach(&mut self, threads: &mut ThreadTable, id: ThreadId) {
        let (prev, next) = {
            let tcb = threads.tcb_mut(id);
            let links = (tcb.prev, tcb.next);
            tcb.prev = INVALID_THREAD_ID;
            tcb.next = INVALID_THREAD_ID;
            tcb.queue_tag = QueueTag::None;
            links
        };

        if prev != INVALID_THREAD_ID {
            threads.tcb_mut(prev).next = next;
        } else {
            self.head = next;
        }
        if next != INVALID_THREAD_ID {
            threads.tcb_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }
    }

    pub fn len(&self, threads: &ThreadTable) -> usize {
        let mut count = 0;
        let mut curr = self.head();
        while let Some(id) = curr {
            count += 1;
            curr = self.next_of(threads, id);
        }
        count
    }
}
