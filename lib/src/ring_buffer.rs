/// Fixed-capacity ring buffer with head/tail/count indices, used for the
/// console byte queues.
#[derive(Debug)]
pub struct RingBuffer<T, const N: usize> {
    data: [T; N],
    head: u32,
    tail: u32,
    count: u32,
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    /// Create a new ring buffer with all elements set to the given value.
    /// Const-compatible so buffers can live in static storage.
    #[inline(always)]
    pub const fn new_with(value: T) -> Self {
        Self {
            data: [value; N],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    #[inline(always)]
    pub const fn len(&self) -> u32 {
        self.count
    }

    #[inline(always)]
    pub const fn capacity(&self) -> u32 {
        N as u32
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline(always)]
    pub const fn is_full(&self) -> bool {
        self.count >= self.capacity()
    }

    /// Push without overwrite; returns true on success, false if full.
    #[inline(always)]
    pub fn try_push(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.data[self.head as usize] = value;
        self.head = (self.head + 1) % self.capacity();
        self.count += 1;
        true
    }

    /// Pop the oldest element; `None` when empty.
    #[inline(always)]
    pub fn try_pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.data[self.tail as usize];
        self.tail = (self.tail + 1) % self.capacity();
        self.count -= 1;
        Some(value)
    }

    /// Peek at the oldest element without removing it.
    #[inline(always)]
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        Some(&self.data[self.tail as usize])
    }
}
