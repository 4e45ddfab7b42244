//! A pool of read buffers sized to the configured maximum message, so steady-state operation
//! allocates nothing per record.

use crossbeam_queue::SegQueue;

/// A lock-free stack of spare `Vec<u8>` buffers, each sized to hold one `max_msg_size` record.
///
/// [`BufferPool::release`] only accepts a buffer back if its capacity still matches
/// `max_msg_size` exactly -- a caller handing back something else (or nothing at all) just
/// means the pool allocates fresh next time. There is no upper bound on outstanding buffers.
#[derive(Debug)]
pub struct BufferPool {
    max_msg_size: usize,
    free: SegQueue<Vec<u8>>,
}

impl BufferPool {
    pub fn new(max_msg_size: i32) -> Self {
        Self {
            max_msg_size: max_msg_size.max(0) as usize,
            free: SegQueue::new(),
        }
    }

    /// Takes a buffer from the pool, or allocates a fresh `max_msg_size`-capacity one.
    pub fn acquire(&self) -> Vec<u8> {
        self.free.pop().unwrap_or_else(|| Vec::with_capacity(self.max_msg_size))
    }

    /// Returns a buffer to the pool, re-extended to full capacity, but only if its capacity
    /// still equals `max_msg_size`; otherwise it is dropped.
    pub fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() != self.max_msg_size {
            return;
        }
        buf.clear();
        buf.resize(self.max_msg_size, 0);
        self.free.push(buf);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.free.len()
    }
}
