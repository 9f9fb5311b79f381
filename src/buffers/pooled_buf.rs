use std::fmt::{Debug, Formatter};
use bytes::buf::UninitSlice;

/// A buffer handed out by [MemoryManager::acquire_pooled](crate::buffers::memory_manager::MemoryManager::acquire_pooled).
///  Its capacity is fixed when it is created, and writing beyond it panics.
///
/// The buffer remembers which size class bucket it came from so the memory manager can put it
///  back there. It is moved into `release_pooled()`, so neither the buffer nor a view into it
///  can be used after it went back to the pool.
pub struct PooledBuf {
    buf: Vec<u8>,
    len: usize,
    /// `None` for oversized buffers that the pool does not retain
    size_class: Option<usize>,
}

impl PooledBuf {
    pub(crate) fn new(capacity: usize, size_class: Option<usize>) -> PooledBuf {
        PooledBuf {
            // allocated once and then reused, so zeroing up front is not on the hot path
            buf: vec![0; capacity],
            len: 0,
            size_class,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }

    pub(crate) fn size_class(&self) -> Option<usize> {
        self.size_class
    }
}

impl Debug for PooledBuf {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PooledBuf({}/{} bytes, size class {:?})", self.len, self.capacity(), self.size_class)
    }
}

impl AsRef<[u8]> for PooledBuf {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

unsafe impl bytes::BufMut for PooledBuf {
    fn remaining_mut(&self) -> usize {
        self.capacity() - self.len
    }

    unsafe fn advance_mut(&mut self, cnt: usize) {
        assert!(cnt <= self.remaining_mut(), "advancing {} bytes with only {} remaining", cnt, self.remaining_mut());
        self.len += cnt;
    }

    fn chunk_mut(&mut self) -> &mut UninitSlice {
        UninitSlice::new(&mut self.buf[self.len..])
    }
}
