use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use tracing::{debug, trace};
use crate::buffers::owned_buf::OwnedBuf;
use crate::buffers::pooled_buf::PooledBuf;
use crate::config::MemoryConfig;
use crate::safe_converter::SafeCast;

/// The memory manager is shared by all channels and connections of a process (wrapped in an
///  `Arc`). It has two kinds of buffers:
///
/// * *pooled* buffers for short-lived use, e.g. for framing an outgoing message. They come from
///    free lists bucketed by power-of-two size classes and go back there after use.
/// * *standalone* buffers for content that must be retained beyond the current call. These are
///    regular heap allocations owned by the caller.
///
/// Each bucket has its own lock, and a buffer is in exactly one place at any time (in a bucket
///  or owned by a caller), so concurrent acquire / release never race on the same buffer.
pub struct MemoryManager {
    min_size_class: usize,
    max_size_class: usize,
    max_pooled_per_class: usize,
    buckets: Vec<Mutex<Vec<PooledBuf>>>,

    pooled_acquired: AtomicU64,
    pooled_created: AtomicU64,
    pooled_released: AtomicU64,
    pooled_discarded: AtomicU64,
    standalone_outstanding: AtomicU64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub pooled_acquired: u64,
    /// pooled buffers that had to be allocated because their bucket was empty
    pub pooled_created: u64,
    pub pooled_released: u64,
    /// released buffers that were not retained, either because their bucket was full or because
    ///  they were oversized
    pub pooled_discarded: u64,
    pub standalone_outstanding: u64,
}

impl MemoryManager {
    pub fn new(config: &MemoryConfig) -> anyhow::Result<MemoryManager> {
        config.validate()?;

        let num_buckets = (config.max_size_class.trailing_zeros() - config.min_size_class.trailing_zeros() + 1) as usize;

        Ok(MemoryManager {
            min_size_class: config.min_size_class,
            max_size_class: config.max_size_class,
            max_pooled_per_class: config.max_pooled_per_class,
            buckets: (0..num_buckets)
                .map(|_| Mutex::new(Vec::new()))
                .collect(),
            pooled_acquired: AtomicU64::new(0),
            pooled_created: AtomicU64::new(0),
            pooled_released: AtomicU64::new(0),
            pooled_discarded: AtomicU64::new(0),
            standalone_outstanding: AtomicU64::new(0),
        })
    }

    /// returns the bucket index for a requested size, or `None` if the size is bigger than the
    ///  biggest size class
    fn size_class_index(&self, size: usize) -> Option<usize> {
        if size > self.max_size_class {
            return None;
        }
        let class = size.max(self.min_size_class).next_power_of_two();
        Some((class.trailing_zeros() - self.min_size_class.trailing_zeros()) as usize)
    }

    fn size_class_capacity(&self, index: usize) -> usize {
        self.min_size_class << index
    }

    /// Get an empty buffer with a capacity of at least `size` bytes. This never fails: If the
    ///  corresponding bucket is empty, a new buffer is allocated.
    pub fn acquire_pooled(&self, size: usize) -> PooledBuf {
        self.pooled_acquired.fetch_add(1, Ordering::Relaxed);

        let Some(index) = self.size_class_index(size) else {
            debug!("requested buffer size {} exceeds the biggest size class {}: creating unpooled buffer", size, self.max_size_class);
            self.pooled_created.fetch_add(1, Ordering::Relaxed);
            return PooledBuf::new(size, None);
        };

        if let Some(buffer) = self.buckets[index].lock().pop() {
            trace!("returning buffer from pool");
            return buffer;
        }

        debug!("no buffer in pool for size class {}: creating new buffer", self.size_class_capacity(index));
        self.pooled_created.fetch_add(1, Ordering::Relaxed);
        PooledBuf::new(self.size_class_capacity(index), Some(index))
    }

    pub fn release_pooled(&self, mut buffer: PooledBuf) {
        self.pooled_released.fetch_add(1, Ordering::Relaxed);

        let Some(index) = buffer.size_class() else {
            trace!("discarding oversized buffer");
            self.pooled_discarded.fetch_add(1, Ordering::Relaxed);
            return;
        };
        assert_eq!(buffer.capacity(), self.size_class_capacity(index),
                   "returned buffer does not have the capacity of its size class - it was probably acquired from a different memory manager");

        buffer.clear();

        let mut bucket = self.buckets[index].lock();
        if bucket.len() < self.max_pooled_per_class {
            trace!("returning buffer to pool");
            bucket.push(buffer);
        }
        else {
            debug!("pool is full for size class {}: discarding returned buffer", self.size_class_capacity(index));
            self.pooled_discarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get an empty buffer that is not managed by the pool, with room for at least `size` bytes.
    pub fn acquire_standalone(&self, size: usize) -> OwnedBuf {
        self.standalone_outstanding.fetch_add(1, Ordering::Relaxed);
        OwnedBuf::with_capacity(size)
    }

    /// Free a standalone buffer. Dropping it has the same effect on memory, but releasing it
    ///  explicitly keeps the memory manager's statistics accurate.
    pub fn release_standalone(&self, buffer: OwnedBuf) {
        self.standalone_outstanding.fetch_sub(1, Ordering::Relaxed);
        trace!("freeing standalone buffer of {} bytes", buffer.len());
        drop(buffer);
    }

    /// the number of buffers currently retained in the pool, summed over all buckets
    pub fn num_pooled(&self) -> usize {
        self.buckets.iter()
            .map(|b| b.lock().len())
            .sum()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            pooled_acquired: self.pooled_acquired.load(Ordering::Relaxed),
            pooled_created: self.pooled_created.load(Ordering::Relaxed),
            pooled_released: self.pooled_released.load(Ordering::Relaxed),
            pooled_discarded: self.pooled_discarded.load(Ordering::Relaxed),
            standalone_outstanding: self.standalone_outstanding.load(Ordering::Relaxed),
        }
    }

    /// total bytes held by idle pooled buffers
    pub fn pooled_bytes(&self) -> u64 {
        self.buckets.iter()
            .enumerate()
            .map(|(index, b)| <usize as SafeCast<u64>>::safe_cast(b.lock().len() * self.size_class_capacity(index)))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use bytes::BufMut;
    use rstest::rstest;
    use super::*;

    fn memory_manager(max_pooled_per_class: usize) -> MemoryManager {
        MemoryManager::new(&MemoryConfig {
            min_size_class: 64,
            max_size_class: 1024,
            max_pooled_per_class,
        }).unwrap()
    }

    #[rstest]
    #[case::swapped(4096, 64)]
    #[case::min_not_pow2(100, 1024)]
    #[case::max_not_pow2(64, 1000)]
    fn test_new_rejects_invalid_config(#[case] min_size_class: usize, #[case] max_size_class: usize) {
        let result = MemoryManager::new(&MemoryConfig {
            min_size_class,
            max_size_class,
            max_pooled_per_class: 10,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_single_size_class() {
        let mm = MemoryManager::new(&MemoryConfig {
            min_size_class: 256,
            max_size_class: 256,
            max_pooled_per_class: 10,
        }).unwrap();

        assert_eq!(mm.acquire_pooled(1).capacity(), 256);
        assert_eq!(mm.acquire_pooled(257).capacity(), 257);
    }

    #[rstest]
    #[case::zero(0, 64)]
    #[case::tiny(1, 64)]
    #[case::min(64, 64)]
    #[case::above_min(65, 128)]
    #[case::mid(600, 1024)]
    #[case::max(1024, 1024)]
    #[case::oversized(1025, 1025)]
    #[case::huge(5000, 5000)]
    fn test_acquire_capacity(#[case] size: usize, #[case] expected_capacity: usize) {
        let mm = memory_manager(10);
        let buf = mm.acquire_pooled(size);
        assert_eq!(buf.capacity(), expected_capacity);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_release_and_reuse_clears() {
        let mm = memory_manager(10);

        let mut buf = mm.acquire_pooled(100);
        buf.put_slice(b"abc");
        mm.release_pooled(buf);
        assert_eq!(mm.num_pooled(), 1);
        assert_eq!(mm.pooled_bytes(), 128);

        let buf = mm.acquire_pooled(90);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 128);
        assert_eq!(mm.num_pooled(), 0);

        assert_eq!(mm.stats(), MemoryStats {
            pooled_acquired: 2,
            pooled_created: 1,
            pooled_released: 1,
            pooled_discarded: 0,
            standalone_outstanding: 0,
        });
    }

    #[rstest]
    #[case::smallest(10, Some(0), 64)]
    #[case::second(100, Some(1), 128)]
    #[case::largest(1000, Some(4), 1024)]
    #[case::oversized(1500, None, 1500)]
    fn test_size_class_tag(#[case] size: usize, #[case] expected_class: Option<usize>, #[case] expected_capacity: usize) {
        let mm = memory_manager(10);
        let buf = mm.acquire_pooled(size);
        assert_eq!(buf.size_class(), expected_class);
        assert_eq!(buf.capacity(), expected_capacity);
    }

    #[test]
    fn test_reused_buffer_keeps_size_class() {
        let mm = memory_manager(10);

        let mut buf = mm.acquire_pooled(200);
        buf.put_slice(&[1; 200]);
        mm.release_pooled(buf);

        let buf = mm.acquire_pooled(150);
        assert_eq!(buf.size_class(), Some(2));
        assert_eq!(buf.capacity(), 256);
        mm.release_pooled(buf);

        assert_eq!(mm.num_pooled(), 1);
        assert_eq!(mm.stats().pooled_created, 1);
    }

    #[test]
    fn test_buckets_are_separate() {
        let mm = memory_manager(10);

        mm.release_pooled(mm.acquire_pooled(100));
        let buf = mm.acquire_pooled(10);
        assert_eq!(buf.capacity(), 64);
        assert_eq!(mm.num_pooled(), 1);
        assert_eq!(mm.stats().pooled_created, 2);
    }

    #[test]
    fn test_bucket_bound() {
        let mm = memory_manager(2);

        let bufs = (0..3).map(|_| mm.acquire_pooled(64)).collect::<Vec<_>>();
        for buf in bufs {
            mm.release_pooled(buf);
        }

        assert_eq!(mm.num_pooled(), 2);
        assert_eq!(mm.stats().pooled_discarded, 1);
    }

    #[test]
    fn test_oversized_is_not_retained() {
        let mm = memory_manager(10);

        mm.release_pooled(mm.acquire_pooled(2000));
        assert_eq!(mm.num_pooled(), 0);
        assert_eq!(mm.stats().pooled_discarded, 1);
    }

    #[test]
    #[should_panic]
    fn test_release_foreign_buffer() {
        let mm = memory_manager(10);
        let other = MemoryManager::new(&MemoryConfig {
            min_size_class: 32,
            max_size_class: 1024,
            max_pooled_per_class: 10,
        }).unwrap();

        mm.release_pooled(other.acquire_pooled(40));
    }

    #[test]
    fn test_standalone() {
        let mm = memory_manager(10);

        let mut buf = mm.acquire_standalone(5);
        buf.extend_from_slice(b"hello");
        assert_eq!(buf.as_ref(), b"hello");
        assert_eq!(mm.stats().standalone_outstanding, 1);

        mm.release_standalone(buf);
        assert_eq!(mm.stats().standalone_outstanding, 0);
        assert_eq!(mm.num_pooled(), 0);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let mm = Arc::new(memory_manager(64));

        let handles = (0..8)
            .map(|i| {
                let mm = mm.clone();
                std::thread::spawn(move || {
                    for n in 0..1000 {
                        let mut buf = mm.acquire_pooled(64 + (n % 3) * 100);
                        buf.put_u8(i);
                        assert_eq!(buf.as_ref(), &[i]);
                        mm.release_pooled(buf);
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = mm.stats();
        assert_eq!(stats.pooled_acquired, 8000);
        assert_eq!(stats.pooled_released, 8000);
        assert!(mm.num_pooled() <= 8 * 3);
    }
}
