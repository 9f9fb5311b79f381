use std::fmt::{Debug, Formatter};

/// A standalone heap allocation that is not managed by the pool. This is what message content
///  is copied into when it has to outlive the buffer it arrived in, e.g. while it waits in a
///  channel's reorder buffer.
///
/// Instances are only created by [MemoryManager::acquire_standalone](crate::buffers::memory_manager::MemoryManager::acquire_standalone),
///  which keeps track of how many of them are outstanding.
#[derive(Eq)]
pub struct OwnedBuf {
    buf: Vec<u8>,
}
impl OwnedBuf {
    pub(crate) fn with_capacity(capacity: usize) -> OwnedBuf {
        OwnedBuf {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl PartialEq for OwnedBuf {
    fn eq(&self, other: &Self) -> bool {
        self.buf == other.buf
    }
}

impl Debug for OwnedBuf {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.buf.fmt(f)
    }
}

impl AsRef<[u8]> for OwnedBuf {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}
