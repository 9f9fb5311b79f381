use std::fmt::{Debug, Formatter};
use crate::buffers::memory_manager::MemoryManager;
use crate::buffers::owned_buf::OwnedBuf;

/// A released message payload, either as a zero-copy view into the datagram it arrived in, or
///  as a standalone copy that was retained across calls.
///
/// The lifetime ties `Direct` views to the caller's receive buffer, so they cannot be kept after
///  that buffer is reused. Code that needs the content longer must copy it (or use
///  [MemoryPointer::into_owned]).
///
/// `Allocated` buffers should go back to the [MemoryManager] via
///  [MemoryManager::release_standalone] when the caller is done with them.
pub enum MemoryPointer<'a> {
    Direct(&'a [u8]),
    Allocated(OwnedBuf),
}

impl<'a> MemoryPointer<'a> {
    pub fn is_direct(&self) -> bool {
        matches!(self, MemoryPointer::Direct(_))
    }

    pub fn is_allocated(&self) -> bool {
        matches!(self, MemoryPointer::Allocated(_))
    }

    pub fn direct(&self) -> Option<&'a [u8]> {
        match self {
            MemoryPointer::Direct(data) => Some(data),
            MemoryPointer::Allocated(_) => None,
        }
    }

    pub fn allocated(&self) -> Option<&OwnedBuf> {
        match self {
            MemoryPointer::Direct(_) => None,
            MemoryPointer::Allocated(buf) => Some(buf),
        }
    }

    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_ref().is_empty()
    }

    /// Copies a direct view into a standalone buffer from `memory_manager`, so the result no
    ///  longer borrows the receive buffer. An allocated buffer is moved as-is.
    pub fn into_owned(self, memory_manager: &MemoryManager) -> OwnedBuf {
        match self {
            MemoryPointer::Direct(data) => {
                let mut buf = memory_manager.acquire_standalone(data.len());
                buf.extend_from_slice(data);
                buf
            }
            MemoryPointer::Allocated(buf) => buf,
        }
    }
}

impl AsRef<[u8]> for MemoryPointer<'_> {
    fn as_ref(&self) -> &[u8] {
        match self {
            MemoryPointer::Direct(data) => data,
            MemoryPointer::Allocated(buf) => buf.as_ref(),
        }
    }
}

/// equality is by content, regardless of representation
impl PartialEq for MemoryPointer<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref() == other.as_ref()
    }
}
impl Eq for MemoryPointer<'_> {}

impl PartialEq<[u8]> for MemoryPointer<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_ref() == other
    }
}

impl Debug for MemoryPointer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryPointer::Direct(data) => write!(f, "Direct({:?})", data),
            MemoryPointer::Allocated(buf) => write!(f, "Allocated({:?})", buf),
        }
    }
}
