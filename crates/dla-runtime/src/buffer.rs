//! Concrete buffers and the allocator collaborator.
//!
//! Every bound memory object ends up as a [`Buffer`]: either handed in by
//! the caller (inputs, outputs, externally allocated memory) or produced by a
//! [`BufferAllocator`] for `ALLOC`/`SET` memory.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tracing::debug;

/// Host-visible byte buffer bound to a memory object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Buffer {
    data: BytesMut,
}

impl Buffer {
    /// Zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            data: BytesMut::zeroed(len),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// True for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable contents.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// True when the start address is a multiple of `alignment` (0 and 1 always hold).
    pub fn is_aligned(&self, alignment: u32) -> bool {
        match alignment {
            0 | 1 => true,
            a => (self.data.as_ptr() as usize) % (a as usize) == 0,
        }
    }

    /// Copy `bytes` to `offset`; returns `false` if it would run past the end.
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> bool {
        let Ok(start) = usize::try_from(offset) else {
            return false;
        };
        let Some(end) = start.checked_add(bytes.len()) else {
            return false;
        };
        match self.data.get_mut(start..end) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    /// Freeze into immutable bytes.
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(v: Vec<u8>) -> Self {
        Self {
            data: BytesMut::from(&v[..]),
        }
    }
}

impl From<&[u8]> for Buffer {
    fn from(v: &[u8]) -> Self {
        Self {
            data: BytesMut::from(v),
        }
    }
}

/// Allocation failure reported by a [`BufferAllocator`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct AllocError {
    /// Reason for failure
    pub reason: String,
}

impl AllocError {
    /// Create an allocation error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Buffer allocator collaborator.
pub trait BufferAllocator: Send {
    /// Allocate `size` zeroed bytes aligned to `alignment` (0 = none).
    ///
    /// # Errors
    ///
    /// Returns error if the allocation cannot be satisfied.
    fn allocate(&mut self, size: u64, alignment: u32) -> std::result::Result<Buffer, AllocError>;
}

/// Heap allocator with an optional byte budget.
#[derive(Debug, Clone, Default)]
pub struct HostAllocator {
    limit: Option<u64>,
    allocated: u64,
    allocations: usize,
}

impl HostAllocator {
    /// Unbounded allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator that refuses to hand out more than `bytes` in total.
    pub fn with_limit(bytes: u64) -> Self {
        Self {
            limit: Some(bytes),
            ..Self::default()
        }
    }

    /// Bytes handed out so far.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated
    }

    /// Number of successful allocations.
    pub fn allocation_count(&self) -> usize {
        self.allocations
    }
}

impl BufferAllocator for HostAllocator {
    fn allocate(&mut self, size: u64, alignment: u32) -> std::result::Result<Buffer, AllocError> {
        let total = self
            .allocated
            .checked_add(size)
            .ok_or_else(|| AllocError::new("size overflow"))?;
        if let Some(limit) = self.limit {
            if total > limit {
                return Err(AllocError::new(format!(
                    "budget exhausted ({} of {limit} bytes in use)",
                    self.allocated
                )));
            }
        }

        let len = usize::try_from(size).map_err(|_| AllocError::new("size exceeds address space"))?;
        let align = match alignment {
            0 | 1 => 1,
            a => a as usize,
        };
        let padded = len
            .checked_add(align - 1)
            .ok_or_else(|| AllocError::new("size overflow"))?;

        // Over-allocate, then skip to the first aligned byte.
        let mut data = BytesMut::zeroed(padded);
        let misalign = (data.as_ptr() as usize) % align;
        let pad = if misalign == 0 { 0 } else { align - misalign };
        data.advance(pad);
        data.truncate(len);

        self.allocated = total;
        self.allocations += 1;
        debug!("Allocated {len} bytes (align {align}, pad {pad})");
        Ok(Buffer { data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_allocation() {
        let mut alloc = HostAllocator::new();
        for align in [0u32, 1, 16, 64, 256, 4096] {
            let buf = alloc.allocate(100, align).unwrap();
            assert_eq!(buf.len(), 100);
            assert!(buf.is_aligned(align), "alignment {align}");
            assert!(buf.as_slice().iter().all(|&b| b == 0));
        }
        assert_eq!(alloc.allocation_count(), 6);
        assert_eq!(alloc.allocated_bytes(), 600);
    }

    #[test]
    fn budget_enforced() {
        let mut alloc = HostAllocator::with_limit(128);
        assert!(alloc.allocate(100, 0).is_ok());
        let err = alloc.allocate(100, 0).unwrap_err();
        assert!(err.reason.contains("budget"));
        assert!(alloc.allocate(28, 0).is_ok());
    }

    #[test]
    fn write_at_bounds() {
        let mut buf = Buffer::zeroed(8);
        assert!(buf.write_at(4, &[1, 2, 3, 4]));
        assert_eq!(buf.as_slice(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(!buf.write_at(6, &[9, 9, 9]));
        assert!(!buf.write_at(u64::MAX, &[1]));
    }
}
