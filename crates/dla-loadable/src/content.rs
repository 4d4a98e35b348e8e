//! Named content blobs (weights, constants, command buffers).
//!
//! Memory entries flagged `SET` name the blobs that populate them; the
//! resolver reads them through [`ContentSource`].

use crate::error::{LoadableError, Result};
use bytes::Bytes;
use std::collections::BTreeMap;

/// Read access to packaged content blobs.
pub trait ContentSource: Send + Sync {
    /// Length of blob `name`, `None` if it is not packaged.
    fn content_size(&self, name: &str) -> Option<u64>;

    /// Read `length` bytes of blob `name` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns error if the blob is missing or the range is outside it.
    fn read_content(&self, name: &str, offset: u64, length: u64) -> Result<Bytes>;
}

/// In-memory content store
///
/// `Bytes` keeps clones and sub-slices zero-copy, so handing a blob to
/// several memory objects does not duplicate it.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    blobs: BTreeMap<String, Bytes>,
}

impl ContentStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace blob `name`.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.blobs.insert(name.into(), data.into());
    }

    /// Number of blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// True when no blob is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Blob names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blobs.keys().map(String::as_str)
    }

    /// Total bytes across all blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs.values().map(|b| b.len() as u64).sum()
    }
}

impl ContentSource for ContentStore {
    fn content_size(&self, name: &str) -> Option<u64> {
        self.blobs.get(name).map(|b| b.len() as u64)
    }

    fn read_content(&self, name: &str, offset: u64, length: u64) -> Result<Bytes> {
        let blob = self
            .blobs
            .get(name)
            .ok_or_else(|| LoadableError::content_not_found(name))?;
        let available = blob.len() as u64;
        let out_of_range = || LoadableError::ContentOutOfRange {
            name: name.to_string(),
            offset,
            length,
            available,
        };

        let end = offset.checked_add(length).ok_or_else(out_of_range)?;
        if end > available {
            return Err(out_of_range());
        }
        let start = usize::try_from(offset).map_err(|_| out_of_range())?;
        let end = usize::try_from(end).map_err(|_| out_of_range())?;
        Ok(blob.slice(start..end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_sub_range() {
        let mut store = ContentStore::new();
        store.insert("w0", vec![1u8, 2, 3, 4, 5]);
        assert_eq!(store.content_size("w0"), Some(5));
        assert_eq!(&store.read_content("w0", 1, 3).unwrap()[..], &[2, 3, 4]);
        assert_eq!(store.total_bytes(), 5);
    }

    #[test]
    fn read_past_end_fails() {
        let mut store = ContentStore::new();
        store.insert("w0", vec![0u8; 4]);
        assert!(matches!(
            store.read_content("w0", 2, 4),
            Err(LoadableError::ContentOutOfRange { available: 4, .. })
        ));
        assert!(matches!(
            store.read_content("missing", 0, 1),
            Err(LoadableError::ContentNotFound { .. })
        ));
    }
}
