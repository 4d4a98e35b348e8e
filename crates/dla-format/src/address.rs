//! Address list entries.
//!
//! Address entries are the only way a task references memory. Several
//! entries may carve different windows out of the same memory object.

use crate::table::{Record, Table};

/// A window `[offset, offset + size)` into memory `mem_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressListEntry {
    /// Address id
    pub id: u16,
    /// Memory entry the window lies in
    pub mem_id: u16,
    /// Window size in bytes
    pub size: u64,
    /// Window offset in bytes
    pub offset: u64,
}

impl AddressListEntry {
    /// Create an address entry.
    pub const fn new(id: u16, mem_id: u16, offset: u64, size: u64) -> Self {
        Self {
            id,
            mem_id,
            size,
            offset,
        }
    }

    /// End of the window, `None` on overflow.
    pub const fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }

    /// True when the window fits inside `len` bytes.
    pub fn fits_within(&self, len: u64) -> bool {
        self.end().is_some_and(|end| end <= len)
    }
}

impl Record for AddressListEntry {
    const TABLE: Table = Table::Address;

    fn id(&self) -> u16 {
        self.id
    }
}
