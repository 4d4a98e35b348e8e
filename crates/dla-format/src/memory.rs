//! Memory list entries.
//!
//! A memory entry is a symbolic buffer: the resolver either allocates it,
//! fills it from named content blobs, or binds it to a caller-supplied
//! buffer, depending on [`MemoryFlags`].

use crate::table::{Record, Table};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Where a memory object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryDomain {
    /// Host system memory
    #[default]
    Sysmem,
    /// On-chip SRAM
    Sram,
}

impl MemoryDomain {
    /// Raw domain code.
    pub const fn as_raw(self) -> u8 {
        match self {
            Self::Sysmem => 0,
            Self::Sram => 1,
        }
    }

    /// Domain for a raw code.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Sysmem),
            1 => Some(Self::Sram),
            _ => None,
        }
    }
}

/// Combinable memory flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MemoryFlags(u8);

impl MemoryFlags {
    /// No flags
    pub const NONE: Self = Self(0);
    /// Buffer must be allocated
    pub const ALLOC: Self = Self(1 << 0);
    /// Buffer is populated from content blobs
    pub const SET: Self = Self(1 << 1);
    /// Buffer is a network input supplied by the caller
    pub const INPUT: Self = Self(1 << 2);
    /// Buffer is a network output supplied by the caller
    pub const OUTPUT: Self = Self(1 << 3);

    const ALL: u8 = 0x0f;

    /// Raw bit pattern.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Flags from raw bits; unknown bits yield `None`.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// True when every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for MemoryFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MemoryFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for MemoryFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let names = [
            (Self::ALLOC, "ALLOC"),
            (Self::SET, "SET"),
            (Self::INPUT, "INPUT"),
            (Self::OUTPUT, "OUTPUT"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A named content blob placed at an offset inside a memory object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    /// Symbolic name of the content blob
    pub name: String,
    /// Byte offset within the memory object
    pub offset: u64,
}

/// Memory list entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryListEntry {
    /// Memory id
    pub id: u16,
    /// Size in bytes
    pub size: u64,
    /// Byte alignment, 0 for none
    pub alignment: u32,
    /// Memory domain
    pub domain: MemoryDomain,
    /// Allocation and binding flags
    pub flags: MemoryFlags,
    /// External tensor binding, only with `INPUT` or `OUTPUT`
    pub bind_id: Option<u16>,
    /// Tensor descriptor for the binding, only with `bind_id`
    pub tensor_desc_id: Option<u16>,
    /// Content blobs that populate this memory (with `SET`)
    pub contents: Vec<ContentRef>,
}

impl MemoryListEntry {
    /// Unflagged sysmem entry of `size` bytes.
    pub fn new(id: u16, size: u64) -> Self {
        Self {
            id,
            size,
            ..Self::default()
        }
    }

    /// Set the flags.
    #[must_use]
    pub fn with_flags(mut self, flags: MemoryFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the alignment.
    #[must_use]
    pub fn with_alignment(mut self, alignment: u32) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the domain.
    #[must_use]
    pub fn with_domain(mut self, domain: MemoryDomain) -> Self {
        self.domain = domain;
        self
    }

    /// Set the external binding id.
    #[must_use]
    pub fn with_bind_id(mut self, bind_id: u16) -> Self {
        self.bind_id = Some(bind_id);
        self
    }

    /// Set the tensor descriptor id.
    #[must_use]
    pub fn with_tensor_desc(mut self, tensor_desc_id: u16) -> Self {
        self.tensor_desc_id = Some(tensor_desc_id);
        self
    }

    /// Append a content blob at `offset`.
    #[must_use]
    pub fn with_content(mut self, name: impl Into<String>, offset: u64) -> Self {
        self.contents.push(ContentRef {
            name: name.into(),
            offset,
        });
        self
    }

    /// Flagged `INPUT`.
    pub const fn is_input(&self) -> bool {
        self.flags.contains(MemoryFlags::INPUT)
    }

    /// Flagged `OUTPUT`.
    pub const fn is_output(&self) -> bool {
        self.flags.contains(MemoryFlags::OUTPUT)
    }

    /// Flagged `INPUT` or `OUTPUT`.
    pub const fn is_bound_externally(&self) -> bool {
        self.is_input() || self.is_output()
    }

    /// Flagged `ALLOC` or `SET`: the runtime must provide a buffer.
    pub const fn needs_allocation(&self) -> bool {
        self.flags.contains(MemoryFlags::ALLOC) || self.flags.contains(MemoryFlags::SET)
    }
}

impl Record for MemoryListEntry {
    const TABLE: Table = Table::Memory;

    fn id(&self) -> u16 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let f = MemoryFlags::ALLOC | MemoryFlags::INPUT;
        assert!(f.contains(MemoryFlags::ALLOC));
        assert!(f.contains(MemoryFlags::INPUT));
        assert!(!f.contains(MemoryFlags::SET));
        assert_eq!(format!("{f:?}"), "ALLOC|INPUT");
        assert_eq!(format!("{:?}", MemoryFlags::NONE), "NONE");
    }

    #[test]
    fn unknown_flag_bits_rejected() {
        assert_eq!(MemoryFlags::from_bits(0x05), Some(MemoryFlags::ALLOC | MemoryFlags::INPUT));
        assert_eq!(MemoryFlags::from_bits(0x10), None);
    }

    #[test]
    fn builder_sets_binding() {
        let m = MemoryListEntry::new(3, 64)
            .with_flags(MemoryFlags::OUTPUT)
            .with_bind_id(1)
            .with_tensor_desc(2)
            .with_content("w0", 0);
        assert!(m.is_output());
        assert!(!m.is_input());
        assert!(!m.needs_allocation());
        assert_eq!(m.tensor_desc_id, Some(2));
        assert_eq!(m.contents.len(), 1);
    }
}
