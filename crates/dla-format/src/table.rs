//! Table identities shared by every record type.
//!
//! Errors anywhere in the workspace name the offending table with [`Table`],
//! so a malformed loadable can be located without a debugger.

use std::fmt;

/// The six record tables of a loadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Memory list
    Memory,
    /// Event list
    Event,
    /// Address list
    Address,
    /// Tensor descriptor list
    TensorDesc,
    /// Task list
    Task,
    /// Submit list
    Submit,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Event => write!(f, "event"),
            Self::Address => write!(f, "address"),
            Self::TensorDesc => write!(f, "tensor-desc"),
            Self::Task => write!(f, "task"),
            Self::Submit => write!(f, "submit"),
        }
    }
}

/// A row of one of the record tables.
pub trait Record {
    /// Table the record belongs to.
    const TABLE: Table;

    /// Table-local id.
    fn id(&self) -> u16;
}
