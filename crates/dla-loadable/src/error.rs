//! Error types for loadable construction and queries

use dla_format::{Interface, Table, Version, WireError};
use thiserror::Error;

/// Result type alias for loadable operations
pub type Result<T> = std::result::Result<T, LoadableError>;

/// Errors that can occur while building or querying a loadable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadableError {
    /// Id outside the table
    #[error("{table} list entry {id} not found")]
    NotFound {
        /// Table that was queried
        table: Table,
        /// Requested id
        id: u16,
    },

    /// Blob version not readable by this runtime
    #[error("Loadable version {found} not supported (runtime reads {supported})")]
    VersionMismatch {
        /// Version declared by the blob
        found: Version,
        /// Version this runtime reads
        supported: Version,
    },

    /// Blob targets an interface this runtime cannot drive
    #[error("Unsupported loadable interface: {interface}")]
    UnsupportedInterface {
        /// Interface declared by the blob
        interface: Interface,
    },

    /// A whole-network property was never declared
    #[error("Loadable does not specify a {what}")]
    Unspecified {
        /// Missing property
        what: &'static str,
    },

    /// Two entries share an id
    #[error("Duplicate {table} list entry id {id}")]
    DuplicateId {
        /// Table with the duplicate
        table: Table,
        /// Duplicated id
        id: u16,
    },

    /// Memory binding fields are inconsistent with its flags
    #[error("Invalid binding on memory {mem_id}: {reason}")]
    InvalidBinding {
        /// Memory id
        mem_id: u16,
        /// Reason for failure
        reason: String,
    },

    /// No declared input/output tensor for a bind id
    #[error("No {direction} tensor bound to bind id {bind_id}")]
    BindingNotFound {
        /// "input" or "output"
        direction: &'static str,
        /// Requested bind id
        bind_id: u16,
    },

    /// Named content blob is not packaged in the loadable
    #[error("Content blob '{name}' not found")]
    ContentNotFound {
        /// Content name
        name: String,
    },

    /// Content read outside the blob
    #[error("Content blob '{name}' has {available} bytes, read of {length} at {offset} out of range")]
    ContentOutOfRange {
        /// Content name
        name: String,
        /// Requested offset
        offset: u64,
        /// Requested length
        length: u64,
        /// Blob length
        available: u64,
    },

    /// Wire shape conversion failed
    #[error("Wire conversion failed: {source}")]
    Wire {
        /// Underlying wire error
        #[from]
        source: WireError,
    },
}

impl LoadableError {
    /// Create a not-found error
    pub const fn not_found(table: Table, id: u16) -> Self {
        Self::NotFound { table, id }
    }

    /// Create an invalid binding error
    pub fn invalid_binding(mem_id: u16, reason: impl Into<String>) -> Self {
        Self::InvalidBinding {
            mem_id,
            reason: reason.into(),
        }
    }

    /// Create a content-not-found error
    pub fn content_not_found(name: impl Into<String>) -> Self {
        Self::ContentNotFound { name: name.into() }
    }
}
