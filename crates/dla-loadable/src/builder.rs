//! Assembling a [`ParsedLoadable`] from records.
//!
//! The envelope collaborator decodes the container and feeds records here.
//! `build()` checks, in order:
//!
//! 1. the blob header (interface, then version), before any table is read;
//! 2. id uniqueness in every table;
//! 3. memory binding consistency (`bind_id` only on INPUT/OUTPUT memory,
//!    `tensor_desc_id` only with a `bind_id`, bind ids unique per direction).
//!
//! Cross-table references and ranges are checked by the resolver.

use crate::content::ContentStore;
use crate::error::{LoadableError, Result};
use crate::loadable::ParsedLoadable;
use bytes::Bytes;
use dla_format::header::LOADABLE_VERSION;
use dla_format::{
    AddressListEntry, Blob, DataType, EventListEntry, Interface, MemoryListEntry, Record,
    SubmitListEntry, TaskListEntry, TensorDescListEntry, Version,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Which blob headers this loader accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPolicy {
    /// Newest version this runtime reads
    pub supported: Version,
    /// Interfaces this runtime drives
    pub interfaces: Vec<Interface>,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self {
            supported: LOADABLE_VERSION,
            interfaces: vec![Interface::Dla1],
        }
    }
}

impl VersionPolicy {
    /// Check a blob header against this policy.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInterface` or `VersionMismatch`.
    pub fn check(&self, blob: &Blob) -> Result<()> {
        if !self.interfaces.contains(&blob.interface) {
            return Err(LoadableError::UnsupportedInterface {
                interface: blob.interface,
            });
        }
        if !blob.version.is_compatible_with(&self.supported) {
            return Err(LoadableError::VersionMismatch {
                found: blob.version,
                supported: self.supported,
            });
        }
        Ok(())
    }
}

/// Builder for [`ParsedLoadable`]
#[derive(Debug, Clone)]
pub struct LoadableBuilder {
    blob: Blob,
    policy: VersionPolicy,
    memory: Vec<MemoryListEntry>,
    events: Vec<EventListEntry>,
    addresses: Vec<AddressListEntry>,
    tensor_descs: Vec<TensorDescListEntry>,
    tasks: Vec<TaskListEntry>,
    submits: Vec<SubmitListEntry>,
    contents: ContentStore,
    data_type: Option<DataType>,
}

impl LoadableBuilder {
    /// Start a loadable with header `blob`.
    pub fn new(blob: Blob) -> Self {
        Self {
            blob,
            policy: VersionPolicy::default(),
            memory: Vec::new(),
            events: Vec::new(),
            addresses: Vec::new(),
            tensor_descs: Vec::new(),
            tasks: Vec::new(),
            submits: Vec::new(),
            contents: ContentStore::new(),
            data_type: None,
        }
    }

    /// Override the header acceptance policy.
    #[must_use]
    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Append a memory entry.
    #[must_use]
    pub fn memory(mut self, entry: MemoryListEntry) -> Self {
        self.memory.push(entry);
        self
    }

    /// Append an event entry.
    #[must_use]
    pub fn event(mut self, entry: EventListEntry) -> Self {
        self.events.push(entry);
        self
    }

    /// Append an address entry.
    #[must_use]
    pub fn address(mut self, entry: AddressListEntry) -> Self {
        self.addresses.push(entry);
        self
    }

    /// Append a tensor descriptor.
    #[must_use]
    pub fn tensor_desc(mut self, entry: TensorDescListEntry) -> Self {
        self.tensor_descs.push(entry);
        self
    }

    /// Append a task entry.
    #[must_use]
    pub fn task(mut self, entry: TaskListEntry) -> Self {
        self.tasks.push(entry);
        self
    }

    /// Append a submit entry.
    #[must_use]
    pub fn submit(mut self, entry: SubmitListEntry) -> Self {
        self.submits.push(entry);
        self
    }

    /// Package content blob `name`.
    #[must_use]
    pub fn content(mut self, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.contents.insert(name, data);
        self
    }

    /// Declare the network data type.
    #[must_use]
    pub fn network_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Validate and freeze the loadable.
    ///
    /// # Errors
    ///
    /// Returns error if the header is unsupported, an id repeats within a
    /// table, or a memory entry's binding fields contradict its flags.
    pub fn build(self) -> Result<ParsedLoadable> {
        self.policy.check(&self.blob)?;
        debug!(
            "Header ok: '{}' {} v{}",
            self.blob.name, self.blob.interface, self.blob.version
        );

        check_unique_ids(&self.memory)?;
        check_unique_ids(&self.events)?;
        check_unique_ids(&self.addresses)?;
        check_unique_ids(&self.tensor_descs)?;
        check_unique_ids(&self.tasks)?;
        check_unique_ids(&self.submits)?;
        check_bindings(&self.memory)?;

        info!(
            "Loadable '{}': {} memory, {} events, {} addresses, {} tensors, {} tasks, {} submits, {} content blobs",
            self.blob.name,
            self.memory.len(),
            self.events.len(),
            self.addresses.len(),
            self.tensor_descs.len(),
            self.tasks.len(),
            self.submits.len(),
            self.contents.len()
        );

        Ok(ParsedLoadable {
            blob: self.blob,
            memory: self.memory,
            events: self.events,
            addresses: self.addresses,
            tensor_descs: self.tensor_descs,
            tasks: self.tasks,
            submits: self.submits,
            contents: self.contents,
            data_type: self.data_type,
        })
    }
}

fn check_unique_ids<T: Record>(entries: &[T]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for entry in entries {
        if !seen.insert(entry.id()) {
            return Err(LoadableError::DuplicateId {
                table: T::TABLE,
                id: entry.id(),
            });
        }
    }
    Ok(())
}

fn check_bindings(memory: &[MemoryListEntry]) -> Result<()> {
    let mut inputs = BTreeSet::new();
    let mut outputs = BTreeSet::new();

    for mem in memory {
        if mem.bind_id.is_some() && !mem.is_bound_externally() {
            return Err(LoadableError::invalid_binding(
                mem.id,
                "bind_id set without INPUT or OUTPUT flag",
            ));
        }
        if mem.tensor_desc_id.is_some() && mem.bind_id.is_none() {
            return Err(LoadableError::invalid_binding(
                mem.id,
                "tensor_desc_id set without bind_id",
            ));
        }
        let Some(bind_id) = mem.bind_id else {
            continue;
        };
        if mem.is_input() && !inputs.insert(bind_id) {
            return Err(LoadableError::invalid_binding(
                mem.id,
                format!("input bind id {bind_id} already used"),
            ));
        }
        if mem.is_output() && !outputs.insert(bind_id) {
            return Err(LoadableError::invalid_binding(
                mem.id,
                format!("output bind id {bind_id} already used"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Loadable;
    use dla_format::{MemoryFlags, Table};

    #[test]
    fn rejects_unsupported_interface_first() {
        // A duplicate id is present too; the header must be reported.
        let err = LoadableBuilder::new(Blob::dla1("net").with_interface(Interface::None))
            .memory(MemoryListEntry::new(0, 8))
            .memory(MemoryListEntry::new(0, 8))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            LoadableError::UnsupportedInterface {
                interface: Interface::None
            }
        );
    }

    #[test]
    fn rejects_newer_version() {
        let err = LoadableBuilder::new(Blob::dla1("net").with_version(Version::new(0, 9, 0)))
            .build()
            .unwrap_err();
        assert!(matches!(err, LoadableError::VersionMismatch { .. }));
    }

    #[test]
    fn accepts_custom_policy() {
        let policy = VersionPolicy {
            supported: Version::new(0, 9, 0),
            interfaces: vec![Interface::Dla1],
        };
        let loadable = LoadableBuilder::new(Blob::dla1("net").with_version(Version::new(0, 9, 0)))
            .with_policy(policy)
            .build()
            .unwrap();
        assert_eq!(loadable.name(), "net");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = LoadableBuilder::new(Blob::dla1("net"))
            .address(AddressListEntry::new(2, 0, 0, 4))
            .address(AddressListEntry::new(2, 0, 4, 4))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            LoadableError::DuplicateId {
                table: Table::Address,
                id: 2
            }
        );
    }

    #[test]
    fn rejects_bind_id_without_io_flag() {
        let mut mem = MemoryListEntry::new(1, 8).with_flags(MemoryFlags::ALLOC);
        mem.bind_id = Some(0);
        let err = LoadableBuilder::new(Blob::dla1("net"))
            .memory(mem)
            .build()
            .unwrap_err();
        assert!(matches!(err, LoadableError::InvalidBinding { mem_id: 1, .. }));
    }

    #[test]
    fn rejects_tensor_desc_without_bind_id() {
        let mut mem = MemoryListEntry::new(1, 8).with_flags(MemoryFlags::INPUT);
        mem.tensor_desc_id = Some(0);
        let err = LoadableBuilder::new(Blob::dla1("net"))
            .memory(mem)
            .build()
            .unwrap_err();
        assert!(matches!(err, LoadableError::InvalidBinding { mem_id: 1, .. }));
    }

    #[test]
    fn rejects_reused_input_bind_id() {
        let a = MemoryListEntry::new(0, 8).with_flags(MemoryFlags::INPUT).with_bind_id(0);
        let b = MemoryListEntry::new(1, 8).with_flags(MemoryFlags::INPUT).with_bind_id(0);
        let err = LoadableBuilder::new(Blob::dla1("net"))
            .memory(a)
            .memory(b)
            .build()
            .unwrap_err();
        assert!(matches!(err, LoadableError::InvalidBinding { mem_id: 1, .. }));
    }
}
