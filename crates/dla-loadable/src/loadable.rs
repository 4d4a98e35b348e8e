//! Capability query layer.
//!
//! [`Loadable`] is the read-only interface the runtime consumes. Implementors
//! only expose their tables as slices; id lookup, network data type and the
//! declared input/output views are provided on top of them.

use crate::content::{ContentSource, ContentStore};
use crate::error::{LoadableError, Result};
use crate::table::find_record;
use dla_format::{
    AddressListEntry, Blob, DataType, EventListEntry, MemoryListEntry, SubmitListEntry,
    TaskListEntry, TensorDescListEntry,
};

/// Read-only view of a parsed loadable.
///
/// All methods are side-effect free; implementors must be immutable once
/// constructed so any number of readers may share one instance.
pub trait Loadable: Send + Sync {
    /// Blob header.
    fn blob(&self) -> &Blob;

    /// Memory list.
    fn memory_entries(&self) -> &[MemoryListEntry];

    /// Event list.
    fn event_entries(&self) -> &[EventListEntry];

    /// Address list.
    fn address_entries(&self) -> &[AddressListEntry];

    /// Tensor descriptor list.
    fn tensor_desc_entries(&self) -> &[TensorDescListEntry];

    /// Task list.
    fn task_entries(&self) -> &[TaskListEntry];

    /// Submit list.
    fn submit_entries(&self) -> &[SubmitListEntry];

    /// Packaged content blobs.
    fn contents(&self) -> &dyn ContentSource;

    /// Data type declared for the whole network, if any.
    fn declared_data_type(&self) -> Option<DataType>;

    /// Network name.
    fn name(&self) -> &str {
        &self.blob().name
    }

    /// Number of memory entries.
    fn num_memory_entries(&self) -> usize {
        self.memory_entries().len()
    }

    /// Memory entry `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entry has `id`.
    fn memory_entry(&self, id: u16) -> Result<&MemoryListEntry> {
        find_record(self.memory_entries(), id)
    }

    /// Number of event entries.
    fn num_event_entries(&self) -> usize {
        self.event_entries().len()
    }

    /// Event entry `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entry has `id`.
    fn event_entry(&self, id: u16) -> Result<&EventListEntry> {
        find_record(self.event_entries(), id)
    }

    /// Number of address entries.
    fn num_address_entries(&self) -> usize {
        self.address_entries().len()
    }

    /// Address entry `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entry has `id`.
    fn address_entry(&self, id: u16) -> Result<&AddressListEntry> {
        find_record(self.address_entries(), id)
    }

    /// Number of tensor descriptors.
    fn num_tensor_desc_entries(&self) -> usize {
        self.tensor_desc_entries().len()
    }

    /// Tensor descriptor `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entry has `id`.
    fn tensor_desc_entry(&self, id: u16) -> Result<&TensorDescListEntry> {
        find_record(self.tensor_desc_entries(), id)
    }

    /// Number of task entries.
    fn num_task_entries(&self) -> usize {
        self.task_entries().len()
    }

    /// Task entry `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entry has `id`.
    fn task_entry(&self, id: u16) -> Result<&TaskListEntry> {
        find_record(self.task_entries(), id)
    }

    /// Number of submit entries.
    fn num_submit_entries(&self) -> usize {
        self.submit_entries().len()
    }

    /// Submit entry `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entry has `id`.
    fn submit_entry(&self, id: u16) -> Result<&SubmitListEntry> {
        find_record(self.submit_entries(), id)
    }

    /// The single data type declared for the graph.
    ///
    /// # Errors
    ///
    /// Returns `Unspecified` if the loadable declares none.
    fn network_data_type(&self) -> Result<DataType> {
        self.declared_data_type()
            .ok_or(LoadableError::Unspecified {
                what: "network data type",
            })
    }

    /// Declared input tensors, ordered by bind id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if an input memory names a missing descriptor.
    fn input_tensors(&self) -> Result<Vec<&TensorDescListEntry>> {
        bound_tensors(self, MemoryListEntry::is_input)
    }

    /// Declared output tensors, ordered by bind id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if an output memory names a missing descriptor.
    fn output_tensors(&self) -> Result<Vec<&TensorDescListEntry>> {
        bound_tensors(self, MemoryListEntry::is_output)
    }

    /// Number of declared input tensors.
    ///
    /// # Errors
    ///
    /// See [`Loadable::input_tensors`].
    fn num_input_tensors(&self) -> Result<usize> {
        Ok(self.input_tensors()?.len())
    }

    /// Number of declared output tensors.
    ///
    /// # Errors
    ///
    /// See [`Loadable::output_tensors`].
    fn num_output_tensors(&self) -> Result<usize> {
        Ok(self.output_tensors()?.len())
    }

    /// Input tensor descriptor for `bind_id`.
    ///
    /// # Errors
    ///
    /// Returns `BindingNotFound` if no input memory carries `bind_id`.
    fn input_tensor_desc(&self, bind_id: u16) -> Result<&TensorDescListEntry> {
        bound_tensor(self, bind_id, "input", MemoryListEntry::is_input)
    }

    /// Output tensor descriptor for `bind_id`.
    ///
    /// # Errors
    ///
    /// Returns `BindingNotFound` if no output memory carries `bind_id`.
    fn output_tensor_desc(&self, bind_id: u16) -> Result<&TensorDescListEntry> {
        bound_tensor(self, bind_id, "output", MemoryListEntry::is_output)
    }
}

fn bound_tensors<L, F>(loadable: &L, select: F) -> Result<Vec<&TensorDescListEntry>>
where
    L: Loadable + ?Sized,
    F: Fn(&MemoryListEntry) -> bool,
{
    let mut bound: Vec<(u16, &TensorDescListEntry)> = Vec::new();
    for mem in loadable.memory_entries().iter().filter(|m| select(*m)) {
        if let (Some(bind_id), Some(desc_id)) = (mem.bind_id, mem.tensor_desc_id) {
            bound.push((bind_id, loadable.tensor_desc_entry(desc_id)?));
        }
    }
    bound.sort_by_key(|(bind_id, _)| *bind_id);
    Ok(bound.into_iter().map(|(_, desc)| desc).collect())
}

fn bound_tensor<'a, L, F>(
    loadable: &'a L,
    bind_id: u16,
    direction: &'static str,
    select: F,
) -> Result<&'a TensorDescListEntry>
where
    L: Loadable + ?Sized,
    F: Fn(&MemoryListEntry) -> bool,
{
    let desc_id = loadable
        .memory_entries()
        .iter()
        .filter(|m| select(*m))
        .find(|m| m.bind_id == Some(bind_id))
        .and_then(|m| m.tensor_desc_id)
        .ok_or(LoadableError::BindingNotFound { direction, bind_id })?;
    loadable.tensor_desc_entry(desc_id)
}

/// Loadable held entirely in memory.
///
/// Built with [`LoadableBuilder`](crate::LoadableBuilder); immutable afterwards.
#[derive(Debug, Clone)]
pub struct ParsedLoadable {
    pub(crate) blob: Blob,
    pub(crate) memory: Vec<MemoryListEntry>,
    pub(crate) events: Vec<EventListEntry>,
    pub(crate) addresses: Vec<AddressListEntry>,
    pub(crate) tensor_descs: Vec<TensorDescListEntry>,
    pub(crate) tasks: Vec<TaskListEntry>,
    pub(crate) submits: Vec<SubmitListEntry>,
    pub(crate) contents: ContentStore,
    pub(crate) data_type: Option<DataType>,
}

impl ParsedLoadable {
    /// Content store backing `SET` memory.
    pub fn content_store(&self) -> &ContentStore {
        &self.contents
    }
}

impl Loadable for ParsedLoadable {
    fn blob(&self) -> &Blob {
        &self.blob
    }

    fn memory_entries(&self) -> &[MemoryListEntry] {
        &self.memory
    }

    fn event_entries(&self) -> &[EventListEntry] {
        &self.events
    }

    fn address_entries(&self) -> &[AddressListEntry] {
        &self.addresses
    }

    fn tensor_desc_entries(&self) -> &[TensorDescListEntry] {
        &self.tensor_descs
    }

    fn task_entries(&self) -> &[TaskListEntry] {
        &self.tasks
    }

    fn submit_entries(&self) -> &[SubmitListEntry] {
        &self.submits
    }

    fn contents(&self) -> &dyn ContentSource {
        &self.contents
    }

    fn declared_data_type(&self) -> Option<DataType> {
        self.data_type
    }
}
