//! Load phase: bind every memory id to a buffer and check the tables.
//!
//! Resolution runs in three passes:
//!
//! 1. **Table validation** - every address, content placement and tensor
//!    descriptor lies inside its memory; every id a task or submit names
//!    exists. Violations abort with a locator before anything is allocated.
//! 2. **Global resolution** - memory entries get caller buffers (by bind id or
//!    memory id) or allocated ones, `SET` memory is populated, every event
//!    gets a status.
//! 3. **Per-task resolution** - unbound address references are collected per
//!    task. They are not fatal here; the submitter refuses such tasks.

use crate::binding::{
    BindingState, BufferSource, EventStatus, ExternalBindings, MemoryBinding, TaskRecord,
    TaskState, UnboundReason, UnresolvedRef,
};
use crate::buffer::{Buffer, BufferAllocator};
use crate::config::ResolveConfig;
use crate::error::{Result, RuntimeError};
use dla_format::{EventOp, MemoryFlags, MemoryListEntry, Table, TaskListEntry};
use dla_loadable::{Loadable, LoadableError};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Resolves a loadable against caller buffers.
///
/// Borrows the loadable read-only; one resolver can produce any number of
/// independent [`BindingState`]s.
#[derive(Debug)]
pub struct Resolver<'a, L: Loadable + ?Sized> {
    loadable: &'a L,
    config: ResolveConfig,
}

impl<'a, L: Loadable + ?Sized> Resolver<'a, L> {
    /// Resolver with default configuration.
    pub fn new(loadable: &'a L) -> Self {
        Self {
            loadable,
            config: ResolveConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ResolveConfig) -> Self {
        self.config = config;
        self
    }

    /// The loadable being resolved.
    pub fn loadable(&self) -> &'a L {
        self.loadable
    }

    /// Check table shape without binding anything.
    ///
    /// # Errors
    ///
    /// `NotFound` for dangling ids, `ContentNotFound` for missing blobs,
    /// `InvalidRange` for windows that exceed their memory.
    pub fn validate(&self) -> Result<()> {
        let l = self.loadable;

        for addr in l.address_entries() {
            let mem = l.memory_entry(addr.mem_id).map_err(|_| {
                RuntimeError::dangling(Table::Address, addr.id, "mem_id", Table::Memory, addr.mem_id)
            })?;
            if !addr.fits_within(mem.size) {
                return Err(RuntimeError::invalid_range(
                    Table::Address,
                    addr.id,
                    "offset+size",
                    format!(
                        "[{}, {}+{}) exceeds memory {} of {} bytes",
                        addr.offset, addr.offset, addr.size, mem.id, mem.size
                    ),
                ));
            }
        }

        for mem in l.memory_entries() {
            if mem.flags.contains(MemoryFlags::SET) {
                self.validate_contents(mem)?;
            }
            if let Some(desc_id) = mem.tensor_desc_id {
                l.tensor_desc_entry(desc_id).map_err(|_| {
                    RuntimeError::dangling(Table::Memory, mem.id, "tensor_desc_id", Table::TensorDesc, desc_id)
                })?;
            }
        }

        if self.config.validate_tensor_descs {
            for desc in l.tensor_desc_entries() {
                let mem = l.memory_entry(desc.mem_id).map_err(|_| {
                    RuntimeError::dangling(Table::TensorDesc, desc.id, "mem_id", Table::Memory, desc.mem_id)
                })?;
                let fits = desc
                    .offset
                    .checked_add(desc.size)
                    .is_some_and(|end| end <= mem.size);
                if !fits {
                    return Err(RuntimeError::invalid_range(
                        Table::TensorDesc,
                        desc.id,
                        "offset+size",
                        format!(
                            "{} bytes at {} exceed memory {} of {} bytes",
                            desc.size, desc.offset, mem.id, mem.size
                        ),
                    ));
                }
            }
        }

        for task in l.task_entries() {
            for &addr_id in &task.address_list {
                l.address_entry(addr_id).map_err(|_| {
                    RuntimeError::dangling(Table::Task, task.id, "address_list", Table::Address, addr_id)
                })?;
            }
            for (field, events) in [("preactions", &task.preactions), ("postactions", &task.postactions)] {
                for &event_id in events {
                    l.event_entry(event_id).map_err(|_| {
                        RuntimeError::dangling(Table::Task, task.id, field, Table::Event, event_id)
                    })?;
                }
            }
        }

        for submit in l.submit_entries() {
            for &task_id in &submit.tasks {
                l.task_entry(task_id).map_err(|_| {
                    RuntimeError::dangling(Table::Submit, submit.id, "tasks", Table::Task, task_id)
                })?;
            }
        }

        debug!("Tables of {} validated", l.name());
        Ok(())
    }

    /// Each blob must fit inside the memory, blobs must not overlap, and
    /// their lengths must not sum past `size`.
    fn validate_contents(&self, mem: &MemoryListEntry) -> Result<()> {
        let source = self.loadable.contents();
        let mut regions = Vec::with_capacity(mem.contents.len());
        let mut total = 0u64;
        for content in &mem.contents {
            let len = source
                .content_size(&content.name)
                .ok_or_else(|| LoadableError::content_not_found(&content.name))?;
            let fits = content
                .offset
                .checked_add(len)
                .is_some_and(|end| end <= mem.size);
            if !fits {
                return Err(RuntimeError::invalid_range(
                    Table::Memory,
                    mem.id,
                    "contents",
                    format!(
                        "blob '{}' ({len} bytes at {}) exceeds {} bytes",
                        content.name, content.offset, mem.size
                    ),
                ));
            }
            total = total.saturating_add(len);
            regions.push((content.offset, len, content.name.as_str()));
        }

        if total > mem.size {
            return Err(RuntimeError::invalid_range(
                Table::Memory,
                mem.id,
                "contents",
                format!("blobs total {total} bytes, memory holds {}", mem.size),
            ));
        }

        regions.sort_unstable_by_key(|&(offset, len, _)| (offset, len));
        let mut prev: Option<(u64, &str)> = None;
        for &(offset, len, name) in regions.iter().filter(|r| r.1 > 0) {
            if let Some((end, prev_name)) = prev {
                if offset < end {
                    return Err(RuntimeError::invalid_range(
                        Table::Memory,
                        mem.id,
                        "contents",
                        format!("blob '{name}' at {offset} overlaps blob '{prev_name}' ending at {end}"),
                    ));
                }
            }
            prev = Some((offset + len, name));
        }
        Ok(())
    }

    /// Resolve into a fresh binding state.
    ///
    /// # Errors
    ///
    /// Table-shape errors from [`validate`](Self::validate), `InvalidRange`
    /// for caller buffers smaller than their memory, `AllocationFailure`
    /// when the allocator refuses. Missing caller buffers are not errors;
    /// they show up as unresolved references in the returned state.
    pub fn resolve(
        &self,
        mut bindings: ExternalBindings,
        allocator: &mut dyn BufferAllocator,
    ) -> Result<BindingState> {
        let l = self.loadable;
        info!(
            "Resolving {}: {} memory, {} events, {} tasks",
            l.name(),
            l.num_memory_entries(),
            l.num_event_entries(),
            l.num_task_entries()
        );
        self.validate()?;

        let mut state = BindingState::default();
        for mem in l.memory_entries() {
            let binding = self.bind_memory(mem, &mut bindings, allocator)?;
            state.memory.insert(mem.id, binding);
        }

        let producers = self.producers();
        for event in l.event_entries() {
            let status = match producers.get(&event.id) {
                Some(&producer) => EventStatus::Pending { producer },
                None => external_status(&bindings, event.target),
            };
            debug!("Event {} -> {status:?}", event.id);
            state.events.insert(event.id, status);
        }

        for task in l.task_entries() {
            let references = self.references(task)?;
            let unresolved = self.unresolved_refs(task.id, &references, &state)?;
            let task_state = if unresolved.is_empty() {
                TaskState::Resolved
            } else {
                TaskState::Unresolved
            };
            state.tasks.insert(
                task.id,
                TaskRecord {
                    state: task_state,
                    references,
                    unresolved,
                },
            );
        }

        let outstanding = state.unresolved_tasks().count();
        if outstanding > 0 {
            warn!("{} resolved with {outstanding} task(s) unresolved", l.name());
        } else {
            info!("{} fully resolved", l.name());
        }
        Ok(state)
    }

    /// Supply more buffers and signals to an existing state.
    ///
    /// Bound memory is never replaced; only unbound memory is bound, only
    /// unsatisfied events are re-read from the signal map, and only tasks
    /// with outstanding references are re-checked.
    ///
    /// # Errors
    ///
    /// As [`resolve`](Self::resolve) for the newly bound memory.
    pub fn rebind(
        &self,
        state: &mut BindingState,
        mut bindings: ExternalBindings,
        allocator: &mut dyn BufferAllocator,
    ) -> Result<()> {
        let l = self.loadable;
        let mut newly_bound = 0usize;
        for mem in l.memory_entries() {
            if state.is_bound(mem.id) {
                continue;
            }
            let binding = self.bind_memory(mem, &mut bindings, allocator)?;
            if matches!(binding, MemoryBinding::Bound { .. }) {
                newly_bound += 1;
            }
            state.memory.insert(mem.id, binding);
        }

        for event in l.event_entries() {
            if state.event_status(event.id) == Some(EventStatus::Unsatisfied) {
                state
                    .events
                    .insert(event.id, external_status(&bindings, event.target));
            }
        }

        let outstanding: Vec<u16> = state.unresolved_tasks().collect();
        for task_id in outstanding {
            let Some(references) = state.tasks.get(&task_id).map(|t| t.references.clone()) else {
                continue;
            };
            let unresolved = self.unresolved_refs(task_id, &references, state)?;
            if let Some(record) = state.tasks.get_mut(&task_id) {
                if unresolved.is_empty() && record.state == TaskState::Unresolved {
                    record.state = TaskState::Resolved;
                }
                record.unresolved = unresolved;
            }
        }

        info!(
            "Rebind of {}: {newly_bound} memory newly bound, {} task(s) unresolved",
            l.name(),
            state.unresolved_tasks().count()
        );
        Ok(())
    }

    fn bind_memory(
        &self,
        mem: &MemoryListEntry,
        bindings: &mut ExternalBindings,
        allocator: &mut dyn BufferAllocator,
    ) -> Result<MemoryBinding> {
        if mem.is_input() || mem.is_output() {
            let supplied = mem.bind_id.and_then(|bind_id| {
                let from_inputs = if mem.is_input() {
                    bindings.inputs.remove(&bind_id)
                } else {
                    None
                };
                from_inputs.or_else(|| {
                    if mem.is_output() {
                        bindings.outputs.remove(&bind_id)
                    } else {
                        None
                    }
                })
            });
            let supplied = supplied.or_else(|| bindings.memory.remove(&mem.id));
            return match supplied {
                Some(buffer) => self.external(mem, buffer),
                None => {
                    let reason = if mem.is_input() {
                        UnboundReason::MissingInput {
                            bind_id: mem.bind_id,
                        }
                    } else {
                        UnboundReason::MissingOutput {
                            bind_id: mem.bind_id,
                        }
                    };
                    warn!("Memory {} left unbound: {reason:?}", mem.id);
                    Ok(MemoryBinding::Unbound(reason))
                }
            };
        }

        if let Some(buffer) = bindings.memory.remove(&mem.id) {
            return self.external(mem, buffer);
        }

        if mem.needs_allocation() {
            let mut buffer = allocator.allocate(mem.size, mem.alignment).map_err(|e| {
                RuntimeError::AllocationFailure {
                    mem_id: mem.id,
                    size: mem.size,
                    alignment: mem.alignment,
                    reason: e.reason,
                }
            })?;
            if mem.flags.contains(MemoryFlags::SET) {
                self.populate(mem, &mut buffer)?;
            }
            debug!("Memory {} allocated ({} bytes)", mem.id, mem.size);
            return Ok(MemoryBinding::Bound {
                buffer,
                source: BufferSource::Allocated,
            });
        }

        debug!("Memory {} has no buffer", mem.id);
        Ok(MemoryBinding::Unbound(UnboundReason::NotProvided))
    }

    fn external(&self, mem: &MemoryListEntry, buffer: Buffer) -> Result<MemoryBinding> {
        if buffer.len() < mem.size {
            return Err(RuntimeError::invalid_range(
                Table::Memory,
                mem.id,
                "size",
                format!(
                    "caller buffer of {} bytes is smaller than {} bytes",
                    buffer.len(),
                    mem.size
                ),
            ));
        }
        if !buffer.is_aligned(mem.alignment) {
            if self.config.strict_alignment {
                return Err(RuntimeError::invalid_range(
                    Table::Memory,
                    mem.id,
                    "alignment",
                    format!("caller buffer is not {}-byte aligned", mem.alignment),
                ));
            }
            warn!(
                "Caller buffer for memory {} is not {}-byte aligned",
                mem.id, mem.alignment
            );
        }
        debug!("Memory {} bound to caller buffer ({} bytes)", mem.id, buffer.len());
        Ok(MemoryBinding::Bound {
            buffer,
            source: BufferSource::External,
        })
    }

    fn populate(&self, mem: &MemoryListEntry, buffer: &mut Buffer) -> Result<()> {
        let source = self.loadable.contents();
        for content in &mem.contents {
            let len = source
                .content_size(&content.name)
                .ok_or_else(|| LoadableError::content_not_found(&content.name))?;
            let data = source.read_content(&content.name, 0, len)?;
            if !buffer.write_at(content.offset, &data) {
                return Err(RuntimeError::invalid_range(
                    Table::Memory,
                    mem.id,
                    "contents",
                    format!("blob '{}' does not fit at {}", content.name, content.offset),
                ));
            }
            debug!(
                "Memory {}: wrote {len} bytes of '{}' at {}",
                mem.id, content.name, content.offset
            );
        }
        Ok(())
    }

    /// Task whose completion signals each event.
    ///
    /// A `SIGNAL` event targeting a task of this loadable is produced by
    /// that task; otherwise the first task listing the event in its
    /// post-actions produces it.
    fn producers(&self) -> BTreeMap<u16, u16> {
        let l = self.loadable;
        let mut producers = BTreeMap::new();
        for event in l.event_entries() {
            if event.op == EventOp::Signal && l.task_entry(event.target).is_ok() {
                producers.insert(event.id, event.target);
            }
        }
        for task in l.task_entries() {
            for &event_id in &task.postactions {
                producers.entry(event_id).or_insert(task.id);
            }
        }
        producers
    }

    fn references(&self, task: &TaskListEntry) -> Result<Vec<UnresolvedRef>> {
        task.address_list
            .iter()
            .map(|&addr_id| {
                let addr = self.loadable.address_entry(addr_id)?;
                Ok(UnresolvedRef {
                    address_id: addr.id,
                    mem_id: addr.mem_id,
                })
            })
            .collect()
    }

    /// References of `task_id` whose memory is unbound or too small for the window.
    fn unresolved_refs(
        &self,
        task_id: u16,
        references: &[UnresolvedRef],
        state: &BindingState,
    ) -> Result<Vec<UnresolvedRef>> {
        let mut unresolved = Vec::new();
        for r in references {
            let addr = self.loadable.address_entry(r.address_id)?;
            let usable = state
                .buffer(r.mem_id)
                .is_some_and(|buf| addr.fits_within(buf.len()));
            if !usable {
                unresolved.push(*r);
            }
        }
        if !unresolved.is_empty() {
            debug!("Task {task_id} has {} unresolved reference(s)", unresolved.len());
        }
        Ok(unresolved)
    }
}

fn external_status(bindings: &ExternalBindings, target: u16) -> EventStatus {
    match bindings.signals.get(&target) {
        Some(true) => EventStatus::Satisfied,
        _ => EventStatus::Unsatisfied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::HostAllocator;
    use dla_format::{AddressListEntry, Blob, EventListEntry, Interface, SubmitListEntry};
    use dla_loadable::{LoadableBuilder, ParsedLoadable};

    fn with_weights() -> ParsedLoadable {
        LoadableBuilder::new(Blob::dla1("weights"))
            .memory(
                MemoryListEntry::new(0, 16)
                    .with_flags(MemoryFlags::ALLOC | MemoryFlags::SET)
                    .with_alignment(64)
                    .with_content("w0", 0)
                    .with_content("w1", 8),
            )
            .memory(MemoryListEntry::new(1, 32))
            .address(AddressListEntry::new(0, 0, 0, 16))
            .address(AddressListEntry::new(1, 1, 0, 32))
            .event(EventListEntry::signal(0, 5))
            .event(EventListEntry::wait(1, 6))
            .task(
                TaskListEntry::new(0, Interface::Dla1)
                    .with_addresses([0u16, 1])
                    .with_postactions([0u16]),
            )
            .submit(SubmitListEntry::new(0, [0u16]))
            .content("w0", vec![1u8; 4])
            .content("w1", vec![2u8; 8])
            .build()
            .unwrap()
    }

    #[test]
    fn set_memory_is_populated() {
        let l = with_weights();
        let mut alloc = HostAllocator::new();
        let state = Resolver::new(&l)
            .resolve(ExternalBindings::new(), &mut alloc)
            .unwrap();
        let buf = state.buffer(0).unwrap();
        assert!(buf.is_aligned(64));
        assert_eq!(
            buf.as_slice(),
            &[1, 1, 1, 1, 0, 0, 0, 0, 2, 2, 2, 2, 2, 2, 2, 2]
        );
        assert_eq!(alloc.allocation_count(), 1);
    }

    #[test]
    fn unflagged_memory_stays_unbound_until_rebind() {
        let l = with_weights();
        let mut alloc = HostAllocator::new();
        let resolver = Resolver::new(&l);
        let mut state = resolver.resolve(ExternalBindings::new(), &mut alloc).unwrap();
        assert_eq!(
            state.memory(1),
            Some(&MemoryBinding::Unbound(UnboundReason::NotProvided))
        );
        assert_eq!(state.task_state(0), Some(TaskState::Unresolved));
        assert_eq!(
            state.unresolved(0),
            &[UnresolvedRef {
                address_id: 1,
                mem_id: 1
            }]
        );

        let weights_before = state.buffer(0).unwrap().clone();
        resolver
            .rebind(
                &mut state,
                ExternalBindings::new().with_memory(1, vec![0u8; 32]),
                &mut alloc,
            )
            .unwrap();
        assert!(state.is_complete());
        assert_eq!(state.task_state(0), Some(TaskState::Resolved));
        assert_eq!(state.buffer(0), Some(&weights_before));
        assert_eq!(alloc.allocation_count(), 1);
    }

    #[test]
    fn event_status_from_producers_and_signals() {
        let l = with_weights();
        let state = Resolver::new(&l)
            .resolve(
                ExternalBindings::new().with_signal(6, true),
                &mut HostAllocator::new(),
            )
            .unwrap();
        assert_eq!(state.event_status(0), Some(EventStatus::Pending { producer: 0 }));
        assert_eq!(state.event_status(1), Some(EventStatus::Satisfied));

        let state = Resolver::new(&l)
            .resolve(ExternalBindings::new(), &mut HostAllocator::new())
            .unwrap();
        assert_eq!(state.event_status(1), Some(EventStatus::Unsatisfied));
    }

    #[test]
    fn missing_content_blob() {
        let l = LoadableBuilder::new(Blob::dla1("no-blob"))
            .memory(
                MemoryListEntry::new(0, 16)
                    .with_flags(MemoryFlags::SET)
                    .with_content("missing", 0),
            )
            .build()
            .unwrap();
        let err = Resolver::new(&l).validate().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Loadable(LoadableError::ContentNotFound { .. })
        ));
    }

    #[test]
    fn content_past_end_of_memory() {
        let l = LoadableBuilder::new(Blob::dla1("overflow"))
            .memory(
                MemoryListEntry::new(0, 8)
                    .with_flags(MemoryFlags::SET)
                    .with_content("blob", 4),
            )
            .content("blob", vec![0u8; 8])
            .build()
            .unwrap();
        assert!(matches!(
            Resolver::new(&l).validate(),
            Err(RuntimeError::InvalidRange {
                table: Table::Memory,
                id: 0,
                field: "contents",
                ..
            })
        ));
    }

    #[test]
    fn overlapping_content_rejected() {
        let l = LoadableBuilder::new(Blob::dla1("overlap"))
            .memory(
                MemoryListEntry::new(0, 8)
                    .with_flags(MemoryFlags::ALLOC | MemoryFlags::SET)
                    .with_content("a", 0)
                    .with_content("b", 4),
            )
            .content("a", vec![1u8; 6])
            .content("b", vec![2u8; 4])
            .build()
            .unwrap();
        let err = Resolver::new(&l)
            .resolve(ExternalBindings::new(), &mut HostAllocator::new())
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InvalidRange {
                table: Table::Memory,
                id: 0,
                field: "contents",
                ..
            }
        ));
    }

    #[test]
    fn content_at_same_offset_rejected() {
        let l = LoadableBuilder::new(Blob::dla1("same-offset"))
            .memory(
                MemoryListEntry::new(0, 8)
                    .with_flags(MemoryFlags::SET)
                    .with_content("a", 0)
                    .with_content("b", 0),
            )
            .content("a", vec![1u8; 8])
            .content("b", vec![2u8; 8])
            .build()
            .unwrap();
        assert!(matches!(
            Resolver::new(&l).validate(),
            Err(RuntimeError::InvalidRange {
                field: "contents",
                ..
            })
        ));
    }

    #[test]
    fn adjacent_content_accepted() {
        let l = LoadableBuilder::new(Blob::dla1("adjacent"))
            .memory(
                MemoryListEntry::new(0, 8)
                    .with_flags(MemoryFlags::SET)
                    .with_content("b", 4)
                    .with_content("a", 0),
            )
            .content("a", vec![1u8; 4])
            .content("b", vec![2u8; 4])
            .build()
            .unwrap();
        assert!(Resolver::new(&l).validate().is_ok());
    }

    #[test]
    fn signal_event_produced_by_its_target_task() {
        let l = LoadableBuilder::new(Blob::dla1("signal"))
            .event(EventListEntry::signal(0, 0))
            .event(EventListEntry::signal(1, 9))
            .task(TaskListEntry::new(0, Interface::Dla1))
            .task(TaskListEntry::new(1, Interface::Dla1).with_preactions([0u16, 1]))
            .build()
            .unwrap();
        let state = Resolver::new(&l)
            .resolve(
                ExternalBindings::new().with_signal(0, true).with_signal(9, true),
                &mut HostAllocator::new(),
            )
            .unwrap();
        // in-load target: the signal map does not apply
        assert_eq!(state.event_status(0), Some(EventStatus::Pending { producer: 0 }));
        assert_eq!(state.event_status(1), Some(EventStatus::Satisfied));
    }

    #[test]
    fn dangling_reference_names_referrer() {
        let l = LoadableBuilder::new(Blob::dla1("dangling"))
            .event(EventListEntry::wait(0, 0))
            .task(TaskListEntry::new(0, Interface::Dla1).with_preactions([0u16]))
            .task(TaskListEntry::new(1, Interface::Dla1).with_postactions([4u16]))
            .submit(SubmitListEntry::new(0, [0u16, 1]))
            .build()
            .unwrap();
        assert!(matches!(
            Resolver::new(&l).validate(),
            Err(RuntimeError::DanglingReference {
                table: Table::Task,
                id: 1,
                field: "postactions",
                target: Table::Event,
                target_id: 4,
            })
        ));

        let l = LoadableBuilder::new(Blob::dla1("dangling-submit"))
            .task(TaskListEntry::new(0, Interface::Dla1))
            .submit(SubmitListEntry::new(2, [0u16, 7]))
            .build()
            .unwrap();
        let err = Resolver::new(&l).validate().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::DanglingReference {
                table: Table::Submit,
                id: 2,
                field: "tasks",
                target: Table::Task,
                target_id: 7,
            }
        ));
        assert!(err.to_string().contains("submit list entry 2, field tasks"));
    }

    #[test]
    fn tensor_desc_validation_can_be_disabled() {
        use dla_format::{DataType, Dims4, TensorDescListEntry};
        let l = LoadableBuilder::new(Blob::dla1("desc"))
            .memory(MemoryListEntry::new(0, 16))
            .tensor_desc(TensorDescListEntry::feature(
                0,
                0,
                Dims4::new(1, 1, 8, 8),
                DataType::Int8,
                64,
            ))
            .build()
            .unwrap();
        assert!(matches!(
            Resolver::new(&l).validate(),
            Err(RuntimeError::InvalidRange {
                table: Table::TensorDesc,
                ..
            })
        ));
        let relaxed = ResolveConfig::default().with_tensor_desc_validation(false);
        assert!(Resolver::new(&l).with_config(relaxed).validate().is_ok());
    }

    #[test]
    fn small_caller_buffer_rejected() {
        let l = LoadableBuilder::new(Blob::dla1("small"))
            .memory(MemoryListEntry::new(0, 64))
            .build()
            .unwrap();
        let err = Resolver::new(&l)
            .resolve(
                ExternalBindings::new().with_memory(0, vec![0u8; 32]),
                &mut HostAllocator::new(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InvalidRange {
                table: Table::Memory,
                id: 0,
                field: "size",
                ..
            }
        ));
    }
}
