//! Per-cycle binding state.
//!
//! One [`BindingState`] belongs to exactly one load+execute cycle: it records
//! which memory ids have a concrete buffer, which events are satisfied, and
//! where each task stands. It is never shared; a new cycle resolves a fresh
//! one from the same immutable loadable.

use crate::buffer::Buffer;
use crate::error::{Result, RuntimeError};
use std::collections::BTreeMap;

/// Buffers and signals the caller supplies to the resolver.
#[derive(Debug, Default)]
pub struct ExternalBindings {
    pub(crate) inputs: BTreeMap<u16, Buffer>,
    pub(crate) outputs: BTreeMap<u16, Buffer>,
    pub(crate) memory: BTreeMap<u16, Buffer>,
    pub(crate) signals: BTreeMap<u16, bool>,
}

impl ExternalBindings {
    /// No buffers, no signals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer for input `bind_id`.
    #[must_use]
    pub fn with_input(mut self, bind_id: u16, buffer: impl Into<Buffer>) -> Self {
        self.inputs.insert(bind_id, buffer.into());
        self
    }

    /// Buffer for output `bind_id`.
    #[must_use]
    pub fn with_output(mut self, bind_id: u16, buffer: impl Into<Buffer>) -> Self {
        self.outputs.insert(bind_id, buffer.into());
        self
    }

    /// Externally allocated buffer for memory `mem_id`.
    #[must_use]
    pub fn with_memory(mut self, mem_id: u16, buffer: impl Into<Buffer>) -> Self {
        self.memory.insert(mem_id, buffer.into());
        self
    }

    /// Signal status of events targeting `target`.
    #[must_use]
    pub fn with_signal(mut self, target: u16, signaled: bool) -> Self {
        self.signals.insert(target, signaled);
        self
    }
}

/// Where a bound buffer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSource {
    /// Produced by the allocator
    Allocated,
    /// Supplied by the caller
    External,
}

/// Why a memory id has no buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnboundReason {
    /// INPUT memory without a caller buffer
    MissingInput {
        /// Expected bind id
        bind_id: Option<u16>,
    },
    /// OUTPUT memory without a caller buffer
    MissingOutput {
        /// Expected bind id
        bind_id: Option<u16>,
    },
    /// Neither ALLOC/SET nor an external buffer
    NotProvided,
    /// Buffer was taken back by the caller
    Released,
}

/// Binding of one memory id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryBinding {
    /// Concrete buffer
    Bound {
        /// The buffer
        buffer: Buffer,
        /// Origin of the buffer
        source: BufferSource,
    },
    /// No buffer yet
    Unbound(UnboundReason),
}

/// Status of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// Fired
    Satisfied,
    /// Fires when `producer` completes
    Pending {
        /// Task whose completion signals the event
        producer: u16,
    },
    /// Neither produced in this loadable nor signaled externally
    Unsatisfied,
}

/// Task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Some address references are unbound
    Unresolved,
    /// All addresses bound
    Resolved,
    /// Pre-action events satisfied
    Dispatchable,
    /// Handed to an engine instance
    Running,
    /// Finished; post-action events signaled
    Completed,
    /// Engine error; post-action events never fire
    Failed,
    /// A pre-action event's producer failed
    Blocked {
        /// Event that can no longer fire
        event_id: u16,
        /// Task that failed to produce it
        producer: u16,
    },
    /// Submit cancelled before the task ran
    Cancelled,
}

impl TaskState {
    /// Terminal states never change again in this cycle.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Blocked { .. } | Self::Cancelled
        )
    }

    /// The task will never signal its post-action events.
    pub const fn is_dead(self) -> bool {
        matches!(self, Self::Failed | Self::Blocked { .. } | Self::Cancelled)
    }
}

/// An address reference that could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnresolvedRef {
    /// Address entry
    pub address_id: u16,
    /// Memory it points into
    pub mem_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TaskRecord {
    pub(crate) state: TaskState,
    /// Every address reference of the task, in address-list order
    pub(crate) references: Vec<UnresolvedRef>,
    pub(crate) unresolved: Vec<UnresolvedRef>,
}

/// Mutable result of resolution, consumed by the submitter.
#[derive(Debug, Default)]
pub struct BindingState {
    pub(crate) memory: BTreeMap<u16, MemoryBinding>,
    pub(crate) events: BTreeMap<u16, EventStatus>,
    pub(crate) tasks: BTreeMap<u16, TaskRecord>,
}

impl BindingState {
    /// Binding of memory `mem_id`, `None` for ids outside the loadable.
    pub fn memory(&self, mem_id: u16) -> Option<&MemoryBinding> {
        self.memory.get(&mem_id)
    }

    /// True when memory `mem_id` has a buffer.
    pub fn is_bound(&self, mem_id: u16) -> bool {
        matches!(self.memory.get(&mem_id), Some(MemoryBinding::Bound { .. }))
    }

    /// Buffer bound to `mem_id`.
    pub fn buffer(&self, mem_id: u16) -> Option<&Buffer> {
        match self.memory.get(&mem_id)? {
            MemoryBinding::Bound { buffer, .. } => Some(buffer),
            MemoryBinding::Unbound(_) => None,
        }
    }

    /// Mutable buffer bound to `mem_id`.
    pub fn buffer_mut(&mut self, mem_id: u16) -> Option<&mut Buffer> {
        match self.memory.get_mut(&mem_id)? {
            MemoryBinding::Bound { buffer, .. } => Some(buffer),
            MemoryBinding::Unbound(_) => None,
        }
    }

    /// Take the buffer bound to `mem_id` back, e.g. to read an output.
    ///
    /// The memory is unbound afterwards and every task referencing it gets
    /// the reference back in its unresolved set; `Resolved` tasks drop to
    /// `Unresolved` until a rebind supplies a new buffer.
    pub fn take_buffer(&mut self, mem_id: u16) -> Option<Buffer> {
        let slot = self.memory.get_mut(&mem_id)?;
        let buffer = match std::mem::replace(slot, MemoryBinding::Unbound(UnboundReason::Released)) {
            MemoryBinding::Bound { buffer, .. } => buffer,
            unbound @ MemoryBinding::Unbound(_) => {
                *slot = unbound;
                return None;
            }
        };
        for task in self.tasks.values_mut() {
            for r in task.references.iter().filter(|r| r.mem_id == mem_id) {
                if !task.unresolved.contains(r) {
                    task.unresolved.push(*r);
                }
            }
            if task.state == TaskState::Resolved && !task.unresolved.is_empty() {
                task.state = TaskState::Unresolved;
            }
        }
        Some(buffer)
    }

    /// Status of event `event_id`.
    pub fn event_status(&self, event_id: u16) -> Option<EventStatus> {
        self.events.get(&event_id).copied()
    }

    /// State of task `task_id`.
    pub fn task_state(&self, task_id: u16) -> Option<TaskState> {
        self.tasks.get(&task_id).map(|t| t.state)
    }

    /// Outstanding unresolved references of `task_id`.
    pub fn unresolved(&self, task_id: u16) -> &[UnresolvedRef] {
        self.tasks
            .get(&task_id)
            .map(|t| t.unresolved.as_slice())
            .unwrap_or(&[])
    }

    /// Ids of tasks with outstanding unresolved references.
    pub fn unresolved_tasks(&self) -> impl Iterator<Item = u16> + '_ {
        self.tasks
            .iter()
            .filter(|(_, t)| !t.unresolved.is_empty())
            .map(|(id, _)| *id)
    }

    /// True when no task has unresolved references.
    pub fn is_complete(&self) -> bool {
        self.tasks.values().all(|t| t.unresolved.is_empty())
    }

    /// Check that every INPUT/OUTPUT memory is bound and no task has
    /// unresolved references.
    ///
    /// # Errors
    ///
    /// Returns `UnboundInput`/`UnboundOutput` for the lowest unbound external
    /// memory id, else `UnresolvedMemory` for the lowest outstanding task.
    pub fn check_bound(&self) -> Result<()> {
        for (&mem_id, binding) in &self.memory {
            match binding {
                MemoryBinding::Unbound(UnboundReason::MissingInput { bind_id }) => {
                    return Err(RuntimeError::UnboundInput {
                        mem_id,
                        bind_id: *bind_id,
                    });
                }
                MemoryBinding::Unbound(UnboundReason::MissingOutput { bind_id }) => {
                    return Err(RuntimeError::UnboundOutput {
                        mem_id,
                        bind_id: *bind_id,
                    });
                }
                _ => {}
            }
        }
        if let Some(task_id) = self.unresolved_tasks().next() {
            return Err(self.unresolved_error(task_id, self.unresolved(task_id)[0]));
        }
        Ok(())
    }

    /// Error describing why `task_id` cannot use `r`.
    pub(crate) fn unresolved_error(&self, task_id: u16, r: UnresolvedRef) -> RuntimeError {
        match self.memory.get(&r.mem_id) {
            Some(MemoryBinding::Unbound(UnboundReason::MissingInput { bind_id })) => {
                RuntimeError::UnboundInput {
                    mem_id: r.mem_id,
                    bind_id: *bind_id,
                }
            }
            Some(MemoryBinding::Unbound(UnboundReason::MissingOutput { bind_id })) => {
                RuntimeError::UnboundOutput {
                    mem_id: r.mem_id,
                    bind_id: *bind_id,
                }
            }
            _ => RuntimeError::UnresolvedMemory {
                task_id,
                mem_id: r.mem_id,
                address_id: r.address_id,
            },
        }
    }

    pub(crate) fn set_task_state(&mut self, task_id: u16, state: TaskState) {
        if let Some(t) = self.tasks.get_mut(&task_id) {
            t.state = state;
        }
    }

    pub(crate) fn satisfy_event(&mut self, event_id: u16) {
        if let Some(status) = self.events.get_mut(&event_id) {
            *status = EventStatus::Satisfied;
        }
    }

    /// Satisfy every event pending on `producer`.
    pub(crate) fn satisfy_produced_by(&mut self, producer: u16) {
        for status in self.events.values_mut() {
            if *status == (EventStatus::Pending { producer }) {
                *status = EventStatus::Satisfied;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REF: UnresolvedRef = UnresolvedRef {
        address_id: 3,
        mem_id: 0,
    };

    fn state_with(binding: MemoryBinding) -> BindingState {
        let mut s = BindingState::default();
        s.memory.insert(0, binding);
        s.tasks.insert(
            0,
            TaskRecord {
                state: TaskState::Unresolved,
                references: vec![REF],
                unresolved: vec![REF],
            },
        );
        s
    }

    #[test]
    fn missing_input_reported_as_unbound_input() {
        let s = state_with(MemoryBinding::Unbound(UnboundReason::MissingInput {
            bind_id: Some(0),
        }));
        assert!(matches!(
            s.check_bound(),
            Err(RuntimeError::UnboundInput { mem_id: 0, bind_id: Some(0) })
        ));
        assert!(!s.is_complete());
    }

    #[test]
    fn plain_unbound_reported_as_unresolved_memory() {
        let s = state_with(MemoryBinding::Unbound(UnboundReason::NotProvided));
        assert!(matches!(
            s.check_bound(),
            Err(RuntimeError::UnresolvedMemory {
                task_id: 0,
                mem_id: 0,
                address_id: 3
            })
        ));
    }

    #[test]
    fn take_buffer_unbinds() {
        let mut s = state_with(MemoryBinding::Bound {
            buffer: Buffer::from(vec![7u8; 4]),
            source: BufferSource::External,
        });
        assert!(s.is_bound(0));
        assert_eq!(s.take_buffer(0).unwrap().as_slice(), &[7, 7, 7, 7]);
        assert!(!s.is_bound(0));
        assert!(s.take_buffer(0).is_none());
        assert_eq!(
            s.memory(0),
            Some(&MemoryBinding::Unbound(UnboundReason::Released))
        );
    }

    #[test]
    fn take_buffer_unresolves_referencing_tasks() {
        let mut s = state_with(MemoryBinding::Bound {
            buffer: Buffer::from(vec![0u8; 4]),
            source: BufferSource::External,
        });
        if let Some(t) = s.tasks.get_mut(&0) {
            t.state = TaskState::Resolved;
            t.unresolved.clear();
        }
        assert!(s.check_bound().is_ok());

        s.take_buffer(0).unwrap();
        assert_eq!(s.task_state(0), Some(TaskState::Unresolved));
        assert_eq!(s.unresolved(0), &[REF]);
        assert!(matches!(
            s.check_bound(),
            Err(RuntimeError::UnresolvedMemory { task_id: 0, mem_id: 0, .. })
        ));
    }

    #[test]
    fn completion_satisfies_events_pending_on_producer() {
        let mut s = BindingState::default();
        s.events.insert(0, EventStatus::Pending { producer: 2 });
        s.events.insert(1, EventStatus::Pending { producer: 3 });
        s.satisfy_produced_by(2);
        assert_eq!(s.event_status(0), Some(EventStatus::Satisfied));
        assert_eq!(s.event_status(1), Some(EventStatus::Pending { producer: 3 }));
    }

    #[test]
    fn terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(!TaskState::Completed.is_dead());
        assert!(TaskState::Blocked { event_id: 0, producer: 1 }.is_dead());
        assert!(!TaskState::Running.is_terminal());
    }
}
