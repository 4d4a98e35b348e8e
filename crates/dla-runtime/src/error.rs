//! Error types for resolution and submission

use dla_format::{Instance, Interface, Table};
use dla_loadable::LoadableError;
use thiserror::Error;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while resolving or submitting a loadable
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Table lookup, header or content error from the loadable
    #[error(transparent)]
    Loadable(#[from] LoadableError),

    /// A window exceeds the memory it lies in
    #[error("Invalid range in {table} list entry {id}, field {field}: {detail}")]
    InvalidRange {
        /// Table of the offending entry
        table: Table,
        /// Entry id
        id: u16,
        /// Offending field
        field: &'static str,
        /// What was out of range
        detail: String,
    },

    /// An entry names an id that does not exist in the referenced table
    #[error("{table} list entry {id}, field {field}: no {target} list entry {target_id}")]
    DanglingReference {
        /// Table of the referring entry
        table: Table,
        /// Referring entry id
        id: u16,
        /// Field holding the reference
        field: &'static str,
        /// Table the reference points into
        target: Table,
        /// Missing id
        target_id: u16,
    },

    /// INPUT memory has no caller buffer
    #[error("Memory {mem_id} is an input (bind id {bind_id:?}) but no buffer was supplied")]
    UnboundInput {
        /// Memory id
        mem_id: u16,
        /// Bind id the buffer was expected under
        bind_id: Option<u16>,
    },

    /// OUTPUT memory has no caller buffer
    #[error("Memory {mem_id} is an output (bind id {bind_id:?}) but no buffer was supplied")]
    UnboundOutput {
        /// Memory id
        mem_id: u16,
        /// Bind id the buffer was expected under
        bind_id: Option<u16>,
    },

    /// Task references memory that never got a buffer
    #[error("Task {task_id} references unbound memory {mem_id} (address {address_id})")]
    UnresolvedMemory {
        /// Task id
        task_id: u16,
        /// Memory id
        mem_id: u16,
        /// Address entry through which it is referenced
        address_id: u16,
    },

    /// Task waits on an event that cannot be satisfied
    #[error("Task {task_id} waits on event {event_id}, which is not satisfied: {reason}")]
    UnresolvedEvent {
        /// Task id
        task_id: u16,
        /// Event id
        event_id: u16,
        /// Why the event cannot fire
        reason: String,
    },

    /// Buffer allocation for ALLOC/SET memory failed
    #[error("Allocation of {size} bytes (alignment {alignment}) for memory {mem_id} failed: {reason}")]
    AllocationFailure {
        /// Memory id
        mem_id: u16,
        /// Requested size
        size: u64,
        /// Requested alignment
        alignment: u32,
        /// Reason for failure
        reason: String,
    },

    /// No engine instance can take the task
    #[error("Task {task_id}: no engine for {interface} instance {instance}")]
    NoEngine {
        /// Task id
        task_id: u16,
        /// Interface required
        interface: Interface,
        /// Instance requested
        instance: Instance,
    },

    /// Engine reported a failure while running a task
    #[error("Engine failure: {reason}")]
    EngineFailure {
        /// Reason for failure
        reason: String,
    },

    /// Submit was cancelled before its tasks ran
    #[error("Submit {submit_id} cancelled")]
    Cancelled {
        /// Submit id
        submit_id: u16,
    },

    /// Runtime object used in a state that does not allow the operation
    #[error("Invalid state: {state}")]
    InvalidState {
        /// Current state description
        state: String,
    },

    /// I/O error (engine worker threads)
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Create an invalid range error
    pub fn invalid_range(table: Table, id: u16, field: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidRange {
            table,
            id,
            field,
            detail: detail.into(),
        }
    }

    /// Create a dangling reference error
    pub const fn dangling(table: Table, id: u16, field: &'static str, target: Table, target_id: u16) -> Self {
        Self::DanglingReference {
            table,
            id,
            field,
            target,
            target_id,
        }
    }

    /// Create an unresolved event error
    pub fn unresolved_event(task_id: u16, event_id: u16, reason: impl Into<String>) -> Self {
        Self::UnresolvedEvent {
            task_id,
            event_id,
            reason: reason.into(),
        }
    }

    /// Create an engine failure
    pub fn engine_failure(reason: impl Into<String>) -> Self {
        Self::EngineFailure {
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }
}
