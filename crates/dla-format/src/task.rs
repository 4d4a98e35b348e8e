//! Task and submit list entries.

use crate::header::Interface;
use crate::table::{Record, Table};
use std::fmt;

/// Engine instance selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Instance {
    /// Any free instance of the task's interface
    #[default]
    Any,
    /// A specific instance
    Index(u16),
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// One unit of work for a single engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskListEntry {
    /// Task id
    pub id: u16,
    /// Engine interface that executes the task
    pub interface: Interface,
    /// Instance selector
    pub instance: Instance,
    /// Events that must be satisfied before dispatch
    pub preactions: Vec<u16>,
    /// Events signaled after completion
    pub postactions: Vec<u16>,
    /// Address entries the task reads or writes
    pub address_list: Vec<u16>,
}

impl TaskListEntry {
    /// Task on `interface`, any instance, no events or addresses.
    pub fn new(id: u16, interface: Interface) -> Self {
        Self {
            id,
            interface,
            ..Self::default()
        }
    }

    /// Pin to a specific instance.
    #[must_use]
    pub fn on_instance(mut self, instance: u16) -> Self {
        self.instance = Instance::Index(instance);
        self
    }

    /// Set the address list.
    #[must_use]
    pub fn with_addresses(mut self, addresses: impl Into<Vec<u16>>) -> Self {
        self.address_list = addresses.into();
        self
    }

    /// Set the pre-action events.
    #[must_use]
    pub fn with_preactions(mut self, events: impl Into<Vec<u16>>) -> Self {
        self.preactions = events.into();
        self
    }

    /// Set the post-action events.
    #[must_use]
    pub fn with_postactions(mut self, events: impl Into<Vec<u16>>) -> Self {
        self.postactions = events.into();
        self
    }
}

impl Record for TaskListEntry {
    const TABLE: Table = Table::Task;

    fn id(&self) -> u16 {
        self.id
    }
}

/// A set of tasks submitted together.
///
/// List order is not a dependency; ordering comes only from events.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitListEntry {
    /// Submit id
    pub id: u16,
    /// Task ids
    pub tasks: Vec<u16>,
}

impl SubmitListEntry {
    /// Create a submit entry.
    pub fn new(id: u16, tasks: impl Into<Vec<u16>>) -> Self {
        Self {
            id,
            tasks: tasks.into(),
        }
    }
}

impl Record for SubmitListEntry {
    const TABLE: Table = Table::Submit;

    fn id(&self) -> u16 {
        self.id
    }
}
