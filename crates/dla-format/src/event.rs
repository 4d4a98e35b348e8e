//! Event list entries.

use crate::table::{Record, Table};

/// Event operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventOp {
    /// Block dispatch until satisfied
    #[default]
    Wait,
    /// Satisfied when the target completes
    Signal,
}

impl EventOp {
    /// Raw operation code.
    pub const fn as_raw(self) -> u8 {
        match self {
            Self::Wait => 0,
            Self::Signal => 1,
        }
    }

    /// Operation for a raw code.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Wait),
            1 => Some(Self::Signal),
            _ => None,
        }
    }
}

/// Synchronization event between tasks and engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventListEntry {
    /// Event id
    pub id: u16,
    /// Task or engine instance the event pertains to
    pub target: u16,
    /// Wait or signal
    pub op: EventOp,
    /// Opaque payload
    pub val: u32,
}

impl EventListEntry {
    /// Wait event on `target`.
    pub const fn wait(id: u16, target: u16) -> Self {
        Self {
            id,
            target,
            op: EventOp::Wait,
            val: 0,
        }
    }

    /// Signal event on `target`.
    pub const fn signal(id: u16, target: u16) -> Self {
        Self {
            id,
            target,
            op: EventOp::Signal,
            val: 0,
        }
    }
}

impl Record for EventListEntry {
    const TABLE: Table = Table::Event;

    fn id(&self) -> u16 {
        self.id
    }
}
