//! Record model for DLA loadables.
//!
//! This crate has **no behavior beyond accessors**: it describes the flat
//! tables a compiled network is packaged as, and the boundary adapter that
//! maps them to the C-compatible shapes the envelope collaborator reads and
//! writes. Resolution and submission live in `dla-runtime`.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`header`] | Blob header, target interface, version policy |
//! | [`memory`] | Memory list entries, domains, flag bitset, content regions |
//! | [`event`] | Event list entries (wait/signal) |
//! | [`address`] | Address list entries (sub-allocations of memory) |
//! | [`tensor`] | Tensor descriptors, dims, data/pixel formats |
//! | [`task`] | Task and submit list entries, instance selector |
//! | [`wire`] | `#[repr(C)]` shapes with sentinel encodings |
//!
//! # Example
//!
//! ```
//! use dla_format::memory::{MemoryFlags, MemoryListEntry};
//!
//! let mem = MemoryListEntry::new(0, 1024)
//!     .with_flags(MemoryFlags::ALLOC | MemoryFlags::INPUT)
//!     .with_bind_id(0);
//! assert!(mem.is_input());
//! assert_eq!(mem.bind_id, Some(0));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod address;
pub mod event;
pub mod header;
pub mod memory;
pub mod table;
pub mod task;
pub mod tensor;
pub mod wire;

pub use address::AddressListEntry;
pub use event::{EventListEntry, EventOp};
pub use header::{Blob, Interface, Version};
pub use memory::{ContentRef, MemoryDomain, MemoryFlags, MemoryListEntry};
pub use table::{Record, Table};
pub use task::{Instance, SubmitListEntry, TaskListEntry};
pub use tensor::{
    DataCategory, DataFormat, DataType, Dims4, PixelFormat, PixelMapping, TensorDescListEntry,
};
pub use wire::WireError;
