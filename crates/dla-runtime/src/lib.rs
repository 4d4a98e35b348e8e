//! Resolution and submission runtime for DLA loadables.
//!
//! Takes an immutable [`Loadable`](dla_loadable::Loadable) through two
//! phases per execution cycle:
//!
//! ```text
//! load:  Resolver   tables + caller buffers + signals  ->  BindingState
//! exec:  Submitter  BindingState + EnginePool           ->  SubmitReport
//! ```
//!
//! The loadable is never mutated; every cycle gets its own
//! [`BindingState`], so one loadable can be resolved and run many times.
//!
//! # Engines
//!
//! ```text
//! DLA1  accelerator instances  (SoftwareEngine::dla)
//! EMU1  CPU instances          (SoftwareEngine::emu)
//! ```
//!
//! Each instance owns a worker thread and a FIFO queue; tasks for different
//! instances run in parallel and synchronize only through events.
//!
//! # Quick start
//!
//! ```
//! use dla_format::{AddressListEntry, Blob, Interface, MemoryFlags, MemoryListEntry,
//!                  SubmitListEntry, TaskListEntry};
//! use dla_loadable::LoadableBuilder;
//! use dla_runtime::{EngineConfig, EnginePool, ExecutionLog, ExternalBindings,
//!                   HostAllocator, Resolver, Submitter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loadable = LoadableBuilder::new(Blob::dla1("single"))
//!     .memory(MemoryListEntry::new(0, 1024)
//!         .with_flags(MemoryFlags::ALLOC | MemoryFlags::INPUT)
//!         .with_bind_id(0))
//!     .address(AddressListEntry::new(0, 0, 0, 1024))
//!     .task(TaskListEntry::new(0, Interface::Dla1).with_addresses([0u16]))
//!     .submit(SubmitListEntry::new(0, [0u16]))
//!     .build()?;
//!
//! let mut state = Resolver::new(&loadable).resolve(
//!     ExternalBindings::new().with_input(0, vec![0u8; 1024]),
//!     &mut HostAllocator::new(),
//! )?;
//!
//! let log = ExecutionLog::new();
//! let mut pool = EnginePool::software(&EngineConfig::default(), &log)?;
//! let report = Submitter::new(&loadable, &mut pool).submit(&mut state, 0)?;
//! assert!(report.is_success());
//! assert_eq!(log.runs_of(0), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod backends;
mod binding;
mod buffer;
mod config;
mod engine;
mod error;
mod resolver;
mod submit;

pub use backends::{ExecutionLog, ExecutionRecord, SoftwareEngine};
pub use binding::{
    BindingState, BufferSource, EventStatus, ExternalBindings, MemoryBinding, TaskState,
    UnboundReason, UnresolvedRef,
};
pub use buffer::{AllocError, Buffer, BufferAllocator, HostAllocator};
pub use config::{EngineConfig, ResolveConfig};
pub use engine::{Completion, Engine, EngineInstance, EnginePool, ResolvedAddress, TaskJob};
pub use error::{Result, RuntimeError};
pub use resolver::Resolver;
pub use submit::{CancelToken, ExecutionReport, SubmitReport, Submitter, TaskOutcome};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        BindingState, Buffer, CancelToken, EngineConfig, EnginePool, ExecutionLog,
        ExternalBindings, HostAllocator, ResolveConfig, Resolver, Result, RuntimeError,
        SoftwareEngine, SubmitReport, Submitter, TaskState,
    };
}
