#![deny(unsafe_code)]

//! Capability query layer for DLA loadables
//!
//! A loadable packages a pre-compiled inference graph as flat record tables
//! (memory, events, addresses, tensor descriptors, tasks, submits) plus the
//! named content blobs that seed `SET` memory. This crate exposes them
//! read-only through the [`Loadable`] trait.
//!
//! # Structure
//!
//! - **Header**: name, size, target interface, version (checked first)
//! - **Tables**: one slice per record type, id lookup via [`find_record`]
//! - **Contents**: named `Bytes` blobs behind [`ContentSource`]
//! - **Derived queries**: network data type, declared input/output tensors
//!
//! # Example
//!
//! ```
//! use dla_format::{Blob, DataType, Dims4, MemoryFlags, MemoryListEntry, TensorDescListEntry};
//! use dla_loadable::{Loadable, LoadableBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loadable = LoadableBuilder::new(Blob::dla1("lenet"))
//!     .memory(
//!         MemoryListEntry::new(0, 784)
//!             .with_flags(MemoryFlags::ALLOC | MemoryFlags::INPUT)
//!             .with_bind_id(0)
//!             .with_tensor_desc(0),
//!     )
//!     .tensor_desc(TensorDescListEntry::feature(0, 0, Dims4::new(1, 1, 28, 28), DataType::Int8, 784))
//!     .network_data_type(DataType::Int8)
//!     .build()?;
//!
//! println!("Network: {}", loadable.name());
//! println!("Inputs: {}", loadable.num_input_tensors()?);
//! assert_eq!(loadable.input_tensor_desc(0)?.dims.h, 28);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod builder;
mod content;
mod error;
mod loadable;
mod table;

pub use builder::{LoadableBuilder, VersionPolicy};
pub use content::{ContentSource, ContentStore};
pub use error::{LoadableError, Result};
pub use loadable::{Loadable, ParsedLoadable};
pub use table::find_record;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        ContentSource, Loadable, LoadableBuilder, LoadableError, ParsedLoadable, Result,
    };
}
