// SPDX-License-Identifier: AGPL-3.0-only

//! Resolve and run a small two-stage pipeline on software engines.
//!
//! Stage 0 (DLA1) reads the input and writes an intermediate buffer, stage 1
//! (EMU1) waits for it and writes the output. Weights come from a packaged
//! content blob.
//!
//! ```text
//! RUST_LOG=dla_runtime=debug cargo run --example run_pipeline
//! ```

use anyhow::{Context, Result};
use dla_format::{
    AddressListEntry, Blob, DataType, Dims4, EventListEntry, Interface, MemoryFlags,
    MemoryListEntry, SubmitListEntry, TaskListEntry, TensorDescListEntry,
};
use dla_loadable::{Loadable, LoadableBuilder};
use dla_runtime::{
    EngineConfig, EnginePool, ExecutionLog, ExternalBindings, HostAllocator, Resolver, Submitter,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let loadable = LoadableBuilder::new(Blob::dla1("pipeline"))
        .memory(
            MemoryListEntry::new(0, 784)
                .with_flags(MemoryFlags::INPUT)
                .with_bind_id(0)
                .with_tensor_desc(0),
        )
        .memory(
            MemoryListEntry::new(1, 512)
                .with_flags(MemoryFlags::ALLOC | MemoryFlags::SET)
                .with_alignment(64)
                .with_content("conv1.weights", 0),
        )
        .memory(MemoryListEntry::new(2, 256).with_flags(MemoryFlags::ALLOC))
        .memory(
            MemoryListEntry::new(3, 10)
                .with_flags(MemoryFlags::OUTPUT)
                .with_bind_id(0)
                .with_tensor_desc(1),
        )
        .tensor_desc(TensorDescListEntry::feature(
            0,
            0,
            Dims4::new(1, 1, 28, 28),
            DataType::Int8,
            784,
        ))
        .tensor_desc(TensorDescListEntry::feature(
            1,
            3,
            Dims4::new(1, 10, 1, 1),
            DataType::Int8,
            10,
        ))
        .address(AddressListEntry::new(0, 0, 0, 784))
        .address(AddressListEntry::new(1, 1, 0, 512))
        .address(AddressListEntry::new(2, 2, 0, 256))
        .address(AddressListEntry::new(3, 3, 0, 10))
        .event(EventListEntry::signal(0, 0))
        .task(
            TaskListEntry::new(0, Interface::Dla1)
                .with_addresses([0u16, 1, 2])
                .with_postactions([0u16]),
        )
        .task(
            TaskListEntry::new(1, Interface::Emu1)
                .with_addresses([2u16, 3])
                .with_preactions([0u16]),
        )
        .submit(SubmitListEntry::new(0, [0u16, 1]))
        .content("conv1.weights", vec![0x11u8; 512])
        .network_data_type(DataType::Int8)
        .build()
        .context("building loadable")?;

    let input = loadable.input_tensor_desc(0)?;
    println!(
        "Network '{}': input {}x{}x{}x{} {:?}",
        loadable.name(),
        input.dims.n,
        input.dims.c,
        input.dims.h,
        input.dims.w,
        loadable.network_data_type()?
    );

    let mut allocator = HostAllocator::new();
    let mut state = Resolver::new(&loadable).resolve(
        ExternalBindings::new()
            .with_input(0, vec![1u8; 784])
            .with_output(0, vec![0u8; 10]),
        &mut allocator,
    )?;
    println!(
        "Resolved: {} allocation(s), {} bytes",
        allocator.allocation_count(),
        allocator.allocated_bytes()
    );

    let log = ExecutionLog::new();
    let config = EngineConfig::default().with_task_latency(Duration::from_millis(5));
    let mut pool = EnginePool::software(&config, &log)?;
    let report = Submitter::new(&loadable, &mut pool).submit_all(&mut state)?;

    for submit in &report.submits {
        for outcome in &submit.outcomes {
            let instance = outcome
                .instance
                .map_or_else(|| "-".to_string(), |i| i.to_string());
            println!(
                "submit {} task {}: {:?} on {instance}",
                submit.submit_id, outcome.task_id, outcome.state
            );
        }
    }

    let output = state.take_buffer(3).context("output buffer")?;
    println!("Output: {} bytes", output.len());
    Ok(())
}
