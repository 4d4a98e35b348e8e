//! Capability query layer over a small two-input, one-output network

use dla_format::{
    AddressListEntry, Blob, DataType, Dims4, EventListEntry, Interface, MemoryFlags,
    MemoryListEntry, SubmitListEntry, Table, TaskListEntry, TensorDescListEntry,
};
use dla_loadable::{Loadable, LoadableBuilder, LoadableError, ParsedLoadable};

fn network() -> ParsedLoadable {
    let io = MemoryFlags::ALLOC | MemoryFlags::INPUT;
    LoadableBuilder::new(Blob::dla1("two-in"))
        // declared out of bind order on purpose
        .memory(MemoryListEntry::new(0, 64).with_flags(io).with_bind_id(1).with_tensor_desc(1))
        .memory(MemoryListEntry::new(1, 32).with_flags(io).with_bind_id(0).with_tensor_desc(0))
        .memory(
            MemoryListEntry::new(2, 16)
                .with_flags(MemoryFlags::ALLOC | MemoryFlags::OUTPUT)
                .with_bind_id(0)
                .with_tensor_desc(2),
        )
        .memory(MemoryListEntry::new(3, 128).with_flags(MemoryFlags::ALLOC))
        .tensor_desc(TensorDescListEntry::feature(0, 1, Dims4::new(1, 2, 4, 4), DataType::Int8, 32))
        .tensor_desc(TensorDescListEntry::feature(1, 0, Dims4::new(1, 4, 4, 4), DataType::Int8, 64))
        .tensor_desc(TensorDescListEntry::feature(2, 2, Dims4::new(1, 1, 4, 4), DataType::Int8, 16))
        .address(AddressListEntry::new(0, 0, 0, 64))
        .address(AddressListEntry::new(1, 1, 0, 32))
        .address(AddressListEntry::new(2, 2, 0, 16))
        .event(EventListEntry::signal(0, 0))
        .task(
            TaskListEntry::new(0, Interface::Dla1)
                .with_addresses([0u16, 1, 2])
                .with_postactions([0u16]),
        )
        .submit(SubmitListEntry::new(0, [0u16]))
        .network_data_type(DataType::Int8)
        .build()
        .expect("valid loadable")
}

#[test]
fn counts_match_tables() {
    let l = network();
    assert_eq!(l.num_memory_entries(), 4);
    assert_eq!(l.num_event_entries(), 1);
    assert_eq!(l.num_address_entries(), 3);
    assert_eq!(l.num_tensor_desc_entries(), 3);
    assert_eq!(l.num_task_entries(), 1);
    assert_eq!(l.num_submit_entries(), 1);
}

#[test]
fn out_of_range_ids_are_not_found() {
    let l = network();
    assert_eq!(
        l.memory_entry(9).unwrap_err(),
        LoadableError::NotFound {
            table: Table::Memory,
            id: 9
        }
    );
    assert!(matches!(
        l.task_entry(1),
        Err(LoadableError::NotFound { table: Table::Task, id: 1 })
    ));
    assert!(matches!(
        l.submit_entry(3),
        Err(LoadableError::NotFound { table: Table::Submit, id: 3 })
    ));
}

#[test]
fn repeated_queries_are_identical() {
    let l = network();
    for id in 0..4 {
        assert_eq!(l.memory_entry(id).unwrap(), l.memory_entry(id).unwrap());
    }
    assert_eq!(l.task_entry(0).unwrap(), l.task_entry(0).unwrap());
    assert_eq!(l.input_tensors().unwrap(), l.input_tensors().unwrap());
}

#[test]
fn inputs_ordered_by_bind_id() {
    let l = network();
    let inputs = l.input_tensors().unwrap();
    assert_eq!(inputs.len(), 2);
    // bind 0 lives in memory 1, bind 1 in memory 0
    assert_eq!(inputs[0].mem_id, 1);
    assert_eq!(inputs[1].mem_id, 0);
    assert_eq!(l.num_input_tensors().unwrap(), 2);
    assert_eq!(l.input_tensor_desc(1).unwrap().id, 1);
}

#[test]
fn outputs_and_missing_bindings() {
    let l = network();
    assert_eq!(l.num_output_tensors().unwrap(), 1);
    assert_eq!(l.output_tensor_desc(0).unwrap().mem_id, 2);
    assert_eq!(
        l.output_tensor_desc(1).unwrap_err(),
        LoadableError::BindingNotFound {
            direction: "output",
            bind_id: 1
        }
    );
}

#[test]
fn network_data_type_declared_or_unspecified() {
    assert_eq!(network().network_data_type().unwrap(), DataType::Int8);

    let bare = LoadableBuilder::new(Blob::dla1("bare")).build().unwrap();
    assert_eq!(
        bare.network_data_type().unwrap_err(),
        LoadableError::Unspecified {
            what: "network data type"
        }
    );
}

#[test]
fn concurrent_readers_share_one_loadable() {
    let l = std::sync::Arc::new(network());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let l = std::sync::Arc::clone(&l);
            std::thread::spawn(move || l.input_tensors().map(|t| t.len()))
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap().unwrap(), 2);
    }
}
