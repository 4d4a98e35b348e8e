//! Boundary adapter to the C-compatible record shapes.
//!
//! The envelope collaborator owns the physical encoding (endianness, padding,
//! table framing). It exchanges the `Wire*` shapes below with this crate; the
//! core types never see raw codes or sentinels.
//!
//! ## Sentinels
//!
//! | Field | Absent value |
//! |-------|--------------|
//! | `bind_id`, `tensor_desc_id` | [`ABSENT_ID`] (`0xFFFF`) |
//! | task `instance` | [`INSTANCE_ANY`] (`-1`) |

use crate::address::AddressListEntry;
use crate::event::{EventListEntry, EventOp};
use crate::header::{Interface, Version};
use crate::memory::{ContentRef, MemoryDomain, MemoryFlags, MemoryListEntry};
use crate::task::{Instance, TaskListEntry};
use crate::tensor::{
    DataCategory, DataFormat, DataType, Dims4, PixelFormat, PixelMapping, TensorDescListEntry,
};
use thiserror::Error;

/// Sentinel for an absent 16-bit id.
pub const ABSENT_ID: u16 = 0xFFFF;

/// Sentinel for "any instance".
pub const INSTANCE_ANY: i16 = -1;

/// Errors converting between wire shapes and records
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Raw code outside the known set
    #[error("Unknown {field} value {raw}")]
    UnknownValue {
        /// Field name
        field: &'static str,
        /// Raw value found
        raw: i64,
    },

    /// A present id collides with the absent sentinel
    #[error("{field} {id:#06x} is reserved as the absent sentinel")]
    ReservedId {
        /// Field name
        field: &'static str,
        /// Offending id
        id: u16,
    },

    /// Optional fields set without their prerequisite
    #[error("Memory {mem_id}: {field} present without {requires}")]
    Inconsistent {
        /// Memory id
        mem_id: u16,
        /// Field that is set
        field: &'static str,
        /// Field or flag it requires
        requires: &'static str,
    },
}

/// Result type alias for wire conversion
pub type Result<T> = std::result::Result<T, WireError>;

fn unknown(field: &'static str, raw: impl Into<i64>) -> WireError {
    WireError::UnknownValue {
        field,
        raw: raw.into(),
    }
}

fn encode_optional_id(field: &'static str, id: Option<u16>) -> Result<u16> {
    match id {
        Some(ABSENT_ID) => Err(WireError::ReservedId {
            field,
            id: ABSENT_ID,
        }),
        Some(id) => Ok(id),
        None => Ok(ABSENT_ID),
    }
}

fn decode_optional_id(raw: u16) -> Option<u16> {
    (raw != ABSENT_ID).then_some(raw)
}

/// Wire version.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireVersion {
    /// Major
    pub major: u8,
    /// Minor
    pub minor: u8,
    /// Sub-minor
    pub sub_minor: u8,
}

impl From<Version> for WireVersion {
    fn from(v: Version) -> Self {
        Self {
            major: v.major,
            minor: v.minor,
            sub_minor: v.sub_minor,
        }
    }
}

impl From<WireVersion> for Version {
    fn from(v: WireVersion) -> Self {
        Self::new(v.major, v.minor, v.sub_minor)
    }
}

/// Fixed part of a wire memory entry; content regions travel separately.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireMemoryListEntry {
    /// Memory id
    pub id: u16,
    /// Size
    pub size: u64,
    /// Alignment
    pub alignment: u32,
    /// Domain code
    pub domain: u8,
    /// Flag bits
    pub flags: u8,
    /// Bind id or [`ABSENT_ID`]
    pub bind_id: u16,
    /// Tensor descriptor id or [`ABSENT_ID`]
    pub tensor_desc_id: u16,
    /// Number of content regions
    pub num_contents: u32,
}

/// Encode a memory entry; returns the fixed part and its content regions.
///
/// # Errors
///
/// Returns error if a present id equals the absent sentinel.
pub fn encode_memory(entry: &MemoryListEntry) -> Result<(WireMemoryListEntry, Vec<ContentRef>)> {
    let num_contents = u32::try_from(entry.contents.len())
        .map_err(|_| unknown("num_contents", i64::MAX))?;
    let wire = WireMemoryListEntry {
        id: entry.id,
        size: entry.size,
        alignment: entry.alignment,
        domain: entry.domain.as_raw(),
        flags: entry.flags.bits(),
        bind_id: encode_optional_id("bind_id", entry.bind_id)?,
        tensor_desc_id: encode_optional_id("tensor_desc_id", entry.tensor_desc_id)?,
        num_contents,
    };
    Ok((wire, entry.contents.clone()))
}

/// Decode a memory entry from its fixed part and content regions.
///
/// `bind_id` is only honored with `INPUT`/`OUTPUT`, `tensor_desc_id` only
/// with a valid `bind_id`; anything else is rejected.
///
/// # Errors
///
/// Returns error on unknown codes, inconsistent optional fields, or a content
/// count that disagrees with `contents`.
pub fn decode_memory(wire: &WireMemoryListEntry, contents: Vec<ContentRef>) -> Result<MemoryListEntry> {
    let domain = MemoryDomain::from_raw(wire.domain).ok_or_else(|| unknown("domain", wire.domain))?;
    let flags = MemoryFlags::from_bits(wire.flags).ok_or_else(|| unknown("flags", wire.flags))?;
    if contents.len() as u64 != u64::from(wire.num_contents) {
        return Err(unknown("num_contents", wire.num_contents));
    }

    let bind_id = decode_optional_id(wire.bind_id);
    let tensor_desc_id = decode_optional_id(wire.tensor_desc_id);
    let external = flags.contains(MemoryFlags::INPUT) || flags.contains(MemoryFlags::OUTPUT);

    if bind_id.is_some() && !external {
        return Err(WireError::Inconsistent {
            mem_id: wire.id,
            field: "bind_id",
            requires: "INPUT or OUTPUT flag",
        });
    }
    if tensor_desc_id.is_some() && bind_id.is_none() {
        return Err(WireError::Inconsistent {
            mem_id: wire.id,
            field: "tensor_desc_id",
            requires: "bind_id",
        });
    }

    Ok(MemoryListEntry {
        id: wire.id,
        size: wire.size,
        alignment: wire.alignment,
        domain,
        flags,
        bind_id,
        tensor_desc_id,
        contents,
    })
}

/// Wire event entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireEventListEntry {
    /// Event id
    pub id: u16,
    /// Target
    pub target: u16,
    /// Operation code
    pub op: u8,
    /// Opaque value
    pub val: u32,
}

impl From<&EventListEntry> for WireEventListEntry {
    fn from(e: &EventListEntry) -> Self {
        Self {
            id: e.id,
            target: e.target,
            op: e.op.as_raw(),
            val: e.val,
        }
    }
}

impl TryFrom<&WireEventListEntry> for EventListEntry {
    type Error = WireError;

    fn try_from(w: &WireEventListEntry) -> Result<Self> {
        Ok(Self {
            id: w.id,
            target: w.target,
            op: EventOp::from_raw(w.op).ok_or_else(|| unknown("event op", w.op))?,
            val: w.val,
        })
    }
}

/// Wire address entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireAddressListEntry {
    /// Address id
    pub id: u16,
    /// Memory id
    pub mem_id: u16,
    /// Size
    pub size: u64,
    /// Offset
    pub offset: u64,
}

impl From<&AddressListEntry> for WireAddressListEntry {
    fn from(a: &AddressListEntry) -> Self {
        Self {
            id: a.id,
            mem_id: a.mem_id,
            size: a.size,
            offset: a.offset,
        }
    }
}

impl From<&WireAddressListEntry> for AddressListEntry {
    fn from(w: &WireAddressListEntry) -> Self {
        Self::new(w.id, w.mem_id, w.offset, w.size)
    }
}

/// Wire shape.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireDims4 {
    /// Batch
    pub n: i32,
    /// Channels
    pub c: i32,
    /// Height
    pub h: i32,
    /// Width
    pub w: i32,
}

/// Wire tensor descriptor.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireTensorDescListEntry {
    /// Descriptor id
    pub id: u16,
    /// Memory id
    pub mem_id: u16,
    /// Size
    pub size: u64,
    /// Offset
    pub offset: u64,
    /// Shape
    pub dims: WireDims4,
    /// Layout code
    pub data_format: u8,
    /// Element type code
    pub data_type: u8,
    /// Category code
    pub data_category: u8,
    /// Pixel format code
    pub pixel_format: u8,
    /// Pixel mapping code
    pub pixel_mapping: u8,
    /// Line stride
    pub line_stride: u32,
    /// Surface stride
    pub surf_stride: u32,
    /// Plane stride
    pub plane_stride: u32,
}

impl From<&TensorDescListEntry> for WireTensorDescListEntry {
    fn from(t: &TensorDescListEntry) -> Self {
        Self {
            id: t.id,
            mem_id: t.mem_id,
            size: t.size,
            offset: t.offset,
            dims: WireDims4 {
                n: t.dims.n,
                c: t.dims.c,
                h: t.dims.h,
                w: t.dims.w,
            },
            data_format: t.data_format.as_raw(),
            data_type: t.data_type.as_raw(),
            data_category: t.data_category.as_raw(),
            pixel_format: t.pixel_format.0,
            pixel_mapping: t.pixel_mapping.as_raw(),
            line_stride: t.line_stride,
            surf_stride: t.surf_stride,
            plane_stride: t.plane_stride,
        }
    }
}

impl TryFrom<&WireTensorDescListEntry> for TensorDescListEntry {
    type Error = WireError;

    fn try_from(w: &WireTensorDescListEntry) -> Result<Self> {
        Ok(Self {
            id: w.id,
            mem_id: w.mem_id,
            size: w.size,
            offset: w.offset,
            dims: Dims4::new(w.dims.n, w.dims.c, w.dims.h, w.dims.w),
            data_format: DataFormat::from_raw(w.data_format)
                .ok_or_else(|| unknown("data format", w.data_format))?,
            data_type: DataType::from_raw(w.data_type)
                .ok_or_else(|| unknown("data type", w.data_type))?,
            data_category: DataCategory::from_raw(w.data_category)
                .ok_or_else(|| unknown("data category", w.data_category))?,
            pixel_format: PixelFormat(w.pixel_format),
            pixel_mapping: PixelMapping::from_raw(w.pixel_mapping)
                .ok_or_else(|| unknown("pixel mapping", w.pixel_mapping))?,
            line_stride: w.line_stride,
            surf_stride: w.surf_stride,
            plane_stride: w.plane_stride,
        })
    }
}

/// Wire task entry; the id lists are framed by the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WireTaskListEntry {
    /// Task id
    pub id: u16,
    /// Interface code
    pub interface: u32,
    /// Instance index or [`INSTANCE_ANY`]
    pub instance: i16,
    /// Pre-action event ids
    pub preactions: Vec<u16>,
    /// Post-action event ids
    pub postactions: Vec<u16>,
    /// Address ids
    pub address_list: Vec<u16>,
}

/// Encode an instance selector.
///
/// # Errors
///
/// Returns error if the index does not fit the signed wire field.
pub fn encode_instance(instance: Instance) -> Result<i16> {
    match instance {
        Instance::Any => Ok(INSTANCE_ANY),
        Instance::Index(i) => i16::try_from(i).map_err(|_| unknown("instance", i)),
    }
}

/// Decode an instance selector; negative values other than `-1` are rejected.
///
/// # Errors
///
/// Returns error for negative values other than [`INSTANCE_ANY`].
pub fn decode_instance(raw: i16) -> Result<Instance> {
    match raw {
        INSTANCE_ANY => Ok(Instance::Any),
        i => u16::try_from(i)
            .map(Instance::Index)
            .map_err(|_| unknown("instance", i)),
    }
}

impl TryFrom<&TaskListEntry> for WireTaskListEntry {
    type Error = WireError;

    fn try_from(t: &TaskListEntry) -> Result<Self> {
        Ok(Self {
            id: t.id,
            interface: t.interface.as_raw(),
            instance: encode_instance(t.instance)?,
            preactions: t.preactions.clone(),
            postactions: t.postactions.clone(),
            address_list: t.address_list.clone(),
        })
    }
}

impl TryFrom<&WireTaskListEntry> for TaskListEntry {
    type Error = WireError;

    fn try_from(w: &WireTaskListEntry) -> Result<Self> {
        Ok(Self {
            id: w.id,
            interface: Interface::from_raw(w.interface)
                .ok_or_else(|| unknown("interface", w.interface))?,
            instance: decode_instance(w.instance)?,
            preactions: w.preactions.clone(),
            postactions: w.postactions.clone(),
            address_list: w.address_list.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tensor() -> TensorDescListEntry {
        TensorDescListEntry {
            id: 4,
            mem_id: 9,
            size: 3 * 224 * 224,
            offset: 128,
            dims: Dims4::new(1, 3, 224, 224),
            data_format: DataFormat::Nhwc,
            data_type: DataType::Uint8,
            data_category: DataCategory::Image,
            pixel_format: PixelFormat::A8B8G8R8,
            pixel_mapping: PixelMapping::PitchLinear,
            line_stride: 224 * 4,
            surf_stride: 224 * 224 * 4,
            plane_stride: 0,
        }
    }

    #[test]
    fn tensor_desc_round_trip() {
        let original = sample_tensor();
        let wire = WireTensorDescListEntry::from(&original);
        // mem_id must survive the trip, not be replaced by the descriptor id
        assert_eq!(wire.mem_id, 9);
        let back = TensorDescListEntry::try_from(&wire).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn tensor_desc_unknown_type_rejected() {
        let mut wire = WireTensorDescListEntry::from(&sample_tensor());
        wire.data_type = 200;
        let err = TensorDescListEntry::try_from(&wire).unwrap_err();
        assert_eq!(
            err,
            WireError::UnknownValue {
                field: "data type",
                raw: 200
            }
        );
    }

    #[test]
    fn memory_sentinels() {
        let plain = MemoryListEntry::new(1, 256).with_flags(MemoryFlags::ALLOC);
        let (wire, _) = encode_memory(&plain).unwrap();
        assert_eq!(wire.bind_id, ABSENT_ID);
        assert_eq!(wire.tensor_desc_id, ABSENT_ID);

        let bound = MemoryListEntry::new(2, 256)
            .with_flags(MemoryFlags::ALLOC | MemoryFlags::INPUT)
            .with_bind_id(0)
            .with_tensor_desc(3)
            .with_content("bias", 16);
        let (wire, contents) = encode_memory(&bound).unwrap();
        assert_eq!(wire.bind_id, 0);
        assert_eq!(decode_memory(&wire, contents).unwrap(), bound);
    }

    #[test]
    fn memory_bind_without_io_flag_rejected() {
        let wire = WireMemoryListEntry {
            id: 5,
            flags: MemoryFlags::ALLOC.bits(),
            bind_id: 0,
            tensor_desc_id: ABSENT_ID,
            ..WireMemoryListEntry::default()
        };
        assert!(matches!(
            decode_memory(&wire, Vec::new()),
            Err(WireError::Inconsistent { mem_id: 5, field: "bind_id", .. })
        ));
    }

    #[test]
    fn memory_reserved_bind_id_rejected() {
        let m = MemoryListEntry::new(0, 8)
            .with_flags(MemoryFlags::OUTPUT)
            .with_bind_id(ABSENT_ID);
        assert!(matches!(encode_memory(&m), Err(WireError::ReservedId { .. })));
    }

    #[test]
    fn instance_sentinel() {
        assert_eq!(encode_instance(Instance::Any).unwrap(), -1);
        assert_eq!(decode_instance(-1).unwrap(), Instance::Any);
        assert_eq!(decode_instance(2).unwrap(), Instance::Index(2));
        assert!(decode_instance(-2).is_err());
        assert!(encode_instance(Instance::Index(40_000)).is_err());
    }

    #[test]
    fn task_round_trip() {
        let task = TaskListEntry::new(1, Interface::Emu1)
            .on_instance(0)
            .with_preactions([0u16])
            .with_postactions([1u16])
            .with_addresses([2u16, 3]);
        let wire = WireTaskListEntry::try_from(&task).unwrap();
        assert_eq!(wire.interface, 2);
        assert_eq!(TaskListEntry::try_from(&wire).unwrap(), task);
    }

    #[test]
    fn event_unknown_op_rejected() {
        let wire = WireEventListEntry {
            id: 0,
            target: 0,
            op: 7,
            val: 0,
        };
        assert!(EventListEntry::try_from(&wire).is_err());
    }
}
