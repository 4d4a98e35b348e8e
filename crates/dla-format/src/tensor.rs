//! Tensor descriptors.
//!
//! A descriptor is the logical view over a memory window: shape, element
//! type, layout and strides. Declared network inputs and outputs are joined to
//! physical memory through `mem_id`.

use crate::table::{Record, Table};

macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $raw:ty { $( $(#[$vmeta:meta])* $variant:ident = $value:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Raw code used on the wire.
            pub const fn as_raw(self) -> $raw {
                match self {
                    $( Self::$variant => $value ),+
                }
            }

            /// Value for a raw code.
            pub const fn from_raw(raw: $raw) -> Option<Self> {
                match raw {
                    $( $value => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

raw_enum! {
    /// Memory layout of a tensor.
    DataFormat: u8 {
        /// Unknown layout
        Unknown = 0,
        /// Batch, channel, height, width
        Nchw = 1,
        /// Batch, height, width, channel
        Nhwc = 2,
        /// Channel-blocked feature layout used by the accelerator
        NcxHwx = 3,
    }
}

raw_enum! {
    /// Element type.
    DataType: u8 {
        /// Unknown type
        Unknown = 0,
        /// 32-bit float
        Float = 1,
        /// 16-bit float
        Half = 2,
        /// Signed 16-bit integer
        Int16 = 3,
        /// Signed 8-bit integer
        Int8 = 4,
        /// Unsigned 8-bit integer
        Uint8 = 5,
        /// Unsigned 16-bit integer
        Uint16 = 6,
    }
}

raw_enum! {
    /// What a tensor carries.
    DataCategory: u8 {
        /// Image input
        Image = 0,
        /// Weights
        Weight = 1,
        /// Feature map
        Feature = 2,
        /// Planar data
        Planar = 3,
        /// Bias
        Bias = 4,
    }
}

raw_enum! {
    /// Pixel-to-memory mapping.
    PixelMapping: u8 {
        /// Linear pitch
        PitchLinear = 0,
        /// Not applicable
        Invalid = 1,
    }
}

impl DataType {
    /// Bytes per element, `None` for `Unknown`.
    pub const fn size_bytes(self) -> Option<u64> {
        match self {
            Self::Unknown => None,
            Self::Float => Some(4),
            Self::Half | Self::Int16 | Self::Uint16 => Some(2),
            Self::Int8 | Self::Uint8 => Some(1),
        }
    }
}

/// Pixel format code.
///
/// The accelerator defines many image pixel formats; only the ones the
/// runtime names directly get constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelFormat(pub u8);

impl PixelFormat {
    /// 8-bit single channel
    pub const R8: Self = Self(0);
    /// 16-bit single channel
    pub const R16: Self = Self(4);
    /// 32-bit RGBA
    pub const A8B8G8R8: Self = Self(12);
    /// Feature-map data, not an image
    pub const FEATURE: Self = Self(36);
    /// Channel-blocked feature-map data
    pub const FEATURE_X8: Self = Self(37);
}

/// Four-dimensional shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dims4 {
    /// Batch
    pub n: i32,
    /// Channels
    pub c: i32,
    /// Height
    pub h: i32,
    /// Width
    pub w: i32,
}

impl Dims4 {
    /// Create a shape.
    pub const fn new(n: i32, c: i32, h: i32, w: i32) -> Self {
        Self { n, c, h, w }
    }

    /// Element count, `None` if any dimension is negative or the product overflows.
    pub fn volume(&self) -> Option<u64> {
        [self.n, self.c, self.h, self.w]
            .into_iter()
            .try_fold(1u64, |acc, d| acc.checked_mul(u64::try_from(d).ok()?))
    }
}

/// Tensor descriptor list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDescListEntry {
    /// Descriptor id
    pub id: u16,
    /// Memory entry the tensor lives in
    pub mem_id: u16,
    /// Byte size of the tensor
    pub size: u64,
    /// Byte offset within the memory entry
    pub offset: u64,
    /// Shape
    pub dims: Dims4,
    /// Layout
    pub data_format: DataFormat,
    /// Element type
    pub data_type: DataType,
    /// Category
    pub data_category: DataCategory,
    /// Pixel format
    pub pixel_format: PixelFormat,
    /// Pixel mapping
    pub pixel_mapping: PixelMapping,
    /// Bytes between lines
    pub line_stride: u32,
    /// Bytes between surfaces
    pub surf_stride: u32,
    /// Bytes between planes
    pub plane_stride: u32,
}

impl TensorDescListEntry {
    /// Feature-map descriptor covering `size` bytes at the start of `mem_id`.
    pub fn feature(id: u16, mem_id: u16, dims: Dims4, data_type: DataType, size: u64) -> Self {
        Self {
            id,
            mem_id,
            size,
            offset: 0,
            dims,
            data_format: DataFormat::Nchw,
            data_type,
            data_category: DataCategory::Feature,
            pixel_format: PixelFormat::FEATURE,
            pixel_mapping: PixelMapping::PitchLinear,
            line_stride: 0,
            surf_stride: 0,
            plane_stride: 0,
        }
    }

    /// Set the strides (line, surface, plane).
    #[must_use]
    pub fn with_strides(mut self, line: u32, surf: u32, plane: u32) -> Self {
        self.line_stride = line;
        self.surf_stride = surf;
        self.plane_stride = plane;
        self
    }

    /// Set the byte offset within memory.
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

impl Record for TensorDescListEntry {
    const TABLE: Table = Table::TensorDesc;

    fn id(&self) -> u16 {
        self.id
    }
}
