//! Dense scalar arrays backing volumes and masks.

use std::fmt;

use half::f16;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Numeric element kind of a scalar array.
///
/// Names follow the numpy dtype spelling used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float16,
    Float32,
}

impl ElementKind {
    /// Size of one element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            Self::Uint8 | Self::Int8 => 1,
            Self::Uint16 | Self::Int16 | Self::Float16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float32 => 4,
        }
    }

    /// Returns true for the floating point kinds.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uint8 => "uint8",
            Self::Int8 => "int8",
            Self::Uint16 => "uint16",
            Self::Int16 => "int16",
            Self::Uint32 => "uint32",
            Self::Int32 => "int32",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
        };
        f.write_str(name)
    }
}

/// Typed storage of a dense scalar array.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarData {
    Uint8(Vec<u8>),
    Int8(Vec<i8>),
    Uint16(Vec<u16>),
    Int16(Vec<i16>),
    Uint32(Vec<u32>),
    Int32(Vec<i32>),
    Float16(Vec<f16>),
    Float32(Vec<f32>),
}

impl ScalarData {
    /// Returns the element kind of the stored values.
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Uint8(_) => ElementKind::Uint8,
            Self::Int8(_) => ElementKind::Int8,
            Self::Uint16(_) => ElementKind::Uint16,
            Self::Int16(_) => ElementKind::Int16,
            Self::Uint32(_) => ElementKind::Uint32,
            Self::Int32(_) => ElementKind::Int32,
            Self::Float16(_) => ElementKind::Float16,
            Self::Float32(_) => ElementKind::Float32,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Uint8(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Uint16(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Uint32(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Float16(v) => v.len(),
            Self::Float32(v) => v.len(),
        }
    }

    /// Returns true if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw little-endian bytes, ready for a texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Uint8(v) => v.as_slice(),
            Self::Int8(v) => bytemuck::cast_slice(v),
            Self::Uint16(v) => bytemuck::cast_slice(v),
            Self::Int16(v) => bytemuck::cast_slice(v),
            Self::Uint32(v) => bytemuck::cast_slice(v),
            Self::Int32(v) => bytemuck::cast_slice(v),
            Self::Float16(v) => bytemuck::cast_slice(v),
            Self::Float32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Converts wire values to the requested kind (saturating for integers).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_f64(kind: ElementKind, values: &[f64]) -> Self {
        match kind {
            ElementKind::Uint8 => Self::Uint8(values.iter().map(|&v| v as u8).collect()),
            ElementKind::Int8 => Self::Int8(values.iter().map(|&v| v as i8).collect()),
            ElementKind::Uint16 => Self::Uint16(values.iter().map(|&v| v as u16).collect()),
            ElementKind::Int16 => Self::Int16(values.iter().map(|&v| v as i16).collect()),
            ElementKind::Uint32 => Self::Uint32(values.iter().map(|&v| v as u32).collect()),
            ElementKind::Int32 => Self::Int32(values.iter().map(|&v| v as i32).collect()),
            ElementKind::Float16 => Self::Float16(values.iter().map(|&v| f16::from_f64(v)).collect()),
            ElementKind::Float32 => Self::Float32(values.iter().map(|&v| v as f32).collect()),
        }
    }

    fn to_f64(&self) -> Vec<f64> {
        match self {
            Self::Uint8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Uint16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Uint32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Float16(v) => v.iter().map(|&x| x.to_f64()).collect(),
            Self::Float32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        }
    }
}

/// Wire form of an array: `{ "dtype": "float32", "shape": [d, h, w], "data": [...] }`.
#[derive(Serialize, Deserialize)]
struct RawArray {
    dtype: ElementKind,
    shape: [usize; 3],
    data: Vec<f64>,
}

/// A dense 3D scalar array with shape `(depth, height, width)`.
///
/// The descriptor owns its buffer. A new revision of a volume carries a new
/// buffer rather than mutating this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawArray", into = "RawArray")]
pub struct VolumeDescriptor {
    /// Element storage in `z, y, x` order (x fastest).
    pub data: ScalarData,
    /// `(depth, height, width)`.
    pub shape: [usize; 3],
}

impl From<RawArray> for VolumeDescriptor {
    fn from(raw: RawArray) -> Self {
        Self {
            data: ScalarData::from_f64(raw.dtype, &raw.data),
            shape: raw.shape,
        }
    }
}

impl From<VolumeDescriptor> for RawArray {
    fn from(volume: VolumeDescriptor) -> Self {
        Self {
            dtype: volume.data.kind(),
            shape: volume.shape,
            data: volume.data.to_f64(),
        }
    }
}

impl VolumeDescriptor {
    /// Creates a volume from typed data and a `(depth, height, width)` shape.
    pub fn new(data: ScalarData, shape: [usize; 3]) -> Self {
        Self { data, shape }
    }

    /// Returns the element kind of the backing buffer.
    pub fn element_kind(&self) -> ElementKind {
        self.data.kind()
    }

    pub fn depth(&self) -> usize {
        self.shape[0]
    }

    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }

    /// Number of voxels implied by the shape, or `None` if it does not fit
    /// in `usize`.
    pub fn voxel_count(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |n, &d| n.checked_mul(d))
    }

    /// Checks that the shape is non-degenerate and matches the buffer length.
    pub fn validate(&self, what: &str) -> Result<(), ValidationError> {
        if self.shape.iter().any(|&d| d == 0) {
            return Err(ValidationError::DegenerateShape {
                what: what.to_string(),
                shape: self.shape,
            });
        }
        let expected = self.voxel_count().ok_or_else(|| ValidationError::ShapeOverflow {
            what: what.to_string(),
            shape: self.shape,
        })?;
        if self.data.len() != expected {
            return Err(ValidationError::DataLengthMismatch {
                what: what.to_string(),
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}
