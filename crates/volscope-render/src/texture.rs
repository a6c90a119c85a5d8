//! CPU-side texture images and their sampling state.
//!
//! A [`TextureImage`] is everything a backend needs to allocate a texture and
//! its sampler, plus the texel data to upload. Objects keep their images
//! around so that in-place updates can swap the data and re-upload.

use volscope_core::{ElementKind, ScalarData};

use crate::binding::SampleKind;

/// Texel formats used by volume objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexelFormat {
    R8Unorm,
    R8Uint,
    R16Float,
    R32Float,
    Rgba8Unorm,
}

impl TexelFormat {
    /// The float format volume values of `kind` are converted to.
    ///
    /// 8-bit integers and halves fit a half float exactly. Wider kinds go to
    /// 32-bit floats, exact for 16-bit integers and for 32-bit integers up
    /// to 2^24 in magnitude.
    pub fn for_volume(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Uint8 | ElementKind::Int8 | ElementKind::Float16 => Self::R16Float,
            ElementKind::Uint16
            | ElementKind::Int16
            | ElementKind::Uint32
            | ElementKind::Int32
            | ElementKind::Float32 => Self::R32Float,
        }
    }

    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Self::R8Unorm | Self::R8Uint => 1,
            Self::R16Float => 2,
            Self::R32Float | Self::Rgba8Unorm => 4,
        }
    }

    /// Whether a linear sampler may be used with this format without
    /// optional device features.
    pub fn is_filterable(self) -> bool {
        matches!(self, Self::R8Unorm | Self::R16Float | Self::Rgba8Unorm)
    }

    /// How shaders read this format.
    pub fn sample_kind(self) -> SampleKind {
        match self {
            Self::R8Uint => SampleKind::Uint,
            other => SampleKind::Float {
                filterable: other.is_filterable(),
            },
        }
    }

    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            Self::R8Unorm => wgpu::TextureFormat::R8Unorm,
            Self::R8Uint => wgpu::TextureFormat::R8Uint,
            Self::R16Float => wgpu::TextureFormat::R16Float,
            Self::R32Float => wgpu::TextureFormat::R32Float,
            Self::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDimension {
    D1,
    D2,
    D3,
}

impl TextureDimension {
    pub fn to_wgpu(self) -> wgpu::TextureDimension {
        match self {
            Self::D1 => wgpu::TextureDimension::D1,
            Self::D2 => wgpu::TextureDimension::D2,
            Self::D3 => wgpu::TextureDimension::D3,
        }
    }

    pub fn to_wgpu_view(self) -> wgpu::TextureViewDimension {
        match self {
            Self::D1 => wgpu::TextureViewDimension::D1,
            Self::D2 => wgpu::TextureViewDimension::D2,
            Self::D3 => wgpu::TextureViewDimension::D3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

impl FilterMode {
    pub fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            Self::Nearest => wgpu::FilterMode::Nearest,
            Self::Linear => wgpu::FilterMode::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    ClampToEdge,
    MirrorRepeat,
}

impl AddressMode {
    pub fn to_wgpu(self) -> wgpu::AddressMode {
        match self {
            Self::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            Self::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// Sampler state, applied to every axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampling {
    pub filter: FilterMode,
    pub address: AddressMode,
}

impl Sampling {
    pub const NEAREST_CLAMP: Self = Self {
        filter: FilterMode::Nearest,
        address: AddressMode::ClampToEdge,
    };

    pub const LINEAR_CLAMP: Self = Self {
        filter: FilterMode::Linear,
        address: AddressMode::ClampToEdge,
    };

    pub const LINEAR_MIRROR: Self = Self {
        filter: FilterMode::Linear,
        address: AddressMode::MirrorRepeat,
    };
}

/// Texture size in texels. Unused axes are 1, placeholders are all 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent3 {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3 {
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
        depth: 0,
    };

    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn texel_count(self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    pub fn is_empty(self) -> bool {
        self.texel_count() == 0
    }
}

/// Texel storage. Data that is uploaded as stored keeps its typed buffer to
/// avoid a copy; converted data remembers the kind it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum TexelData {
    Bytes(Vec<u8>),
    Scalars(ScalarData),
    Converted { from: ElementKind, bytes: Vec<u8> },
}

impl TexelData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) | Self::Converted { bytes, .. } => bytes,
            Self::Scalars(scalars) => scalars.as_bytes(),
        }
    }

    /// The element kind of the scalar data behind the texels, if any.
    pub fn element_kind(&self) -> Option<ElementKind> {
        match self {
            Self::Bytes(_) => None,
            Self::Scalars(scalars) => Some(scalars.kind()),
            Self::Converted { from, .. } => Some(*from),
        }
    }
}

/// A texture description together with the texels to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub label: String,
    pub dimension: TextureDimension,
    pub extent: Extent3,
    pub format: TexelFormat,
    pub sampling: Sampling,
    pub data: TexelData,
}

impl TextureImage {
    /// A zero-sized texture that keeps a fixed-arity binding valid.
    pub fn placeholder(
        label: impl Into<String>,
        dimension: TextureDimension,
        format: TexelFormat,
        sampling: Sampling,
    ) -> Self {
        Self {
            label: label.into(),
            dimension,
            extent: Extent3::ZERO,
            format,
            sampling,
            data: TexelData::Bytes(Vec::new()),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.extent.is_empty()
    }

    /// Bytes the texel data must hold for this extent and format.
    pub fn expected_len(&self) -> usize {
        self.extent.texel_count() * self.format.bytes_per_texel() as usize
    }

    /// Bytes per row of texels, as needed by upload layouts.
    pub fn bytes_per_row(&self) -> u32 {
        self.extent.width * self.format.bytes_per_texel()
    }
}
