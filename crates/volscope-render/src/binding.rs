//! Explicit bind group layouts and the checks that keep bind groups valid.
//!
//! Programs declare their layouts up front instead of having the backend
//! derive them from the shader. A derived layout depends on how the shader
//! reads each texture and on which bindings survive constant folding; an
//! explicit one is the same for every object, so a bind group that passes
//! [`check_bind_group`] also binds on the GPU.

use crate::backend::{BufferHandle, BufferUsage, TextureHandle};
use crate::error::{RenderError, RenderResult};
use crate::texture::{FilterMode, TexelFormat, TextureDimension};

/// How a shader reads the texels of a bound texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// `texture_*<f32>`. Filterable bindings also accept filtering samplers.
    Float { filterable: bool },
    /// `texture_*<u32>`, read with `textureLoad`.
    Uint,
}

impl SampleKind {
    /// True if a texture whose format samples as `self` may be bound where
    /// the layout declares `layout`.
    pub fn binds_as(self, layout: Self) -> bool {
        match (self, layout) {
            (Self::Float { filterable }, Self::Float { filterable: needed }) => filterable || !needed,
            (Self::Uint, Self::Uint) => true,
            _ => false,
        }
    }

    pub fn to_wgpu(self) -> wgpu::TextureSampleType {
        match self {
            Self::Float { filterable } => wgpu::TextureSampleType::Float { filterable },
            Self::Uint => wgpu::TextureSampleType::Uint,
        }
    }
}

/// The resource type a layout entry expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    UniformBuffer,
    Texture {
        dimension: TextureDimension,
        sample: SampleKind,
    },
    /// A sampler. Non-filtering bindings need nearest filters.
    Sampler { filtering: bool },
}

/// One entry of a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSlot {
    pub binding: u32,
    pub kind: BindingKind,
}

impl BindingSlot {
    pub const fn uniform(binding: u32) -> Self {
        Self {
            binding,
            kind: BindingKind::UniformBuffer,
        }
    }

    pub const fn texture(binding: u32, dimension: TextureDimension, sample: SampleKind) -> Self {
        Self {
            binding,
            kind: BindingKind::Texture { dimension, sample },
        }
    }

    pub const fn sampler(binding: u32, filtering: bool) -> Self {
        Self {
            binding,
            kind: BindingKind::Sampler { filtering },
        }
    }

    pub fn to_wgpu(self) -> wgpu::BindGroupLayoutEntry {
        let ty = match self.kind {
            BindingKind::UniformBuffer => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            BindingKind::Texture { dimension, sample } => wgpu::BindingType::Texture {
                sample_type: sample.to_wgpu(),
                view_dimension: dimension.to_wgpu_view(),
                multisampled: false,
            },
            BindingKind::Sampler { filtering: true } => {
                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
            }
            BindingKind::Sampler { filtering: false } => {
                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering)
            }
        };
        wgpu::BindGroupLayoutEntry {
            binding: self.binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty,
            count: None,
        }
    }
}

/// Layout of one bind group: entries in binding order.
pub type BindGroupLayout = Vec<BindingSlot>;

/// What a bind group entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResource {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    /// The sampler created together with a texture.
    Sampler(TextureHandle),
}

/// One entry of a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingEntry {
    pub binding: u32,
    pub resource: BindingResource,
}

impl BindingEntry {
    pub const fn buffer(binding: u32, handle: BufferHandle) -> Self {
        Self {
            binding,
            resource: BindingResource::Buffer(handle),
        }
    }

    pub const fn texture(binding: u32, handle: TextureHandle) -> Self {
        Self {
            binding,
            resource: BindingResource::Texture(handle),
        }
    }

    pub const fn sampler(binding: u32, handle: TextureHandle) -> Self {
        Self {
            binding,
            resource: BindingResource::Sampler(handle),
        }
    }
}

/// What a backend knows about a bound resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceInfo {
    Buffer(BufferUsage),
    Texture {
        dimension: TextureDimension,
        format: TexelFormat,
    },
    Sampler { filter: FilterMode },
}

/// Checks `entries` against `layout`, looking resources up with `info`.
///
/// Every layout entry must be filled exactly once, with a live resource of
/// the declared type.
pub fn check_bind_group(
    label: &str,
    layout: &[BindingSlot],
    entries: &[BindingEntry],
    info: impl Fn(BindingResource) -> Option<ResourceInfo>,
) -> RenderResult<()> {
    let mismatch = |binding: u32, reason: String| RenderError::BindGroupMismatch {
        label: label.to_string(),
        binding,
        reason,
    };

    if entries.len() != layout.len() {
        return Err(RenderError::BindGroupCreationFailed(format!(
            "'{label}' has {} entries but its layout has {}",
            entries.len(),
            layout.len()
        )));
    }

    for slot in layout {
        let mut matching = entries.iter().filter(|e| e.binding == slot.binding);
        let (Some(entry), None) = (matching.next(), matching.next()) else {
            return Err(mismatch(slot.binding, "must be bound exactly once".into()));
        };
        let resource = info(entry.resource)
            .ok_or_else(|| mismatch(slot.binding, format!("{:?} is not live", entry.resource)))?;

        match (slot.kind, resource) {
            (BindingKind::UniformBuffer, ResourceInfo::Buffer(BufferUsage::Uniform)) => {}
            (
                BindingKind::Texture { dimension, sample },
                ResourceInfo::Texture {
                    dimension: actual,
                    format,
                },
            ) => {
                if dimension != actual {
                    return Err(mismatch(
                        slot.binding,
                        format!("expects a {dimension:?} texture, got {actual:?}"),
                    ));
                }
                if !format.sample_kind().binds_as(sample) {
                    return Err(mismatch(
                        slot.binding,
                        format!("expects {sample:?} texels, got {format:?}"),
                    ));
                }
            }
            (BindingKind::Sampler { filtering }, ResourceInfo::Sampler { filter }) => {
                if !filtering && filter != FilterMode::Nearest {
                    return Err(mismatch(
                        slot.binding,
                        "non-filtering binding needs a nearest sampler".into(),
                    ));
                }
            }
            (kind, resource) => {
                return Err(mismatch(
                    slot.binding,
                    format!("expects {kind:?}, got {resource:?}"),
                ));
            }
        }
    }
    Ok(())
}
