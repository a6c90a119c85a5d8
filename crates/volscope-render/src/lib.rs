//! Rendering backend for volscope.
//!
//! This crate provides everything below the object lifecycle:
//! - The [`GpuBackend`] seam with wgpu and in-memory implementations
//! - CPU-side texture images for volumes, masks and jitter noise
//! - Transfer function synthesis
//! - The multi-volume shader and its uniform block

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod binding;
pub mod buffer;
pub mod error;
pub mod geometry;
pub mod jitter;
pub mod shader;
pub mod texture;
pub mod transfer_function;
pub mod uniforms;
pub mod volume_texture;

pub use backend::{
    BindGroupHandle, BufferHandle, BufferUsage, DrawCall, GpuBackend, MemoryBackend,
    ProgramHandle, ResourceCounts, TextureHandle, WgpuBackend,
};
pub use binding::{
    check_bind_group, BindGroupLayout, BindingEntry, BindingKind, BindingResource, BindingSlot,
    ResourceInfo, SampleKind,
};
pub use error::{RenderError, RenderResult};
pub use geometry::{BoundingBox, BoundingSphere, UnitCube};
pub use jitter::{jitter_image, JITTER_MULTIPLIER, JITTER_SIZE};
pub use shader::{
    bindings, multi_volume_layout, multi_volume_program, scene_layout, ProgramSource,
    ShaderBuilder, OBJECT_GROUP, SCENE_GROUP, SCENE_UNIFORMS_SIZE, USE_MASK, USE_SPECULAR,
};
pub use texture::{
    AddressMode, Extent3, FilterMode, Sampling, TexelData, TexelFormat, TextureDimension,
    TextureImage,
};
pub use transfer_function::{
    placeholder_transfer_function_image, synthesize, transfer_function_image, RgbaImage,
    TRANSFER_FUNCTION_WIDTH,
};
pub use uniforms::{to_fixed_table, MultiVolumeUniforms, MASK_LABELS, VOLUME_SLOTS};
pub use volume_texture::{
    is_mask_kind, is_storage_compatible, mask_image, placeholder_mask_image,
    placeholder_volume_image, volume_image, volume_texels,
};
