//! volscope: multi-volume rendering objects that stay in sync with a
//! declarative description.
//!
//! A host describes an object with a [`MultiVolumeDescriptor`] and later
//! sends sparse [`ChangeSet`]s, typically decoded from JSON. The [`Scene`]
//! applies each change in place when the existing GPU resources allow it and
//! rebuilds the object otherwise.
//!
//! # Quick Start
//!
//! ```no_run
//! use volscope::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let volume = VolumeDescriptor::new(ScalarData::Float32(vec![0.5; 64]), [4, 4, 4]);
//!     let descriptor = MultiVolumeDescriptor::single(
//!         volume,
//!         ColorMapDescriptor::from_flat(&[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0])?,
//!         OpacityFunctionDescriptor::from_flat(&[0.0, 0.0, 1.0, 1.0])?,
//!         ColorRange::new(0.0, 1.0),
//!     );
//!
//!     let mut scene = Scene::new(MemoryBackend::new(), Options::default());
//!     let id = ObjectId::from("volume");
//!     scene.insert(id.clone(), ObjectKind::MultiVolume, descriptor)?;
//!
//!     scene.queue_changes(&id, ChangeSet::from_json(r#"{"color_range": {"value": [0.2, 0.8]}}"#)?)?;
//!     scene.prepare_frame()?;
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! - `volscope-core`: descriptors, change sets, options and errors
//! - `volscope-render`: GPU backends, texture images, shader and uniforms
//! - `volscope-structures`: the multi-volume object and render strategies

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod headless;
mod init;
mod scene;

pub use headless::headless_scene;
pub use init::{init_logging, init_logging_with_default};
pub use scene::{ApplyOutcome, FrameStats, ObjectId, Scene};

// Re-export core types
pub use volscope_core::{
    Change, ChangeSet, ColorMapDescriptor, ColorPoint, ColorRange, Decomposed, ElementKind,
    Field, FieldValue, ModelMatrix, MultiVolumeDescriptor, OpacityFunctionDescriptor,
    OpacityPoint, Options, Resolution, Result, ScalarData, ValidationError, VolscopeError,
    VolumeDescriptor, MAX_VOLUMES,
};
pub use volscope_core::{Mat4, Quat, Vec3, Vec4};

// Re-export render types
pub use volscope_render::{
    synthesize, to_fixed_table, BindGroupHandle, BindingEntry, BufferHandle, BufferUsage,
    DrawCall, Extent3, GpuBackend, MemoryBackend, RenderError, ResourceCounts, Sampling,
    TexelData, TexelFormat, TextureDimension, TextureHandle, TextureImage, WgpuBackend, MASK_LABELS, SCENE_GROUP,
    SCENE_UNIFORMS_SIZE, TRANSFER_FUNCTION_WIDTH, VOLUME_SLOTS,
};

// Re-export structures
pub use volscope_structures::{
    MultiVolumeObject, MultiVolumeStrategy, ObjectKind, RenderObject, RenderStrategy,
    StrategyRegistry, VolumeSlot,
};
