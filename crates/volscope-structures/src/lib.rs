//! Renderable object implementations for volscope.
//!
//! This crate provides the lifecycle of renderable objects:
//! - [`MultiVolumeObject`]: resource building, in-place updates, deferred
//!   uploads and disposal for up to four composited volumes
//! - [`RenderStrategy`] and [`StrategyRegistry`] for selecting the builder
//!   of each object kind

// Graphics code intentionally uses casts for indices, colors, and coordinates
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod multi_volume;
pub mod resource;
pub mod strategy;

pub use multi_volume::{MaskState, MultiVolumeObject, VolumeSlot};
pub use resource::{Allocations, TextureResource};
pub use strategy::{
    MultiVolumeStrategy, ObjectKind, RenderObject, RenderStrategy, StrategyRegistry,
};
