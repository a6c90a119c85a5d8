//! Core types for volscope.
//!
//! This crate holds everything that describes a multi-volume object without
//! touching the GPU:
//! - [`MultiVolumeDescriptor`] and the arrays, color maps and opacity
//!   functions it is built from
//! - [`ChangeSet`] and [`Resolution`] for incremental updates
//! - [`Options`] and the error types

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod array;
pub mod change;
pub mod descriptor;
pub mod error;
pub mod options;
pub mod transfer;

pub use array::{ElementKind, ScalarData, VolumeDescriptor};
pub use change::{Change, ChangeSet, Field, FieldValue, Resolution};
pub use descriptor::{
    Decomposed, ModelMatrix, MultiVolumeDescriptor, DEFAULT_GRADIENT_STEP, DEFAULT_SAMPLES,
};
pub use error::{Result, ValidationError, VolscopeError, MAX_VOLUMES};
pub use options::Options;
pub use transfer::{
    ColorMapDescriptor, ColorPoint, ColorRange, OpacityFunctionDescriptor, OpacityPoint,
};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec3, Vec4};
