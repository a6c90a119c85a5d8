//! Error types for volscope.

use thiserror::Error;

use crate::array::ElementKind;

/// Maximum number of volumes a multi-volume object can composite.
pub const MAX_VOLUMES: usize = 4;

/// A descriptor that cannot be turned into GPU resources.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// More volumes than the shader has slots for.
    #[error("too many volumes: {count} (at most {MAX_VOLUMES} are supported)")]
    TooManyVolumes { count: usize },

    /// A volume or mask has a zero-length dimension.
    #[error("degenerate shape {shape:?} for {what}")]
    DegenerateShape { what: String, shape: [usize; 3] },

    /// The voxel count of a shape overflows `usize`.
    #[error("shape {shape:?} of {what} is too large")]
    ShapeOverflow { what: String, shape: [usize; 3] },

    /// The backing buffer does not match the declared shape.
    #[error("{what} holds {actual} elements but its shape needs {expected}")]
    DataLengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// A parallel list is shorter than `volume_list`.
    #[error("{list} has no entry for volume {index}")]
    MissingListEntry { list: &'static str, index: usize },

    /// Control point positions decrease somewhere.
    #[error("control points of {what} are not monotonic at point {index}")]
    NonMonotonic { what: String, index: usize },

    /// A flat control point list whose length is not a multiple of its stride.
    #[error("{what} has {len} values, expected a multiple of {stride}")]
    RaggedControlPoints {
        what: String,
        len: usize,
        stride: usize,
    },

    /// Masks are single-channel 8-bit label volumes.
    #[error("mask must hold uint8 labels, got {0}")]
    MaskElementKind(ElementKind),

    /// `samples` must be positive.
    #[error("samples must be positive, got {0}")]
    InvalidSamples(u32),

    /// `gradient_step` must be positive and finite.
    #[error("gradient step must be positive, got {0}")]
    InvalidGradientStep(f32),

    /// A scene option outside its allowed range.
    #[error("option {name} must be {expected}, got {value}")]
    InvalidOption {
        name: &'static str,
        expected: &'static str,
        value: f64,
    },
}

/// The main error type for volscope operations.
#[derive(Error, Debug)]
pub enum VolscopeError {
    /// The descriptor failed validation; no object was created.
    #[error("invalid descriptor: {0}")]
    Validation(#[from] ValidationError),

    /// An object with the given id already exists in the scene.
    #[error("object '{0}' already exists")]
    ObjectExists(String),

    /// No object with the given id exists in the scene.
    #[error("object '{0}' not found")]
    ObjectNotFound(String),

    /// No strategy is registered for the requested object kind.
    #[error("no render strategy registered for {0}")]
    NoStrategy(String),

    /// A change set or descriptor field could not be decoded.
    #[error("field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// The GPU ran out of memory for a new resource.
    #[error("GPU resources exhausted: {0}")]
    ResourceExhausted(String),

    /// Any other GPU resource failure (upload, release, shader compilation).
    #[error("render error: {0}")]
    Render(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for volscope operations.
pub type Result<T> = std::result::Result<T, VolscopeError>;
