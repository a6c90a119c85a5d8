//! Rendering error types.

use thiserror::Error;
use volscope_core::VolscopeError;

use crate::backend::{BindGroupHandle, BufferHandle, ProgramHandle, TextureHandle};

/// Errors that can occur during GPU resource operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Texture creation failed.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// Buffer creation or a buffer write failed.
    #[error("buffer operation failed: {0}")]
    BufferOperationFailed(String),

    /// The device rejected a texture upload.
    #[error("texture upload failed: {0}")]
    UploadFailed(String),

    /// Bind group creation failed.
    #[error("bind group creation failed: {0}")]
    BindGroupCreationFailed(String),

    /// A bind group entry does not fit its layout slot.
    #[error("bind group '{label}' binding {binding}: {reason}")]
    BindGroupMismatch {
        label: String,
        binding: u32,
        reason: String,
    },

    /// Upload data does not fit the texture it targets.
    #[error("upload of {actual} bytes does not match texture '{label}' ({expected} bytes)")]
    UploadSizeMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },

    /// The handle was never allocated or has already been released.
    #[error("unknown texture handle {0:?}")]
    UnknownTexture(TextureHandle),

    /// The handle was never allocated or has already been released.
    #[error("unknown buffer handle {0:?}")]
    UnknownBuffer(BufferHandle),

    /// The handle was never allocated or has already been released.
    #[error("unknown program handle {0:?}")]
    UnknownProgram(ProgramHandle),

    /// The handle was never allocated or has already been released.
    #[error("unknown bind group handle {0:?}")]
    UnknownBindGroup(BindGroupHandle),

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for VolscopeError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::OutOfMemory => Self::ResourceExhausted(err.to_string()),
            other => Self::Render(other.to_string()),
        }
    }
}
