//! GPU resource backends.
//!
//! Objects never touch the device directly. Every allocation, upload and
//! release goes through [`GpuBackend`], which hands out opaque handles. The
//! wgpu implementation owns the real resources; the memory implementation
//! only does the bookkeeping, which is what tests and leak checks need.

mod memory;
mod wgpu_backend;

pub use memory::{MemoryBackend, ResourceCounts};
pub use wgpu_backend::WgpuBackend;

use crate::binding::BindingEntry;
use crate::error::RenderResult;
use crate::shader::ProgramSource;
use crate::texture::TextureImage;

/// Handle to a texture together with its sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Handle to a compiled shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u64);

/// Handle to a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindGroupHandle(pub u64);

/// Everything needed to draw one object: its program, its own bind group
/// and its vertices. The scene group is supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub bind_group: BindGroupHandle,
    pub vertex_buffer: BufferHandle,
    pub vertex_count: u32,
}

/// How a buffer is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Uniform,
}

/// The operations volume objects need from a GPU.
///
/// Texture creation only allocates storage and sampler state; texel data is
/// sent by a separate [`upload_texture`](Self::upload_texture) call so that
/// callers can defer uploads to the next frame.
pub trait GpuBackend {
    /// Allocates a texture and its sampler for `image`.
    fn create_texture(&mut self, image: &TextureImage) -> RenderResult<TextureHandle>;

    /// Copies the texels of `image` into an existing texture.
    fn upload_texture(&mut self, handle: TextureHandle, image: &TextureImage) -> RenderResult<()>;

    fn release_texture(&mut self, handle: TextureHandle) -> RenderResult<()>;

    /// Allocates a buffer initialized with `contents`.
    fn create_buffer(
        &mut self,
        label: &str,
        usage: BufferUsage,
        contents: &[u8],
    ) -> RenderResult<BufferHandle>;

    /// Overwrites a buffer from offset zero.
    fn write_buffer(&mut self, handle: BufferHandle, contents: &[u8]) -> RenderResult<()>;

    fn release_buffer(&mut self, handle: BufferHandle) -> RenderResult<()>;

    /// Compiles a shader program.
    fn create_program(&mut self, source: &ProgramSource) -> RenderResult<ProgramHandle>;

    fn release_program(&mut self, handle: ProgramHandle) -> RenderResult<()>;

    /// Creates bind group `group` of `program` from `entries`.
    ///
    /// Entries are checked against the layout the program declared, so an
    /// accepted group can be used with the program's pipeline.
    fn create_bind_group(
        &mut self,
        label: &str,
        program: ProgramHandle,
        group: u32,
        entries: &[BindingEntry],
    ) -> RenderResult<BindGroupHandle>;

    fn release_bind_group(&mut self, handle: BindGroupHandle) -> RenderResult<()>;
}

/// Monotonic handle counter shared by the backends. Handles are never reused.
#[derive(Debug, Default)]
pub(crate) struct HandleCounter(u64);

impl HandleCounter {
    pub(crate) fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// Checks that `image` carries exactly the bytes its extent needs.
pub(crate) fn check_upload_len(image: &TextureImage) -> RenderResult<()> {
    let expected = image.expected_len();
    let actual = image.data.as_bytes().len();
    if expected == actual {
        Ok(())
    } else {
        Err(crate::error::RenderError::UploadSizeMismatch {
            label: image.label.clone(),
            expected,
            actual,
        })
    }
}
