//! GPU-backed resources owned by renderable objects.

use volscope_render::{
    BindGroupHandle, BindingEntry, BufferHandle, BufferUsage, GpuBackend, ProgramHandle,
    ProgramSource, RenderResult, TextureHandle, TextureImage,
};

/// A texture handle together with the CPU image it was built from.
///
/// The image is kept so that in-place updates can swap its data and mark it
/// for upload; the actual copy happens in [`flush`](Self::flush).
#[derive(Debug)]
pub struct TextureResource {
    handle: TextureHandle,
    image: TextureImage,
    needs_upload: bool,
}

impl TextureResource {
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn image(&self) -> &TextureImage {
        &self.image
    }

    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    /// Replaces the image. The texture is re-uploaded on the next flush.
    ///
    /// Callers must check storage compatibility first; the backend texture
    /// is not reallocated.
    pub fn replace_image(&mut self, image: TextureImage) {
        debug_assert_eq!(image.extent, self.image.extent);
        debug_assert_eq!(image.format, self.image.format);
        self.image = image;
        self.needs_upload = true;
    }

    /// Uploads pending texel data. Returns true if anything was sent.
    pub fn flush(&mut self, backend: &mut dyn GpuBackend) -> RenderResult<bool> {
        if !self.needs_upload {
            return Ok(false);
        }
        backend.upload_texture(self.handle, &self.image)?;
        self.needs_upload = false;
        log::debug!("uploaded '{}'", self.image.label);
        Ok(true)
    }
}

/// Records every handle allocated while building an object so that a
/// failure part way through can release them all.
#[derive(Debug, Default)]
pub struct Allocations {
    textures: Vec<TextureHandle>,
    buffers: Vec<BufferHandle>,
    programs: Vec<ProgramHandle>,
    bind_groups: Vec<BindGroupHandle>,
}

impl Allocations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(
        &mut self,
        backend: &mut dyn GpuBackend,
        image: TextureImage,
    ) -> RenderResult<TextureResource> {
        let handle = backend.create_texture(&image)?;
        self.textures.push(handle);
        Ok(TextureResource {
            handle,
            image,
            needs_upload: true,
        })
    }

    pub fn buffer(
        &mut self,
        backend: &mut dyn GpuBackend,
        label: &str,
        usage: BufferUsage,
        contents: &[u8],
    ) -> RenderResult<BufferHandle> {
        let handle = backend.create_buffer(label, usage, contents)?;
        self.buffers.push(handle);
        Ok(handle)
    }

    pub fn program(
        &mut self,
        backend: &mut dyn GpuBackend,
        source: &ProgramSource,
    ) -> RenderResult<ProgramHandle> {
        let handle = backend.create_program(source)?;
        self.programs.push(handle);
        Ok(handle)
    }

    pub fn bind_group(
        &mut self,
        backend: &mut dyn GpuBackend,
        label: &str,
        program: ProgramHandle,
        group: u32,
        entries: &[BindingEntry],
    ) -> RenderResult<BindGroupHandle> {
        let handle = backend.create_bind_group(label, program, group, entries)?;
        self.bind_groups.push(handle);
        Ok(handle)
    }

    /// Number of handles recorded so far.
    pub fn len(&self) -> usize {
        self.textures.len() + self.buffers.len() + self.programs.len() + self.bind_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases everything recorded, newest first.
    pub fn rollback(self, backend: &mut dyn GpuBackend) {
        let count = self.len();
        for handle in self.bind_groups.into_iter().rev() {
            if let Err(e) = backend.release_bind_group(handle) {
                log::warn!("rollback failed to release {handle:?}: {e}");
            }
        }
        for handle in self.programs.into_iter().rev() {
            if let Err(e) = backend.release_program(handle) {
                log::warn!("rollback failed to release {handle:?}: {e}");
            }
        }
        for handle in self.buffers.into_iter().rev() {
            if let Err(e) = backend.release_buffer(handle) {
                log::warn!("rollback failed to release {handle:?}: {e}");
            }
        }
        for handle in self.textures.into_iter().rev() {
            if let Err(e) = backend.release_texture(handle) {
                log::warn!("rollback failed to release {handle:?}: {e}");
            }
        }
        log::debug!("rolled back {count} partially created resources");
    }
}
