//! Accounting backend that keeps no GPU state.

use std::collections::HashMap;

use super::{
    check_upload_len, BindGroupHandle, BufferHandle, BufferUsage, GpuBackend, HandleCounter,
    ProgramHandle, TextureHandle,
};
use crate::binding::{check_bind_group, BindGroupLayout, BindingEntry, BindingResource, ResourceInfo};
use crate::error::{RenderError, RenderResult};
use crate::shader::ProgramSource;
use crate::texture::{Extent3, Sampling, TexelFormat, TextureDimension, TextureImage};

/// Allocation, upload and release totals since the backend was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub textures_created: usize,
    pub textures_released: usize,
    pub texture_uploads: usize,
    pub buffers_created: usize,
    pub buffers_released: usize,
    pub buffer_writes: usize,
    pub programs_created: usize,
    pub programs_released: usize,
    pub bind_groups_created: usize,
    pub bind_groups_released: usize,
}

#[derive(Debug, Clone)]
struct TextureRecord {
    label: String,
    dimension: TextureDimension,
    extent: Extent3,
    format: TexelFormat,
    sampling: Sampling,
    bytes: usize,
    uploads: usize,
}

#[derive(Debug, Clone)]
struct ProgramRecord {
    label: String,
    bind_groups: Vec<BindGroupLayout>,
}

#[derive(Debug, Clone)]
struct BindGroupRecord {
    program: ProgramHandle,
    group: u32,
    entries: Vec<BindingEntry>,
}

#[derive(Debug, Clone)]
struct BufferRecord {
    usage: BufferUsage,
    contents: Vec<u8>,
}

/// A [`GpuBackend`] that records what would have been allocated.
///
/// Releasing a handle twice, or one that was never allocated, is an error,
/// which makes double frees and leaks visible in tests. Bind groups are
/// checked against their program's layout the same way a device checks
/// them. An optional texture
/// budget makes allocations fail with [`RenderError::OutOfMemory`] once the
/// given number of live textures is reached.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    handles: HandleCounter,
    textures: HashMap<TextureHandle, TextureRecord>,
    buffers: HashMap<BufferHandle, BufferRecord>,
    programs: HashMap<ProgramHandle, ProgramRecord>,
    bind_groups: HashMap<BindGroupHandle, BindGroupRecord>,
    released_textures: Vec<TextureHandle>,
    texture_budget: Option<usize>,
    counts: ResourceCounts,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails texture creation once `budget` textures are live.
    pub fn with_texture_budget(budget: usize) -> Self {
        Self {
            texture_budget: Some(budget),
            ..Self::default()
        }
    }

    pub fn set_texture_budget(&mut self, budget: Option<usize>) {
        self.texture_budget = budget;
    }

    pub fn counts(&self) -> ResourceCounts {
        self.counts
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_bind_groups(&self) -> usize {
        self.bind_groups.len()
    }

    /// True when nothing is allocated.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
            && self.buffers.is_empty()
            && self.programs.is_empty()
            && self.bind_groups.is_empty()
    }

    /// Texture handles in the order they were released.
    pub fn released_textures(&self) -> &[TextureHandle] {
        &self.released_textures
    }

    pub fn is_live_texture(&self, handle: TextureHandle) -> bool {
        self.textures.contains_key(&handle)
    }

    pub fn texture_label(&self, handle: TextureHandle) -> Option<&str> {
        self.textures.get(&handle).map(|t| t.label.as_str())
    }

    pub fn texture_extent(&self, handle: TextureHandle) -> Option<Extent3> {
        self.textures.get(&handle).map(|t| t.extent)
    }

    pub fn texture_format(&self, handle: TextureHandle) -> Option<TexelFormat> {
        self.textures.get(&handle).map(|t| t.format)
    }

    /// How many times data was uploaded into a live texture.
    pub fn texture_uploads(&self, handle: TextureHandle) -> Option<usize> {
        self.textures.get(&handle).map(|t| t.uploads)
    }

    /// Bytes of texel storage held by live textures.
    pub fn texture_bytes(&self) -> usize {
        self.textures.values().map(|t| t.bytes).sum()
    }

    pub fn buffer_contents(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle).map(|b| b.contents.as_slice())
    }

    pub fn buffer_usage(&self, handle: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(&handle).map(|b| b.usage)
    }

    pub fn program_label(&self, handle: ProgramHandle) -> Option<&str> {
        self.programs.get(&handle).map(|p| p.label.as_str())
    }

    /// Entries of a live bind group, as passed at creation.
    pub fn bind_group_entries(&self, handle: BindGroupHandle) -> Option<&[BindingEntry]> {
        self.bind_groups.get(&handle).map(|g| g.entries.as_slice())
    }

    /// The program and group number a live bind group was created for.
    pub fn bind_group_target(&self, handle: BindGroupHandle) -> Option<(ProgramHandle, u32)> {
        self.bind_groups.get(&handle).map(|g| (g.program, g.group))
    }

    fn resource_info(&self, resource: BindingResource) -> Option<ResourceInfo> {
        match resource {
            BindingResource::Buffer(handle) => {
                self.buffers.get(&handle).map(|b| ResourceInfo::Buffer(b.usage))
            }
            BindingResource::Texture(handle) => {
                self.textures.get(&handle).map(|t| ResourceInfo::Texture {
                    dimension: t.dimension,
                    format: t.format,
                })
            }
            BindingResource::Sampler(handle) => {
                self.textures.get(&handle).map(|t| ResourceInfo::Sampler {
                    filter: t.sampling.filter,
                })
            }
        }
    }
}

impl GpuBackend for MemoryBackend {
    fn create_texture(&mut self, image: &TextureImage) -> RenderResult<TextureHandle> {
        if let Some(budget) = self.texture_budget {
            if self.textures.len() >= budget {
                log::debug!("texture budget of {budget} exhausted creating '{}'", image.label);
                return Err(RenderError::OutOfMemory);
            }
        }

        let handle = TextureHandle(self.handles.next());
        self.textures.insert(
            handle,
            TextureRecord {
                label: image.label.clone(),
                dimension: image.dimension,
                extent: image.extent,
                format: image.format,
                sampling: image.sampling,
                bytes: image.expected_len(),
                uploads: 0,
            },
        );
        self.counts.textures_created += 1;
        Ok(handle)
    }

    fn upload_texture(&mut self, handle: TextureHandle, image: &TextureImage) -> RenderResult<()> {
        check_upload_len(image)?;
        let record = self
            .textures
            .get_mut(&handle)
            .ok_or(RenderError::UnknownTexture(handle))?;
        if record.extent != image.extent {
            return Err(RenderError::UploadSizeMismatch {
                label: record.label.clone(),
                expected: record.bytes,
                actual: image.data.as_bytes().len(),
            });
        }
        record.uploads += 1;
        self.counts.texture_uploads += 1;
        Ok(())
    }

    fn release_texture(&mut self, handle: TextureHandle) -> RenderResult<()> {
        self.textures
            .remove(&handle)
            .ok_or(RenderError::UnknownTexture(handle))?;
        self.released_textures.push(handle);
        self.counts.textures_released += 1;
        Ok(())
    }

    fn create_buffer(
        &mut self,
        _label: &str,
        usage: BufferUsage,
        contents: &[u8],
    ) -> RenderResult<BufferHandle> {
        let handle = BufferHandle(self.handles.next());
        self.buffers.insert(
            handle,
            BufferRecord {
                usage,
                contents: contents.to_vec(),
            },
        );
        self.counts.buffers_created += 1;
        Ok(handle)
    }

    fn write_buffer(&mut self, handle: BufferHandle, contents: &[u8]) -> RenderResult<()> {
        let record = self
            .buffers
            .get_mut(&handle)
            .ok_or(RenderError::UnknownBuffer(handle))?;
        record.contents.clear();
        record.contents.extend_from_slice(contents);
        self.counts.buffer_writes += 1;
        Ok(())
    }

    fn release_buffer(&mut self, handle: BufferHandle) -> RenderResult<()> {
        self.buffers
            .remove(&handle)
            .ok_or(RenderError::UnknownBuffer(handle))?;
        self.counts.buffers_released += 1;
        Ok(())
    }

    fn create_program(&mut self, source: &ProgramSource) -> RenderResult<ProgramHandle> {
        let handle = ProgramHandle(self.handles.next());
        self.programs.insert(
            handle,
            ProgramRecord {
                label: source.label.clone(),
                bind_groups: source.bind_groups.clone(),
            },
        );
        self.counts.programs_created += 1;
        Ok(handle)
    }

    fn release_program(&mut self, handle: ProgramHandle) -> RenderResult<()> {
        self.programs
            .remove(&handle)
            .ok_or(RenderError::UnknownProgram(handle))?;
        self.counts.programs_released += 1;
        Ok(())
    }

    fn create_bind_group(
        &mut self,
        label: &str,
        program: ProgramHandle,
        group: u32,
        entries: &[BindingEntry],
    ) -> RenderResult<BindGroupHandle> {
        let record = self
            .programs
            .get(&program)
            .ok_or(RenderError::UnknownProgram(program))?;
        let layout = record.bind_groups.get(group as usize).ok_or_else(|| {
            RenderError::BindGroupCreationFailed(format!(
                "'{}' declares no bind group {group}",
                record.label
            ))
        })?;
        check_bind_group(label, layout, entries, |resource| self.resource_info(resource))?;

        let handle = BindGroupHandle(self.handles.next());
        self.bind_groups.insert(
            handle,
            BindGroupRecord {
                program,
                group,
                entries: entries.to_vec(),
            },
        );
        self.counts.bind_groups_created += 1;
        Ok(handle)
    }

    fn release_bind_group(&mut self, handle: BindGroupHandle) -> RenderResult<()> {
        self.bind_groups
            .remove(&handle)
            .ok_or(RenderError::UnknownBindGroup(handle))?;
        self.counts.bind_groups_released += 1;
        Ok(())
    }
}
