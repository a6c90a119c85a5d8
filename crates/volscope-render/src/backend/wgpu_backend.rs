//! wgpu implementation of [`GpuBackend`].

use std::collections::HashMap;

use pollster::FutureExt;

use super::{
    check_upload_len, BindGroupHandle, BufferHandle, BufferUsage, DrawCall, GpuBackend,
    HandleCounter, ProgramHandle, TextureHandle,
};
use crate::binding::{check_bind_group, BindingEntry, BindingResource, BindingSlot, ResourceInfo};
use crate::buffer::{create_buffer, update_buffer};
use crate::error::{RenderError, RenderResult};
use crate::shader::{ProgramSource, OBJECT_GROUP, SCENE_GROUP};
use crate::texture::{Extent3, FilterMode, Sampling, TexelFormat, TextureDimension, TextureImage};

/// A texture, its default view and its sampler.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    /// Extent requested by the caller; zero for placeholders.
    pub extent: Extent3,
    pub dimension: TextureDimension,
    pub format: TexelFormat,
    /// Sampler state actually used, after format restrictions.
    pub sampling: Sampling,
}

/// A buffer and how it is bound.
pub struct GpuBuffer {
    pub buffer: wgpu::Buffer,
    pub usage: BufferUsage,
}

/// A compiled program with its explicit layouts.
pub struct GpuProgram {
    pub module: wgpu::ShaderModule,
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    /// The layouts as declared by the program source.
    pub layout_slots: Vec<Vec<BindingSlot>>,
}

/// A bind group created for one group of a program.
pub struct GpuBindGroup {
    pub group: wgpu::BindGroup,
    pub program: ProgramHandle,
    pub index: u32,
}

/// [`GpuBackend`] backed by a wgpu device and queue.
///
/// Handles index into per-kind resource maps owned by the backend, so a
/// released handle can never reach a destroyed resource. Every device call
/// runs inside error scopes: allocation failures come back as
/// [`RenderError::OutOfMemory`] instead of reaching the uncaptured error
/// handler.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    handles: HandleCounter,
    textures: HashMap<TextureHandle, GpuTexture>,
    buffers: HashMap<BufferHandle, GpuBuffer>,
    programs: HashMap<ProgramHandle, GpuProgram>,
    bind_groups: HashMap<BindGroupHandle, GpuBindGroup>,
}

/// Runs `op` inside out-of-memory and validation error scopes.
///
/// An out-of-memory error wins over a validation error raised by the same
/// call; validation errors are mapped with `on_validation`.
fn scoped<T>(
    device: &wgpu::Device,
    op: impl FnOnce() -> T,
    on_validation: impl FnOnce(String) -> RenderError,
) -> RenderResult<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = op();
    let validation = device.pop_error_scope().block_on();
    let out_of_memory = device.pop_error_scope().block_on();

    if let Some(error) = out_of_memory {
        log::warn!("device out of memory: {error}");
        return Err(RenderError::OutOfMemory);
    }
    match validation {
        Some(error) => Err(on_validation(error.to_string())),
        None => Ok(value),
    }
}

impl WgpuBackend {
    /// Wraps an existing device, rendering into targets of `color_format`.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            color_format,
            handles: HandleCounter::default(),
            textures: HashMap::new(),
            buffers: HashMap::new(),
            programs: HashMap::new(),
            bind_groups: HashMap::new(),
        }
    }

    /// Creates a backend on a new device without a window surface.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("volscope device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        log::info!("headless backend on {}", adapter.get_info().name);
        Ok(Self::new(device, queue, wgpu::TextureFormat::Rgba8Unorm))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Format of the color targets programs render into.
    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(&handle)
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(&handle).map(|b| &b.buffer)
    }

    pub fn program(&self, handle: ProgramHandle) -> Option<&GpuProgram> {
        self.programs.get(&handle)
    }

    pub fn bind_group(&self, handle: BindGroupHandle) -> Option<&GpuBindGroup> {
        self.bind_groups.get(&handle)
    }

    /// Records `call` into `pass`, with `scene` bound as the scene group.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        call: &DrawCall,
        scene: BindGroupHandle,
    ) -> RenderResult<()> {
        let program = self
            .programs
            .get(&call.program)
            .ok_or(RenderError::UnknownProgram(call.program))?;
        let object = self
            .bind_groups
            .get(&call.bind_group)
            .ok_or(RenderError::UnknownBindGroup(call.bind_group))?;
        let scene_group = self
            .bind_groups
            .get(&scene)
            .ok_or(RenderError::UnknownBindGroup(scene))?;
        let vertices = self
            .buffers
            .get(&call.vertex_buffer)
            .ok_or(RenderError::UnknownBuffer(call.vertex_buffer))?;

        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(OBJECT_GROUP, &object.group, &[]);
        pass.set_bind_group(SCENE_GROUP, &scene_group.group, &[]);
        pass.set_vertex_buffer(0, vertices.buffer.slice(..));
        pass.draw(0..call.vertex_count, 0..1);
        Ok(())
    }

    fn create_sampler(&self, label: &str, sampling: Sampling) -> wgpu::Sampler {
        let filter = sampling.filter.to_wgpu();
        let address = sampling.address.to_wgpu();
        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: address,
            address_mode_v: address,
            address_mode_w: address,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        })
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

/// Non-filterable formats cannot be bound to a filtering sampler.
fn effective_sampling(image: &TextureImage) -> Sampling {
    if image.format.is_filterable() {
        image.sampling
    } else {
        Sampling {
            filter: FilterMode::Nearest,
            ..image.sampling
        }
    }
}

/// wgpu rejects zero extents, so placeholders are backed by one texel.
fn allocation_size(extent: Extent3) -> wgpu::Extent3d {
    if extent.is_empty() {
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        }
    } else {
        wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: extent.depth,
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn create_texture(&mut self, image: &TextureImage) -> RenderResult<TextureHandle> {
        let size = allocation_size(image.extent);
        let limits = self.device.limits();
        let max = match image.dimension {
            TextureDimension::D1 => limits.max_texture_dimension_1d,
            TextureDimension::D2 => limits.max_texture_dimension_2d,
            TextureDimension::D3 => limits.max_texture_dimension_3d,
        };
        if size.width > max || size.height > max || size.depth_or_array_layers > max {
            return Err(RenderError::TextureCreationFailed(format!(
                "'{}' exceeds the device limit of {max} texels per axis",
                image.label
            )));
        }

        let texture = scoped(
            &self.device,
            || {
                self.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&image.label),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: image.dimension.to_wgpu(),
                    format: image.format.to_wgpu(),
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                })
            },
            |error| RenderError::TextureCreationFailed(format!("'{}': {error}", image.label)),
        )?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(image.dimension.to_wgpu_view()),
            ..Default::default()
        });
        let sampling = effective_sampling(image);
        let sampler = self.create_sampler(&image.label, sampling);

        let handle = TextureHandle(self.handles.next());
        self.textures.insert(
            handle,
            GpuTexture {
                texture,
                view,
                sampler,
                extent: image.extent,
                dimension: image.dimension,
                format: image.format,
                sampling,
            },
        );
        Ok(handle)
    }

    fn upload_texture(&mut self, handle: TextureHandle, image: &TextureImage) -> RenderResult<()> {
        check_upload_len(image)?;
        let gpu = self
            .textures
            .get(&handle)
            .ok_or(RenderError::UnknownTexture(handle))?;
        if gpu.extent != image.extent || gpu.format != image.format {
            return Err(RenderError::UploadSizeMismatch {
                label: image.label.clone(),
                expected: gpu.extent.texel_count() * gpu.format.bytes_per_texel() as usize,
                actual: image.data.as_bytes().len(),
            });
        }
        if image.is_placeholder() {
            return Ok(());
        }

        scoped(
            &self.device,
            || {
                self.queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &gpu.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    image.data.as_bytes(),
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(image.bytes_per_row()),
                        rows_per_image: Some(image.extent.height),
                    },
                    allocation_size(image.extent),
                );
            },
            |error| RenderError::UploadFailed(format!("'{}': {error}", image.label)),
        )
    }

    fn release_texture(&mut self, handle: TextureHandle) -> RenderResult<()> {
        let gpu = self
            .textures
            .remove(&handle)
            .ok_or(RenderError::UnknownTexture(handle))?;
        gpu.texture.destroy();
        Ok(())
    }

    fn create_buffer(
        &mut self,
        label: &str,
        usage: BufferUsage,
        contents: &[u8],
    ) -> RenderResult<BufferHandle> {
        let buffer = scoped(
            &self.device,
            || create_buffer(&self.device, contents, usage, Some(label)),
            |error| RenderError::BufferOperationFailed(format!("'{label}': {error}")),
        )?;
        let handle = BufferHandle(self.handles.next());
        self.buffers.insert(handle, GpuBuffer { buffer, usage });
        Ok(handle)
    }

    fn write_buffer(&mut self, handle: BufferHandle, contents: &[u8]) -> RenderResult<()> {
        let gpu = self
            .buffers
            .get(&handle)
            .ok_or(RenderError::UnknownBuffer(handle))?;
        scoped(
            &self.device,
            || update_buffer(&self.queue, &gpu.buffer, contents),
            RenderError::BufferOperationFailed,
        )
    }

    fn release_buffer(&mut self, handle: BufferHandle) -> RenderResult<()> {
        let gpu = self
            .buffers
            .remove(&handle)
            .ok_or(RenderError::UnknownBuffer(handle))?;
        gpu.buffer.destroy();
        Ok(())
    }

    fn create_program(&mut self, source: &ProgramSource) -> RenderResult<ProgramHandle> {
        let device = &self.device;
        let color_format = self.color_format;
        let program = scoped(
            device,
            || {
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&source.label),
                    source: wgpu::ShaderSource::Wgsl(source.compose().into()),
                });

                let bind_group_layouts: Vec<wgpu::BindGroupLayout> = source
                    .bind_groups
                    .iter()
                    .enumerate()
                    .map(|(group, slots)| {
                        let entries: Vec<_> = slots.iter().map(|slot| slot.to_wgpu()).collect();
                        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                            label: Some(&format!("{} group {group}", source.label)),
                            entries: &entries,
                        })
                    })
                    .collect();
                let layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some(&source.label),
                        bind_group_layouts: &layout_refs,
                        push_constant_ranges: &[],
                    });

                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(&source.label),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &module,
                        entry_point: Some(&source.vertex_entry),
                        buffers: &[wgpu::VertexBufferLayout {
                            array_stride: 16,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &wgpu::vertex_attr_array![0 => Float32x4],
                        }],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &module,
                        entry_point: Some(&source.fragment_entry),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: color_format,
                            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    // Back faces, so the camera may sit inside the cube.
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        cull_mode: Some(wgpu::Face::Front),
                        ..Default::default()
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });

                GpuProgram {
                    module,
                    pipeline,
                    bind_group_layouts,
                    layout_slots: source.bind_groups.clone(),
                }
            },
            RenderError::ShaderCompilationFailed,
        )?;

        let handle = ProgramHandle(self.handles.next());
        self.programs.insert(handle, program);
        Ok(handle)
    }

    fn release_program(&mut self, handle: ProgramHandle) -> RenderResult<()> {
        self.programs
            .remove(&handle)
            .map(|_| ())
            .ok_or(RenderError::UnknownProgram(handle))
    }

    fn create_bind_group(
        &mut self,
        label: &str,
        program: ProgramHandle,
        group: u32,
        entries: &[BindingEntry],
    ) -> RenderResult<BindGroupHandle> {
        let gpu_program = self
            .programs
            .get(&program)
            .ok_or(RenderError::UnknownProgram(program))?;
        let (Some(slots), Some(layout)) = (
            gpu_program.layout_slots.get(group as usize),
            gpu_program.bind_group_layouts.get(group as usize),
        ) else {
            return Err(RenderError::BindGroupCreationFailed(format!(
                "'{label}': program declares no bind group {group}"
            )));
        };
        check_bind_group(label, slots, entries, |resource| self.resource_info(resource))?;

        // Every resource was found live by the check above.
        let mut wgpu_entries = Vec::with_capacity(entries.len());
        for entry in entries {
            let resource = match entry.resource {
                BindingResource::Buffer(handle) => self
                    .buffers
                    .get(&handle)
                    .ok_or(RenderError::UnknownBuffer(handle))?
                    .buffer
                    .as_entire_binding(),
                BindingResource::Texture(handle) => wgpu::BindingResource::TextureView(
                    &self
                        .textures
                        .get(&handle)
                        .ok_or(RenderError::UnknownTexture(handle))?
                        .view,
                ),
                BindingResource::Sampler(handle) => wgpu::BindingResource::Sampler(
                    &self
                        .textures
                        .get(&handle)
                        .ok_or(RenderError::UnknownTexture(handle))?
                        .sampler,
                ),
            };
            wgpu_entries.push(wgpu::BindGroupEntry {
                binding: entry.binding,
                resource,
            });
        }

        let bind_group = scoped(
            &self.device,
            || {
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(label),
                    layout,
                    entries: &wgpu_entries,
                })
            },
            |error| RenderError::BindGroupCreationFailed(format!("'{label}': {error}")),
        )?;

        let handle = BindGroupHandle(self.handles.next());
        self.bind_groups.insert(
            handle,
            GpuBindGroup {
                group: bind_group,
                program,
                index: group,
            },
        );
        Ok(handle)
    }

    fn release_bind_group(&mut self, handle: BindGroupHandle) -> RenderResult<()> {
        self.bind_groups
            .remove(&handle)
            .map(|_| ())
            .ok_or(RenderError::UnknownBindGroup(handle))
    }
}
