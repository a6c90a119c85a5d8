//! Multi-volume maximum intensity projection object.
//!
//! A [`MultiVolumeObject`] owns every GPU resource needed to draw up to four
//! co-registered volumes as one composited cube: a volume texture and a
//! transfer function texture per slot, a jitter texture, a label mask, the
//! proxy cube, the shader program, the uniform buffer and the bind group
//! that ties them together. Objects without a mask bind a zero-sized mask
//! texture so the bind group always matches the program layout.

mod slot;
mod update;

pub use slot::VolumeSlot;

use glam::Mat4;
use rand::RngCore;
use volscope_core::{MultiVolumeDescriptor, Options, Result};
use volscope_render::{
    bindings, jitter_image, mask_image, multi_volume_program, placeholder_mask_image,
    placeholder_transfer_function_image, placeholder_volume_image, synthesize, to_fixed_table,
    transfer_function_image, volume_image, BindGroupHandle, BindingEntry, BufferHandle,
    BufferUsage, DrawCall, GpuBackend, MultiVolumeUniforms, ProgramHandle, RenderError,
    RenderResult, TextureHandle, UnitCube, MASK_LABELS, OBJECT_GROUP, VOLUME_SLOTS,
};

use crate::resource::{Allocations, TextureResource};

/// The label mask and its per-label opacity table.
#[derive(Debug)]
pub struct MaskState {
    pub(crate) texture: TextureResource,
    pub(crate) opacities: [f32; MASK_LABELS],
}

impl MaskState {
    pub fn texture(&self) -> &TextureResource {
        &self.texture
    }

    pub fn opacities(&self) -> &[f32; MASK_LABELS] {
        &self.opacities
    }
}

/// What the object binds at the mask slot.
#[derive(Debug)]
pub(crate) enum MaskBinding {
    /// Masking is off; a zero-sized texture fills the slot.
    Off(TextureResource),
    On(MaskState),
}

impl MaskBinding {
    fn texture(&self) -> &TextureResource {
        match self {
            Self::Off(texture) => texture,
            Self::On(mask) => &mask.texture,
        }
    }

    fn texture_mut(&mut self) -> &mut TextureResource {
        match self {
            Self::Off(texture) => texture,
            Self::On(mask) => &mut mask.texture,
        }
    }
}

/// GPU state of a multi-volume object.
#[derive(Debug)]
pub struct MultiVolumeObject {
    slots: [VolumeSlot; VOLUME_SLOTS],
    volume_count: usize,
    jitter: TextureResource,
    pub(crate) mask: MaskBinding,
    geometry: UnitCube,
    geometry_buffer: BufferHandle,
    uniform_buffer: BufferHandle,
    program: ProgramHandle,
    bind_group: BindGroupHandle,
    uniforms: MultiVolumeUniforms,
    uniforms_dirty: bool,
    world_transform: Mat4,
    interpolation: bool,
    transfer_function_width: u32,
}

impl MultiVolumeObject {
    /// Validates `descriptor` and allocates every resource the object needs.
    ///
    /// Textures are allocated here but their data is only sent on the next
    /// [`flush`](Self::flush). If any allocation fails, the handles already
    /// allocated by this call are released before the error is returned.
    pub fn create(
        descriptor: &MultiVolumeDescriptor,
        options: &Options,
        rng: &mut dyn RngCore,
        backend: &mut dyn GpuBackend,
    ) -> Result<Self> {
        options.validate()?;
        descriptor.validate()?;

        let mut allocations = Allocations::new();
        match Self::build(descriptor, options, rng, backend, &mut allocations) {
            Ok(object) => {
                log::info!(
                    "created multi-volume object with {} volume(s), mask {}",
                    object.volume_count,
                    if object.mask_enabled() { "on" } else { "off" }
                );
                Ok(object)
            }
            Err(e) => {
                log::warn!("multi-volume creation failed: {e}");
                allocations.rollback(backend);
                Err(e.into())
            }
        }
    }

    fn build(
        descriptor: &MultiVolumeDescriptor,
        options: &Options,
        rng: &mut dyn RngCore,
        backend: &mut dyn GpuBackend,
        allocations: &mut Allocations,
    ) -> RenderResult<Self> {
        let volume_count = descriptor.volume_count();
        let width = options.transfer_function_width;

        let mut slots = Vec::with_capacity(VOLUME_SLOTS);
        for index in 0..VOLUME_SLOTS {
            let slot = if let Some(volume) = descriptor.volume_list.get(index) {
                let color_map = descriptor.color_map_list[index].clone();
                let opacity_function = descriptor.opacity_function_list[index].clone();
                let gradient = synthesize(&color_map, &opacity_function, width);
                VolumeSlot {
                    index,
                    active: true,
                    volume: allocations.texture(
                        backend,
                        volume_image(
                            format!("volume texture {index}"),
                            volume,
                            descriptor.interpolation,
                        ),
                    )?,
                    transfer: allocations
                        .texture(backend, transfer_function_image(index, gradient))?,
                    color_range: descriptor.color_range_list[index],
                    color_map,
                    opacity_function,
                }
            } else {
                VolumeSlot {
                    index,
                    active: false,
                    volume: allocations.texture(backend, placeholder_volume_image(index))?,
                    transfer: allocations
                        .texture(backend, placeholder_transfer_function_image(index))?,
                    color_range: Default::default(),
                    color_map: Default::default(),
                    opacity_function: Default::default(),
                }
            };
            slots.push(slot);
        }
        let slots: [VolumeSlot; VOLUME_SLOTS] = slots
            .try_into()
            .map_err(|_| RenderError::TextureCreationFailed("volume slot arity".into()))?;

        let jitter = allocations.texture(
            backend,
            jitter_image(rng, options.jitter_size, options.jitter_multiplier),
        )?;

        let mask = match descriptor.mask.as_ref() {
            Some(mask) if descriptor.mask_enabled() => MaskBinding::On(MaskState {
                texture: allocations.texture(backend, mask_image(mask))?,
                opacities: to_fixed_table(&descriptor.mask_opacities),
            }),
            _ => MaskBinding::Off(allocations.texture(backend, placeholder_mask_image())?),
        };

        let mut uniforms = MultiVolumeUniforms::default();
        uniforms.set_transform(&descriptor.model_matrix.decompose());
        for slot in slots.iter().filter(|s| s.active) {
            uniforms.set_color_range(slot.index, slot.color_range.low, slot.color_range.high);
        }
        uniforms.volume_count = u32::try_from(volume_count).unwrap_or(u32::MAX);
        uniforms.samples = descriptor.samples;
        uniforms.gradient_step = descriptor.gradient_step;
        uniforms.alpha_blending = u32::from(descriptor.alpha_blending);
        uniforms.interpolation = u32::from(descriptor.interpolation);
        if let MaskBinding::On(mask) = &mask {
            uniforms.set_mask_opacities(&mask.opacities);
        }

        let geometry = UnitCube::new();
        let geometry_buffer = allocations.buffer(
            backend,
            "multi volume cube",
            BufferUsage::Vertex,
            geometry.as_bytes(),
        )?;
        let uniform_buffer = allocations.buffer(
            backend,
            "multi volume uniforms",
            BufferUsage::Uniform,
            uniforms.as_bytes(),
        )?;
        let program = allocations.program(
            backend,
            &multi_volume_program(options.specular, matches!(mask, MaskBinding::On(_)))?,
        )?;

        let mut entries = vec![BindingEntry::buffer(bindings::UNIFORMS, uniform_buffer)];
        for (offset, slot) in (0u32..).zip(&slots) {
            entries.push(BindingEntry::texture(
                bindings::FIRST_VOLUME + offset,
                slot.volume.handle(),
            ));
            entries.push(BindingEntry::texture(
                bindings::FIRST_TRANSFER + offset,
                slot.transfer.handle(),
            ));
        }
        entries.push(BindingEntry::texture(bindings::JITTER_TEXTURE, jitter.handle()));
        entries.push(BindingEntry::sampler(bindings::JITTER_SAMPLER, jitter.handle()));
        entries.push(BindingEntry::texture(bindings::MASK_TEXTURE, mask.texture().handle()));
        let bind_group = allocations.bind_group(
            backend,
            "multi volume bind group",
            program,
            OBJECT_GROUP,
            &entries,
        )?;

        Ok(Self {
            slots,
            volume_count,
            jitter,
            mask,
            geometry,
            geometry_buffer,
            uniform_buffer,
            program,
            bind_group,
            uniforms,
            uniforms_dirty: false,
            world_transform: descriptor.model_matrix.to_mat4(),
            interpolation: descriptor.interpolation,
            transfer_function_width: width,
        })
    }

    /// Sends pending texture data and uniforms to the backend.
    ///
    /// Returns the number of textures and buffers written.
    pub fn flush(&mut self, backend: &mut dyn GpuBackend) -> RenderResult<usize> {
        let mut written = 0;
        for slot in &mut self.slots {
            written += usize::from(slot.volume.flush(backend)?);
            written += usize::from(slot.transfer.flush(backend)?);
        }
        written += usize::from(self.jitter.flush(backend)?);
        written += usize::from(self.mask.texture_mut().flush(backend)?);
        if self.uniforms_dirty {
            backend.write_buffer(self.uniform_buffer, self.uniforms.as_bytes())?;
            self.uniforms_dirty = false;
            written += 1;
        }
        Ok(written)
    }

    /// Releases every GPU resource held by the object.
    ///
    /// Consumes the object, so each handle is released exactly once. A failed
    /// release does not stop the remaining ones; the first error is returned.
    pub fn dispose(self, backend: &mut dyn GpuBackend) -> RenderResult<()> {
        let mut first_error = None;
        let mut note = |result: RenderResult<()>| {
            if let Err(e) = result {
                log::warn!("failed to release multi-volume resource: {e}");
                first_error.get_or_insert(e);
            }
        };

        note(backend.release_bind_group(self.bind_group));
        for slot in &self.slots {
            note(backend.release_texture(slot.volume.handle()));
        }
        for slot in &self.slots {
            note(backend.release_texture(slot.transfer.handle()));
        }
        note(backend.release_texture(self.jitter.handle()));
        note(backend.release_texture(self.mask.texture().handle()));
        note(backend.release_buffer(self.geometry_buffer));
        note(backend.release_buffer(self.uniform_buffer));
        note(backend.release_program(self.program));

        log::debug!("disposed multi-volume object ({} volume(s))", self.volume_count);
        first_error.map_or(Ok(()), Err)
    }

    /// Number of active slots. Fixed for the lifetime of the object.
    pub fn volume_count(&self) -> usize {
        self.volume_count
    }

    pub fn slots(&self) -> &[VolumeSlot; VOLUME_SLOTS] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&VolumeSlot> {
        self.slots.get(index)
    }

    /// The four volume texture bindings, active slots first.
    pub fn volume_textures(&self) -> [TextureHandle; VOLUME_SLOTS] {
        std::array::from_fn(|i| self.slots[i].volume.handle())
    }

    /// The four transfer function texture bindings.
    pub fn transfer_textures(&self) -> [TextureHandle; VOLUME_SLOTS] {
        std::array::from_fn(|i| self.slots[i].transfer.handle())
    }

    pub fn jitter(&self) -> &TextureResource {
        &self.jitter
    }

    pub fn mask(&self) -> Option<&MaskState> {
        match &self.mask {
            MaskBinding::On(mask) => Some(mask),
            MaskBinding::Off(_) => None,
        }
    }

    pub fn mask_enabled(&self) -> bool {
        matches!(self.mask, MaskBinding::On(_))
    }

    /// The texture bound at the mask slot, a placeholder while masking is off.
    pub fn mask_texture(&self) -> &TextureResource {
        self.mask.texture()
    }

    /// Every texture handle the object owns.
    pub fn texture_handles(&self) -> Vec<TextureHandle> {
        let mut handles: Vec<_> = self.volume_textures().into();
        handles.extend(self.transfer_textures());
        handles.push(self.jitter.handle());
        handles.push(self.mask.texture().handle());
        handles
    }

    pub fn geometry(&self) -> &UnitCube {
        &self.geometry
    }

    pub fn geometry_buffer(&self) -> BufferHandle {
        self.geometry_buffer
    }

    pub fn uniform_buffer(&self) -> BufferHandle {
        self.uniform_buffer
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn bind_group(&self) -> BindGroupHandle {
        self.bind_group
    }

    /// The draw call for this object; the caller binds the scene group.
    pub fn draw_call(&self) -> DrawCall {
        DrawCall {
            program: self.program,
            bind_group: self.bind_group,
            vertex_buffer: self.geometry_buffer,
            vertex_count: self.geometry.vertex_count(),
        }
    }

    pub fn uniforms(&self) -> &MultiVolumeUniforms {
        &self.uniforms
    }

    pub fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    pub fn interpolation(&self) -> bool {
        self.interpolation
    }

    /// True if a flush would write anything.
    pub fn needs_flush(&self) -> bool {
        self.uniforms_dirty
            || self.jitter.needs_upload()
            || self.mask.texture().needs_upload()
            || self
                .slots
                .iter()
                .any(|s| s.volume.needs_upload() || s.transfer.needs_upload())
    }
}
