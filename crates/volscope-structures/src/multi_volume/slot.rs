//! One of the four fixed volume slots.

use volscope_core::{ColorMapDescriptor, ColorRange, OpacityFunctionDescriptor};
use volscope_render::synthesize;
use volscope_render::transfer_function_image;

use crate::resource::TextureResource;

/// Per-volume state. Inactive slots hold zero-sized placeholder textures so
/// the shader always sees four bindings.
#[derive(Debug)]
pub struct VolumeSlot {
    pub(crate) index: usize,
    pub(crate) active: bool,
    pub(crate) volume: TextureResource,
    pub(crate) transfer: TextureResource,
    pub(crate) color_range: ColorRange,
    pub(crate) color_map: ColorMapDescriptor,
    pub(crate) opacity_function: OpacityFunctionDescriptor,
}

impl VolumeSlot {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn volume_texture(&self) -> &TextureResource {
        &self.volume
    }

    pub fn transfer_texture(&self) -> &TextureResource {
        &self.transfer
    }

    pub fn color_range(&self) -> ColorRange {
        self.color_range
    }

    pub fn color_map(&self) -> &ColorMapDescriptor {
        &self.color_map
    }

    pub fn opacity_function(&self) -> &OpacityFunctionDescriptor {
        &self.opacity_function
    }

    /// Rebuilds the transfer texture from the current color map and opacity
    /// function.
    pub(crate) fn resynthesize(&mut self, width: u32) {
        let image = synthesize(&self.color_map, &self.opacity_function, width);
        self.transfer
            .replace_image(transfer_function_image(self.index, image));
    }
}
