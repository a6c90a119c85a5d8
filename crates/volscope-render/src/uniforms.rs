//! Uniform block shared by all multi-volume objects.
//!
//! The layout has fixed arity: four color range slots regardless of how many
//! volumes are active, and a 256-entry mask opacity table packed as vec4s.

use volscope_core::Decomposed;

/// Number of volume slots in the shader.
pub const VOLUME_SLOTS: usize = 4;

/// Number of mask labels addressable by an 8-bit mask.
pub const MASK_LABELS: usize = 256;

/// Pads a sparse opacity list to exactly [`MASK_LABELS`] entries.
///
/// Values past the first 256 are dropped; missing entries are zero.
pub fn to_fixed_table(values: &[f32]) -> [f32; MASK_LABELS] {
    let mut table = [0.0; MASK_LABELS];
    let n = values.len().min(MASK_LABELS);
    table[..n].copy_from_slice(&values[..n]);
    table
}

/// GPU uniforms for the multi-volume shader.
/// Layout must match WGSL `MultiVolumeUniforms` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MultiVolumeUniforms {
    /// Object translation (xyz, w unused).
    pub translation: [f32; 4],
    /// Object rotation quaternion (xyzw).
    pub rotation: [f32; 4],
    /// Object scale (xyz, w unused).
    pub scale: [f32; 4],
    /// Per-slot `(low, high, 0, 0)` normalization range.
    pub color_ranges: [[f32; 4]; VOLUME_SLOTS],
    /// Number of active slots.
    pub volume_count: u32,
    /// Ray samples across the unit cube.
    pub samples: u32,
    /// Central difference step for gradients.
    pub gradient_step: f32,
    /// Alpha blending: 0 = off, 1 = on.
    pub alpha_blending: u32,
    /// Trilinear volume reads: 0 = nearest texel, 1 = interpolated.
    pub interpolation: u32,
    pub _padding: [u32; 3],
    /// Mask label opacities, four labels per vec4.
    pub mask_opacities: [[f32; 4]; MASK_LABELS / 4],
}

impl Default for MultiVolumeUniforms {
    fn default() -> Self {
        Self {
            translation: [0.0; 4],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 1.0, 0.0],
            color_ranges: [[0.0, 1.0, 0.0, 0.0]; VOLUME_SLOTS],
            volume_count: 0,
            samples: volscope_core::DEFAULT_SAMPLES,
            gradient_step: volscope_core::DEFAULT_GRADIENT_STEP,
            alpha_blending: 0,
            interpolation: 1,
            _padding: [0; 3],
            mask_opacities: [[0.0; 4]; MASK_LABELS / 4],
        }
    }
}

impl MultiVolumeUniforms {
    pub fn set_transform(&mut self, parts: &Decomposed) {
        self.translation = parts.translation.extend(0.0).to_array();
        self.rotation = parts.rotation.to_array();
        self.scale = parts.scale.extend(0.0).to_array();
    }

    pub fn set_color_range(&mut self, slot: usize, low: f32, high: f32) {
        self.color_ranges[slot] = [low, high, 0.0, 0.0];
    }

    /// Returns `(low, high)` for a slot.
    pub fn color_range(&self, slot: usize) -> (f32, f32) {
        let [low, high, ..] = self.color_ranges[slot];
        (low, high)
    }

    pub fn set_mask_opacities(&mut self, table: &[f32; MASK_LABELS]) {
        for (packed, chunk) in self.mask_opacities.iter_mut().zip(table.chunks_exact(4)) {
            packed.copy_from_slice(chunk);
        }
    }

    pub fn mask_opacity(&self, label: u8) -> f32 {
        let label = usize::from(label);
        self.mask_opacities[label / 4][label % 4]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
