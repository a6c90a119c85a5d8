//! Ray start jitter noise.
//!
//! The volume shader offsets each pixel's first ray sample by a value read
//! from this texture, which breaks up the slicing pattern a fixed step size
//! would otherwise produce.

use rand::Rng;

use crate::texture::{Extent3, Sampling, TexelData, TexelFormat, TextureDimension, TextureImage};

/// Default side length of the jitter texture.
pub const JITTER_SIZE: u32 = 64;

/// Default scale of the uniform noise.
pub const JITTER_MULTIPLIER: f32 = 255.0;

/// Fills a `size x size` single-channel texture with uniform noise in
/// `[0, multiplier)`, saturated to `u8`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn jitter_image<R: Rng + ?Sized>(rng: &mut R, size: u32, multiplier: f32) -> TextureImage {
    let texels = size as usize * size as usize;
    let data: Vec<u8> = (0..texels)
        .map(|_| (rng.gen::<f32>() * multiplier) as u8)
        .collect();

    TextureImage {
        label: "jitter texture".to_string(),
        dimension: TextureDimension::D2,
        extent: Extent3::new(size, size, 1),
        format: TexelFormat::R8Unorm,
        sampling: Sampling::LINEAR_MIRROR,
        data: TexelData::Bytes(data),
    }
}
