//! Transfer function synthesis.
//!
//! A transfer function texture is a 1D RGBA gradient: color comes from a
//! piecewise-linear color map, alpha from an independent piecewise-linear
//! opacity function, both sampled on the same evenly spaced axis over `[0, 1]`.

use glam::Vec3;
use volscope_core::{ColorMapDescriptor, OpacityFunctionDescriptor};

use crate::texture::{Extent3, Sampling, TexelData, TexelFormat, TextureDimension, TextureImage};

/// Default horizontal resolution of transfer function textures.
pub const TRANSFER_FUNCTION_WIDTH: u32 = 1024;

/// A 1D RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub pixels: Vec<[u8; 4]>,
}

impl RgbaImage {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

/// Piecewise-linear interpolation over sorted `(position, value)` points,
/// clamped to the end values outside the covered range.
fn interpolate<T: Copy>(
    points: &[(f32, T)],
    p: f32,
    lerp: impl Fn(T, T, f32) -> T,
) -> Option<T> {
    let (first, last) = (points.first()?, points.last()?);
    if p <= first.0 {
        return Some(first.1);
    }
    if p >= last.0 {
        return Some(last.1);
    }

    // First point strictly to the right of p; both neighbours exist here.
    let hi = points.partition_point(|(position, _)| *position <= p);
    let (p0, v0) = points[hi - 1];
    let (p1, v1) = points[hi];
    let span = p1 - p0;
    if span <= 0.0 {
        return Some(v1);
    }
    Some(lerp(v0, v1, (p - p0) / span))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Samples the color map and opacity function at `width` evenly spaced
/// positions and packs them into RGBA texels.
///
/// An empty color map yields black and an empty opacity function yields full
/// opacity. Out of range values are clamped. The result depends only on the
/// inputs.
#[allow(clippy::cast_precision_loss)]
pub fn synthesize(
    color_map: &ColorMapDescriptor,
    opacity_function: &OpacityFunctionDescriptor,
    width: u32,
) -> RgbaImage {
    let colors: Vec<(f32, Vec3)> = color_map
        .points
        .iter()
        .map(|p| (p.position, p.color))
        .collect();
    let opacities: Vec<(f32, f32)> = opacity_function
        .points
        .iter()
        .map(|p| (p.position, p.opacity))
        .collect();

    let denominator = width.saturating_sub(1).max(1) as f32;
    let pixels = (0..width)
        .map(|i| {
            let p = i as f32 / denominator;
            let color = interpolate(&colors, p, Vec3::lerp).unwrap_or(Vec3::ZERO);
            let alpha = interpolate(&opacities, p, |a, b, t| a + (b - a) * t).unwrap_or(1.0);
            [
                quantize(color.x),
                quantize(color.y),
                quantize(color.z),
                quantize(alpha),
            ]
        })
        .collect();

    RgbaImage { width, pixels }
}

/// Wraps a synthesized gradient as a nearest-sampled 1D texture image.
pub fn transfer_function_image(slot: usize, image: RgbaImage) -> TextureImage {
    let extent = Extent3::new(image.width, 1, 1);
    let bytes = bytemuck::cast_slice(&image.pixels).to_vec();
    TextureImage {
        label: format!("transfer function {slot}"),
        dimension: TextureDimension::D1,
        extent,
        format: TexelFormat::Rgba8Unorm,
        sampling: Sampling::NEAREST_CLAMP,
        data: TexelData::Bytes(bytes),
    }
}

/// Zero-sized stand-in for an unused transfer function slot.
pub fn placeholder_transfer_function_image(slot: usize) -> TextureImage {
    TextureImage::placeholder(
        format!("transfer function {slot} (unused)"),
        TextureDimension::D1,
        TexelFormat::Rgba8Unorm,
        Sampling::NEAREST_CLAMP,
    )
}
