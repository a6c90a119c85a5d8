//! Maps scalar volumes and label masks onto 3D texture images.
//!
//! Volumes are stored as single-channel floats picked per element kind and
//! read with `textureLoad`, so every kind binds to the same shader slot.
//! Masks keep their `u8` labels and are read as unsigned integers.

use half::f16;
use volscope_core::{ElementKind, ScalarData, VolumeDescriptor};

use crate::texture::{Extent3, Sampling, TexelData, TexelFormat, TextureDimension, TextureImage};

/// Texture extent of a `(depth, height, width)` volume.
pub fn volume_extent(volume: &VolumeDescriptor) -> Extent3 {
    let axis = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
    Extent3::new(
        axis(volume.width()),
        axis(volume.height()),
        axis(volume.depth()),
    )
}

/// Filter recorded for a volume texture.
///
/// The shader reads volumes texel by texel and interpolates itself when the
/// object's `interpolation` uniform is set; this keeps the image in sync.
pub fn volume_sampling(interpolation: bool) -> Sampling {
    if interpolation {
        Sampling::LINEAR_CLAMP
    } else {
        Sampling::NEAREST_CLAMP
    }
}

fn converted<T: bytemuck::Pod>(from: ElementKind, values: impl Iterator<Item = T>) -> TexelData {
    let values: Vec<T> = values.collect();
    TexelData::Converted {
        from,
        bytes: bytemuck::cast_slice(&values).to_vec(),
    }
}

/// Texels of `data` in the format [`TexelFormat::for_volume`] picks.
#[allow(clippy::cast_precision_loss)]
pub fn volume_texels(data: &ScalarData) -> TexelData {
    let kind = data.kind();
    match data {
        ScalarData::Float16(_) | ScalarData::Float32(_) => TexelData::Scalars(data.clone()),
        ScalarData::Uint8(v) => converted(kind, v.iter().map(|&x| f16::from(x))),
        ScalarData::Int8(v) => converted(kind, v.iter().map(|&x| f16::from(x))),
        ScalarData::Uint16(v) => converted(kind, v.iter().map(|&x| f32::from(x))),
        ScalarData::Int16(v) => converted(kind, v.iter().map(|&x| f32::from(x))),
        ScalarData::Uint32(v) => converted(kind, v.iter().map(|&x| x as f32)),
        ScalarData::Int32(v) => converted(kind, v.iter().map(|&x| x as f32)),
    }
}

/// Builds the single-channel 3D texture image for a volume.
pub fn volume_image(
    label: impl Into<String>,
    volume: &VolumeDescriptor,
    interpolation: bool,
) -> TextureImage {
    TextureImage {
        label: label.into(),
        dimension: TextureDimension::D3,
        extent: volume_extent(volume),
        format: TexelFormat::for_volume(volume.element_kind()),
        sampling: volume_sampling(interpolation),
        data: volume_texels(&volume.data),
    }
}

/// Zero-sized stand-in for an unused volume slot.
pub fn placeholder_volume_image(slot: usize) -> TextureImage {
    TextureImage::placeholder(
        format!("volume texture {slot} (unused)"),
        TextureDimension::D3,
        TexelFormat::R32Float,
        Sampling::NEAREST_CLAMP,
    )
}

/// Builds the 8-bit label texture for a mask. Labels are never interpolated.
pub fn mask_image(mask: &VolumeDescriptor) -> TextureImage {
    TextureImage {
        label: "mask texture".to_string(),
        dimension: TextureDimension::D3,
        extent: volume_extent(mask),
        format: TexelFormat::R8Uint,
        sampling: Sampling::NEAREST_CLAMP,
        data: TexelData::Scalars(mask.data.clone()),
    }
}

/// Zero-sized mask bound while masking is off.
pub fn placeholder_mask_image() -> TextureImage {
    TextureImage::placeholder(
        "mask texture (unused)",
        TextureDimension::D3,
        TexelFormat::R8Uint,
        Sampling::NEAREST_CLAMP,
    )
}

/// True if `volume` can replace the data of `image` without reallocation:
/// same element kind and same extent.
pub fn is_storage_compatible(image: &TextureImage, volume: &VolumeDescriptor) -> bool {
    image.data.element_kind() == Some(volume.element_kind())
        && image.extent == volume_extent(volume)
}

/// Masks store `u8` labels only.
pub fn is_mask_kind(volume: &VolumeDescriptor) -> bool {
    volume.element_kind() == ElementKind::Uint8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SampleKind;

    #[test]
    fn test_volume_image_layout() {
        let volume = VolumeDescriptor::new(ScalarData::Uint8(vec![7; 24]), [2, 3, 4]);
        let image = volume_image("volume texture 0", &volume, true);

        assert_eq!(image.extent, Extent3::new(4, 3, 2));
        assert_eq!(image.format, TexelFormat::R16Float);
        assert_eq!(image.sampling, Sampling::LINEAR_CLAMP);
        assert_eq!(image.data.as_bytes().len(), image.expected_len());
        assert_eq!(image.data.element_kind(), Some(ElementKind::Uint8));
    }

    #[test]
    fn test_integer_values_survive_conversion() {
        let bytes = volume_texels(&ScalarData::Uint8(vec![0, 1, 200, 255]));
        let halves: &[f16] = bytemuck::cast_slice(bytes.as_bytes());
        assert_eq!(
            halves.iter().map(|h| h.to_f32()).collect::<Vec<_>>(),
            vec![0.0, 1.0, 200.0, 255.0]
        );

        let bytes = volume_texels(&ScalarData::Int16(vec![-32768, -1, 32767]));
        let floats: &[f32] = bytemuck::cast_slice(bytes.as_bytes());
        assert_eq!(floats, &[-32768.0, -1.0, 32767.0]);

        let floats = ScalarData::Float32(vec![0.25; 2]);
        assert_eq!(volume_texels(&floats), TexelData::Scalars(floats));
    }

    #[test]
    fn test_every_kind_reads_as_float() {
        let values: Vec<f64> = (0..8).map(f64::from).collect();
        for kind in [
            ElementKind::Uint8,
            ElementKind::Int8,
            ElementKind::Uint16,
            ElementKind::Int16,
            ElementKind::Uint32,
            ElementKind::Int32,
            ElementKind::Float16,
            ElementKind::Float32,
        ] {
            let volume = VolumeDescriptor::new(ScalarData::from_f64(kind, &values), [2, 2, 2]);
            let image = volume_image("v", &volume, false);
            assert!(matches!(image.format.sample_kind(), SampleKind::Float { .. }));
            assert_eq!(image.data.as_bytes().len(), image.expected_len(), "{kind}");
        }
    }

    #[test]
    fn test_interpolation_flag_selects_filter() {
        let volume = VolumeDescriptor::new(ScalarData::Int8(vec![0; 8]), [2, 2, 2]);
        assert_eq!(
            volume_image("v", &volume, false).sampling,
            Sampling::NEAREST_CLAMP
        );
        assert_eq!(volume_image("v", &volume, true).sampling, Sampling::LINEAR_CLAMP);
    }

    #[test]
    fn test_storage_compatibility() {
        let volume = VolumeDescriptor::new(ScalarData::Float32(vec![0.0; 64]), [4, 4, 4]);
        let image = volume_image("v", &volume, true);

        let same = VolumeDescriptor::new(ScalarData::Float32(vec![1.0; 64]), [4, 4, 4]);
        assert!(is_storage_compatible(&image, &same));

        // Same texel format, different source kind.
        let other_kind = VolumeDescriptor::new(ScalarData::Uint16(vec![1; 64]), [4, 4, 4]);
        assert_eq!(volume_image("v", &other_kind, true).format, image.format);
        assert!(!is_storage_compatible(&image, &other_kind));

        let other_shape = VolumeDescriptor::new(ScalarData::Float32(vec![1.0; 32]), [2, 4, 4]);
        assert!(!is_storage_compatible(&image, &other_shape));

        assert!(!is_storage_compatible(&placeholder_volume_image(0), &same));
    }

    #[test]
    fn test_mask_image_holds_raw_labels() {
        let mask = VolumeDescriptor::new(ScalarData::Uint8(vec![1; 8]), [2, 2, 2]);
        let image = mask_image(&mask);
        assert_eq!(image.sampling, Sampling::NEAREST_CLAMP);
        assert_eq!(image.format, TexelFormat::R8Uint);
        assert_eq!(image.data.as_bytes(), &[1; 8]);
        assert!(is_mask_kind(&mask));

        let placeholder = placeholder_mask_image();
        assert!(placeholder.is_placeholder());
        assert_eq!(placeholder.format, image.format);
    }
}
