//! In-place change resolution.

use volscope_core::{Change, ChangeSet, Field, FieldValue, Resolution};
use volscope_render::{is_mask_kind, is_storage_compatible, mask_image, to_fixed_table, volume_image};

use super::{MaskBinding, MultiVolumeObject};

impl MultiVolumeObject {
    /// Applies every change that the existing resources can absorb.
    ///
    /// Each field of `changes` ends up either resolved (applied, uploads
    /// deferred to the next flush) or unresolved (the object must be rebuilt
    /// from the merged descriptor). Time-series driven changes are always
    /// left unresolved. Resolved changes stay applied even when other fields
    /// force a rebuild.
    pub fn update(&mut self, changes: &ChangeSet) -> Resolution {
        let mut resolution = Resolution::pending(changes);
        let mut transfer_dirty = [false; volscope_render::VOLUME_SLOTS];

        for (field, change) in changes.iter() {
            if change.time_series {
                log::debug!("{field} is time-series driven, leaving it to the interpolator");
                continue;
            }
            if self.apply_change(field, change, &mut transfer_dirty) {
                log::debug!("{field} resolved in place");
                resolution.resolve(field);
            } else {
                log::debug!("{field} needs the object to be rebuilt");
            }
        }

        for (slot, dirty) in self.slots.iter_mut().zip(transfer_dirty) {
            if dirty {
                slot.resynthesize(self.transfer_function_width);
            }
        }

        resolution
    }

    fn is_active(&self, slot: usize) -> bool {
        slot < self.volume_count
    }

    fn apply_change(&mut self, field: &Field, change: &Change, transfer_dirty: &mut [bool]) -> bool {
        match (field, &change.value) {
            (Field::ColorRange(i), FieldValue::ColorRange(range)) if self.is_active(*i) => {
                self.slots[*i].color_range = *range;
                self.uniforms.set_color_range(*i, range.low, range.high);
                self.uniforms_dirty = true;
                true
            }
            (Field::Volume(i), FieldValue::Volume(volume)) if self.is_active(*i) => {
                let slot = &mut self.slots[*i];
                let compatible = volume.validate("volume").is_ok()
                    && is_storage_compatible(slot.volume.image(), volume);
                if compatible {
                    let label = slot.volume.image().label.clone();
                    slot.volume
                        .replace_image(volume_image(label, volume, self.interpolation));
                }
                compatible
            }
            (Field::ColorMap(i), FieldValue::ColorMap(map)) if self.is_active(*i) => {
                if map.validate("color map").is_err() {
                    return false;
                }
                self.slots[*i].color_map = map.clone();
                transfer_dirty[*i] = true;
                true
            }
            (Field::OpacityFunction(i), FieldValue::OpacityFunction(function))
                if self.is_active(*i) =>
            {
                if function.validate("opacity function").is_err() {
                    return false;
                }
                self.slots[*i].opacity_function = function.clone();
                transfer_dirty[*i] = true;
                true
            }
            (Field::Mask, FieldValue::Mask(Some(new_mask))) => {
                let MaskBinding::On(mask) = &mut self.mask else {
                    return false;
                };
                let compatible = is_mask_kind(new_mask)
                    && new_mask.validate("mask").is_ok()
                    && is_storage_compatible(mask.texture.image(), new_mask);
                if compatible {
                    mask.texture.replace_image(mask_image(new_mask));
                }
                compatible
            }
            // An empty list would switch masking off.
            (Field::MaskOpacities, FieldValue::MaskOpacities(values)) if !values.is_empty() => {
                let MaskBinding::On(mask) = &mut self.mask else {
                    return false;
                };
                mask.opacities = to_fixed_table(values);
                self.uniforms.set_mask_opacities(&mask.opacities);
                self.uniforms_dirty = true;
                true
            }
            (Field::Samples, FieldValue::Samples(samples)) if *samples > 0 => {
                self.uniforms.samples = *samples;
                self.uniforms_dirty = true;
                true
            }
            (Field::GradientStep, FieldValue::GradientStep(step))
                if step.is_finite() && *step > 0.0 =>
            {
                self.uniforms.gradient_step = *step;
                self.uniforms_dirty = true;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use volscope_core::{
        ColorMapDescriptor, ColorRange, MultiVolumeDescriptor, OpacityFunctionDescriptor, Options,
        ScalarData, VolumeDescriptor,
    };
    use volscope_render::{MemoryBackend, TextureImage};

    use super::*;

    fn gray() -> ColorMapDescriptor {
        ColorMapDescriptor::from_flat(&[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]).unwrap()
    }

    fn ramp() -> OpacityFunctionDescriptor {
        OpacityFunctionDescriptor::from_flat(&[0.0, 0.0, 1.0, 1.0]).unwrap()
    }

    fn floats(value: f32) -> VolumeDescriptor {
        VolumeDescriptor::new(ScalarData::Float32(vec![value; 8]), [2, 2, 2])
    }

    fn object(backend: &mut MemoryBackend, masked: bool) -> MultiVolumeObject {
        let mut d = MultiVolumeDescriptor::new()
            .with_volume(floats(0.0), gray(), ramp(), ColorRange::new(0.0, 1.0))
            .with_volume(floats(1.0), gray(), ramp(), ColorRange::new(0.0, 1.0));
        if masked {
            let mask = VolumeDescriptor::new(ScalarData::Uint8(vec![1; 8]), [2, 2, 2]);
            d = d.with_mask(mask, vec![0.0, 1.0]);
        }
        let mut rng = StdRng::seed_from_u64(3);
        let mut object =
            MultiVolumeObject::create(&d, &Options::default(), &mut rng, backend).unwrap();
        object.flush(backend).unwrap();
        object
    }

    fn images(object: &MultiVolumeObject) -> Vec<TextureImage> {
        object
            .slots()
            .iter()
            .flat_map(|s| [s.volume_texture().image().clone(), s.transfer_texture().image().clone()])
            .collect()
    }

    #[test]
    fn test_empty_change_set_is_a_no_op() {
        let mut backend = MemoryBackend::new();
        let mut object = object(&mut backend, true);
        let before = (images(&object), *object.uniforms());

        let resolution = object.update(&ChangeSet::new());
        assert!(resolution.is_fully_resolved());
        assert!(resolution.resolved.is_empty());
        assert!(!object.needs_flush());
        assert_eq!(before, (images(&object), *object.uniforms()));
    }

    #[test]
    fn test_color_range_resolves_for_active_slots_only() {
        let mut backend = MemoryBackend::new();
        let mut object = object(&mut backend, false);

        let mut changes = ChangeSet::new();
        changes
            .set_color_range(0, ColorRange::new(0.2, 0.8))
            .set_color_range(3, ColorRange::new(0.0, 5.0));
        let resolution = object.update(&changes);

        assert!(resolution.is_resolved(&Field::ColorRange(0)));
        assert!(resolution.unresolved.contains(&Field::ColorRange(3)));
        assert_eq!(object.uniforms().color_range(0), (0.2, 0.8));
        assert_eq!(object.uniforms().color_range(3), (0.0, 1.0));

        assert_eq!(object.flush(&mut backend).unwrap(), 1);
        assert_eq!(
            backend.buffer_contents(object.uniform_buffer()),
            Some(object.uniforms().as_bytes())
        );
    }

    #[test]
    fn test_volume_requires_same_kind_and_shape() {
        let mut backend = MemoryBackend::new();
        let mut object = object(&mut backend, false);
        let original = object.slots()[0].volume_texture().image().clone();

        let mut changes = ChangeSet::new();
        changes.set_volume(0, VolumeDescriptor::new(ScalarData::Int16(vec![0; 8]), [2, 2, 2]));
        changes.set_volume(
            1,
            VolumeDescriptor::new(ScalarData::Float32(vec![0.0; 27]), [3, 3, 3]),
        );
        let resolution = object.update(&changes);
        assert_eq!(resolution.unresolved.len(), 2);
        assert_eq!(object.slots()[0].volume_texture().image(), &original);
        assert!(!object.needs_flush());

        let mut changes = ChangeSet::new();
        changes.set_volume(0, floats(0.5));
        assert!(object.update(&changes).is_fully_resolved());
        assert!(object.slots()[0].volume_texture().needs_upload());
        assert_eq!(object.flush(&mut backend).unwrap(), 1);
    }

    #[test]
    fn test_transfer_function_resynthesized_once_per_slot() {
        let mut backend = MemoryBackend::new();
        let mut object = object(&mut backend, false);

        let red = ColorMapDescriptor::from_flat(&[0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]).unwrap();
        let flat = OpacityFunctionDescriptor::from_flat(&[0.0, 0.5]).unwrap();
        let mut changes = ChangeSet::new();
        changes.set_color_map(1, red.clone()).set_opacity_function(1, flat.clone());
        assert!(object.update(&changes).is_fully_resolved());

        let expected = volscope_render::synthesize(&red, &flat, 1024);
        let slot = &object.slots()[1];
        assert_eq!(slot.color_map(), &red);
        assert_eq!(slot.transfer_texture().image().data.as_bytes(), expected.as_bytes());
        assert_eq!(object.flush(&mut backend).unwrap(), 1);
    }

    #[test]
    fn test_opacity_only_keeps_current_color_map() {
        let mut backend = MemoryBackend::new();
        let mut object = object(&mut backend, false);
        let flat = OpacityFunctionDescriptor::from_flat(&[0.0, 0.25]).unwrap();

        let mut changes = ChangeSet::new();
        changes.set_opacity_function(0, flat.clone());
        assert!(object.update(&changes).is_fully_resolved());

        let expected = volscope_render::synthesize(&gray(), &flat, 1024);
        assert_eq!(
            object.slots()[0].transfer_texture().image().data.as_bytes(),
            expected.as_bytes()
        );
    }

    #[test]
    fn test_non_monotonic_color_map_is_unresolved() {
        let mut backend = MemoryBackend::new();
        let mut object = object(&mut backend, false);
        let backwards =
            ColorMapDescriptor::from_flat(&[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();

        let mut changes = ChangeSet::new();
        changes.set_color_map(0, backwards);
        assert!(!object.update(&changes).is_fully_resolved());
        assert!(!object.needs_flush());
    }

    #[test]
    fn test_mask_changes() {
        let mut backend = MemoryBackend::new();
        let mut masked = object(&mut backend, true);

        let mut changes = ChangeSet::new();
        changes
            .set_mask(Some(VolumeDescriptor::new(ScalarData::Uint8(vec![2; 8]), [2, 2, 2])))
            .set_mask_opacities(vec![0.0, 0.0, 0.75]);
        assert!(masked.update(&changes).is_fully_resolved());
        assert_eq!(masked.uniforms().mask_opacity(2), 0.75);
        assert_eq!(masked.mask().unwrap().opacities()[2], 0.75);

        let mut changes = ChangeSet::new();
        changes.set_mask(Some(VolumeDescriptor::new(ScalarData::Uint8(vec![0; 27]), [3, 3, 3])));
        assert!(!masked.update(&changes).is_fully_resolved());

        let mut changes = ChangeSet::new();
        changes.set_mask(None).set_mask_opacities(vec![]);
        assert_eq!(masked.update(&changes).unresolved.len(), 2);

        let mut plain = object(&mut backend, false);
        let mut changes = ChangeSet::new();
        changes.set_mask_opacities(vec![1.0]);
        assert!(!plain.update(&changes).is_fully_resolved());
    }

    #[test]
    fn test_render_params_and_unsupported_fields() {
        let mut backend = MemoryBackend::new();
        let mut object = object(&mut backend, false);

        let mut changes = ChangeSet::new();
        changes
            .set_samples(64)
            .set_gradient_step(0.01)
            .set(Field::Interpolation, FieldValue::Flag(false))
            .set(Field::AlphaBlending, FieldValue::Flag(true))
            .set(Field::Other("opacity".into()), FieldValue::Json(serde_json::json!(0.5)));
        let resolution = object.update(&changes);

        assert!(resolution.is_resolved(&Field::Samples));
        assert!(resolution.is_resolved(&Field::GradientStep));
        assert_eq!(resolution.unresolved.len(), 3);
        assert_eq!(object.uniforms().samples, 64);
        assert_eq!(object.uniforms().gradient_step, 0.01);
    }

    #[test]
    fn test_time_series_changes_are_left_alone() {
        let mut backend = MemoryBackend::new();
        let mut object = object(&mut backend, false);

        let mut changes = ChangeSet::new();
        changes.insert(
            Field::ColorRange(0),
            Change::time_series(FieldValue::ColorRange(ColorRange::new(0.0, 9.0))),
        );
        let resolution = object.update(&changes);
        assert!(resolution.unresolved.contains(&Field::ColorRange(0)));
        assert_eq!(object.uniforms().color_range(0), (0.0, 1.0));
    }
}
