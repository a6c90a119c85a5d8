//! Object lifecycle through the scene, on the accounting backend.
//!
//! Every test ends with the backend empty again, which catches leaked and
//! double-released handles.

use volscope::*;

fn gray() -> ColorMapDescriptor {
    ColorMapDescriptor::from_flat(&[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]).unwrap()
}

fn ramp() -> OpacityFunctionDescriptor {
    OpacityFunctionDescriptor::from_flat(&[0.0, 0.0, 1.0, 1.0]).unwrap()
}

fn floats(shape: [usize; 3], value: f32) -> VolumeDescriptor {
    let len = shape.iter().product();
    VolumeDescriptor::new(ScalarData::Float32(vec![value; len]), shape)
}

fn labels(shape: [usize; 3]) -> VolumeDescriptor {
    let len: usize = shape.iter().product();
    let data = (0..len).map(|i| (i % 3) as u8).collect();
    VolumeDescriptor::new(ScalarData::Uint8(data), shape)
}

fn descriptor(count: usize) -> MultiVolumeDescriptor {
    (0..count).fold(MultiVolumeDescriptor::new(), |d, i| {
        d.with_volume(
            floats([2, 3, 4], i as f32),
            gray(),
            ramp(),
            ColorRange::new(0.0, 1.0),
        )
    })
}

fn memory_scene() -> Scene<MemoryBackend> {
    init_logging();
    Scene::new(MemoryBackend::new(), Options::default())
}

fn multi_volume<'a>(scene: &'a Scene<MemoryBackend>, id: &ObjectId) -> &'a MultiVolumeObject {
    scene.get_as::<MultiVolumeObject>(id).unwrap()
}

#[test]
fn test_every_arity_fills_four_slots() {
    for count in 0..=MAX_VOLUMES {
        let mut scene = memory_scene();
        let id = ObjectId::from("mv");
        scene
            .insert(id.clone(), ObjectKind::MultiVolume, descriptor(count))
            .unwrap();

        let object = multi_volume(&scene, &id);
        assert_eq!(object.volume_count(), count);
        assert_eq!(object.volume_textures().len(), VOLUME_SLOTS);
        assert_eq!(object.transfer_textures().len(), VOLUME_SLOTS);
        for slot in object.slots() {
            assert_eq!(slot.is_active(), slot.index() < count);
        }
        assert_eq!(scene.backend().live_textures(), 2 * VOLUME_SLOTS + 2);
        assert_eq!(scene.backend().live_bind_groups(), 1);

        scene.clear().unwrap();
        assert!(scene.backend().is_empty());
    }
}

#[test]
fn test_first_frame_uploads_every_texture() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(2))
        .unwrap();
    assert_eq!(scene.backend().counts().texture_uploads, 0);

    let stats = scene.prepare_frame().unwrap();
    assert_eq!(stats.uploads, 2 * VOLUME_SLOTS + 2);
    assert!(!multi_volume(&scene, &id).needs_flush());

    let stats = scene.prepare_frame().unwrap();
    assert_eq!(stats, FrameStats::default());
}

#[test]
fn test_empty_change_set_changes_nothing() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(2))
        .unwrap();
    scene.prepare_frame().unwrap();
    let before = scene.backend().counts();

    scene.queue_changes(&id, ChangeSet::new()).unwrap();
    let outcome = scene.apply_changes(&id).unwrap();

    assert!(outcome.resolution.is_fully_resolved());
    assert!(!outcome.recreated);
    assert_eq!(scene.backend().counts(), before);
}

#[test]
fn test_color_range_update_on_first_of_two_volumes() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(2))
        .unwrap();
    scene.prepare_frame().unwrap();
    let textures = multi_volume(&scene, &id).texture_handles();

    let changes =
        ChangeSet::from_json(r#"{"color_range[0]": {"value": [0.25, 0.75]}}"#).unwrap();
    scene.queue_changes(&id, changes).unwrap();
    let stats = scene.prepare_frame().unwrap();

    assert_eq!(stats.applied, 1);
    assert_eq!(stats.recreated, 0);
    assert_eq!(stats.uploads, 1);

    let object = multi_volume(&scene, &id);
    assert_eq!(object.texture_handles(), textures);
    assert_eq!(object.uniforms().color_range(0), (0.25, 0.75));
    assert_eq!(object.uniforms().color_range(1), (0.0, 1.0));
    assert_eq!(object.slot(0).unwrap().color_range(), ColorRange::new(0.25, 0.75));

    let descriptor = scene.descriptor(&id).unwrap();
    assert_eq!(descriptor.color_range_list[0], ColorRange::new(0.25, 0.75));

    let bytes = scene.backend().buffer_contents(object.uniform_buffer()).unwrap();
    assert_eq!(bytes, object.uniforms().as_bytes());
}

#[test]
fn test_volume_of_another_kind_forces_rebuild() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(1))
        .unwrap();
    scene.prepare_frame().unwrap();
    let old_volume = multi_volume(&scene, &id).volume_textures()[0];
    let uploads = scene.backend().counts().texture_uploads;

    let mut changes = ChangeSet::new();
    changes.set_volume(0, labels([2, 3, 4]));
    scene.queue_changes(&id, changes).unwrap();
    let outcome = scene.apply_changes(&id).unwrap();

    assert!(outcome.recreated);
    assert!(outcome.resolution.unresolved.contains(&Field::Volume(0)));
    // The old texture was released without receiving the new data.
    assert!(!scene.backend().is_live_texture(old_volume));
    assert_eq!(scene.backend().counts().texture_uploads, uploads);

    let object = multi_volume(&scene, &id);
    assert_eq!(
        object.slot(0).unwrap().volume_texture().image().data.element_kind(),
        Some(ElementKind::Uint8)
    );
    assert_eq!(
        scene.descriptor(&id).unwrap().volume_list[0].element_kind(),
        ElementKind::Uint8
    );
}

#[test]
fn test_same_shape_volume_is_uploaded_in_place() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(1))
        .unwrap();
    scene.prepare_frame().unwrap();
    let handle = multi_volume(&scene, &id).volume_textures()[0];

    let mut changes = ChangeSet::new();
    changes.set_volume(0, floats([2, 3, 4], 0.5));
    scene.queue_changes(&id, changes).unwrap();
    let stats = scene.prepare_frame().unwrap();

    assert_eq!(stats.recreated, 0);
    assert_eq!(stats.uploads, 1);
    assert_eq!(multi_volume(&scene, &id).volume_textures()[0], handle);
    assert_eq!(scene.backend().texture_uploads(handle), Some(2));
}

#[test]
fn test_masked_object_releases_every_texture_once() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    let masked = descriptor(2).with_mask(labels([2, 3, 4]), vec![1.0, 0.5, 0.0]);
    scene.insert(id.clone(), ObjectKind::MultiVolume, masked).unwrap();

    let object = multi_volume(&scene, &id);
    assert!(object.mask_enabled());
    assert_eq!(object.uniforms().mask_opacity(1), 0.5);
    assert_eq!(object.uniforms().mask_opacity(200), 0.0);

    let mut handles = object.texture_handles();
    assert_eq!(handles.len(), 2 * VOLUME_SLOTS + 2);

    scene.remove(&id).unwrap();

    let mut released = scene.backend().released_textures().to_vec();
    handles.sort();
    released.sort();
    assert_eq!(released, handles);
    assert!(scene.backend().is_empty());
}

#[test]
fn test_failed_insert_leaks_nothing() {
    init_logging();
    for budget in 0..=2 * VOLUME_SLOTS + 1 {
        let mut scene = Scene::new(MemoryBackend::with_texture_budget(budget), Options::default());
        let err = scene
            .insert("mv", ObjectKind::MultiVolume, descriptor(3))
            .unwrap_err();

        assert!(matches!(err, VolscopeError::ResourceExhausted(_)));
        assert!(scene.is_empty());
        assert!(scene.backend().is_empty());
    }
}

#[test]
fn test_invalid_descriptor_is_rejected_before_allocation() {
    let mut scene = memory_scene();
    let mut invalid = descriptor(2);
    invalid.color_range_list.pop();

    let err = scene.insert("mv", ObjectKind::MultiVolume, invalid).unwrap_err();

    assert!(matches!(err, VolscopeError::Validation(_)));
    assert_eq!(scene.backend().counts(), ResourceCounts::default());
}

#[test]
fn test_failed_rebuild_keeps_old_object() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(1))
        .unwrap();
    scene.prepare_frame().unwrap();
    let handles = multi_volume(&scene, &id).texture_handles();
    let live = scene.backend().live_textures();
    scene.backend_mut().set_texture_budget(Some(live));

    let mut changes = ChangeSet::new();
    changes
        .set_color_range(0, ColorRange::new(0.1, 0.9))
        .set(Field::Interpolation, FieldValue::Flag(false));
    scene.queue_changes(&id, changes).unwrap();
    let err = scene.apply_changes(&id).unwrap_err();

    assert!(matches!(err, VolscopeError::ResourceExhausted(_)));
    let object = multi_volume(&scene, &id);
    assert_eq!(object.texture_handles(), handles);
    assert!(object.interpolation());
    // The part that resolved in place is kept.
    assert_eq!(object.uniforms().color_range(0), (0.1, 0.9));
    let descriptor = scene.descriptor(&id).unwrap();
    assert_eq!(descriptor.color_range_list[0], ColorRange::new(0.1, 0.9));
    assert!(descriptor.interpolation);
    assert_eq!(scene.backend().live_textures(), live);

    scene.backend_mut().set_texture_budget(None);
    scene.clear().unwrap();
    assert!(scene.backend().is_empty());
}

#[test]
fn test_rebuild_disposes_old_object_once() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(2))
        .unwrap();
    let old = multi_volume(&scene, &id).texture_handles();

    let mut changes = ChangeSet::new();
    changes.set(Field::Interpolation, FieldValue::Flag(false));
    scene.queue_changes(&id, changes).unwrap();
    let stats = scene.prepare_frame().unwrap();

    assert_eq!(stats.recreated, 1);
    assert!(!multi_volume(&scene, &id).interpolation());
    assert!(!scene.descriptor(&id).unwrap().interpolation);

    let released = scene.backend().released_textures();
    assert_eq!(released.len(), old.len());
    for handle in &old {
        assert_eq!(released.iter().filter(|h| *h == handle).count(), 1);
    }
    assert_eq!(scene.backend().live_textures(), old.len());
}

#[test]
fn test_queued_changes_merge_later_wins() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(1))
        .unwrap();

    let mut first = ChangeSet::new();
    first.set_color_range(0, ColorRange::new(0.1, 0.2)).set_samples(32);
    let mut second = ChangeSet::new();
    second.set_color_range(0, ColorRange::new(0.3, 0.4));
    scene.queue_changes(&id, first).unwrap();
    scene.queue_changes(&id, second).unwrap();
    assert_eq!(scene.pending(&id).unwrap().len(), 2);

    scene.prepare_frame().unwrap();

    let object = multi_volume(&scene, &id);
    assert_eq!(object.uniforms().color_range(0), (0.3, 0.4));
    assert_eq!(object.uniforms().samples, 32);
    assert!(scene.pending(&id).unwrap().is_empty());
}

#[test]
fn test_unknown_and_duplicate_ids() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(1))
        .unwrap();

    let err = scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(1))
        .unwrap_err();
    assert!(matches!(err, VolscopeError::ObjectExists(_)));

    let missing = ObjectId::from("missing");
    assert!(matches!(
        scene.queue_changes(&missing, ChangeSet::new()),
        Err(VolscopeError::ObjectNotFound(_))
    ));
    assert!(matches!(
        scene.remove(&missing),
        Err(VolscopeError::ObjectNotFound(_))
    ));
    assert_eq!(scene.len(), 1);
}

#[test]
fn test_empty_registry_has_no_strategy() {
    init_logging();
    let mut scene = Scene::with_registry(
        MemoryBackend::new(),
        Options::default(),
        StrategyRegistry::new(),
    );
    let err = scene
        .insert("mv", ObjectKind::MultiVolume, descriptor(1))
        .unwrap_err();
    assert!(matches!(err, VolscopeError::NoStrategy(_)));
}

#[test]
fn test_rebuild_counts_even_if_old_object_fails_to_dispose() {
    let mut scene = memory_scene();
    let id = ObjectId::from("mv");
    scene
        .insert(id.clone(), ObjectKind::MultiVolume, descriptor(1))
        .unwrap();
    scene.prepare_frame().unwrap();

    // Releasing one handle behind the object's back makes its dispose fail.
    let jitter = multi_volume(&scene, &id).jitter().handle();
    scene.backend_mut().release_texture(jitter).unwrap();

    let mut changes = ChangeSet::new();
    changes.set(Field::Interpolation, FieldValue::Flag(false));
    scene.queue_changes(&id, changes).unwrap();
    let stats = scene.prepare_frame().unwrap();

    assert_eq!(stats.applied, 1);
    assert_eq!(stats.recreated, 1);
    assert!(!multi_volume(&scene, &id).interpolation());
    assert!(!scene.descriptor(&id).unwrap().interpolation);

    scene.clear().unwrap();
    assert!(scene.backend().is_empty());
}
