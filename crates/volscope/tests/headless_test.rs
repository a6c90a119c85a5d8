//! Multi-volume objects on a real wgpu device.
//!
//! These tests need a GPU adapter (real or software fallback). Without one
//! they print a note and return early; they can also be skipped with
//! `cargo test -- --skip headless`.

use volscope::*;

fn scene_or_skip() -> Option<Scene<WgpuBackend>> {
    init_logging();
    match headless_scene(Options::default()) {
        Ok(scene) => Some(scene),
        Err(e) => {
            eprintln!("Skipping headless test (no GPU adapter): {e}");
            None
        }
    }
}

fn descriptor(kind: ElementKind) -> MultiVolumeDescriptor {
    let data = ScalarData::from_f64(kind, &(0..24).map(f64::from).collect::<Vec<_>>());
    let labels = VolumeDescriptor::new(
        ScalarData::Uint8((0..24).map(|i| i % 4).collect()),
        [2, 3, 4],
    );
    MultiVolumeDescriptor::single(
        VolumeDescriptor::new(data, [2, 3, 4]),
        ColorMapDescriptor::from_flat(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0]).unwrap(),
        OpacityFunctionDescriptor::from_flat(&[0.0, 0.0, 1.0, 0.8]).unwrap(),
        ColorRange::new(0.0, 23.0),
    )
    .with_mask(labels, vec![0.0, 1.0, 0.5, 0.25])
}

#[test]
fn headless_lifecycle() {
    let Some(mut scene) = scene_or_skip() else {
        return;
    };

    for kind in [ElementKind::Float32, ElementKind::Uint8, ElementKind::Int16] {
        let id = ObjectId::new(format!("mv-{kind:?}"));
        scene
            .insert(id.clone(), ObjectKind::MultiVolume, descriptor(kind))
            .unwrap();
    }
    let stats = scene.prepare_frame().unwrap();
    assert_eq!(stats.uploads, 3 * (2 * VOLUME_SLOTS + 2));

    let id = ObjectId::new("mv-Float32");
    let mut changes = ChangeSet::new();
    changes
        .set_color_range(0, ColorRange::new(2.0, 10.0))
        .set_mask_opacities(vec![1.0; 4])
        .set_volume(
            0,
            VolumeDescriptor::new(ScalarData::Float32(vec![1.0; 24]), [2, 3, 4]),
        );
    scene.queue_changes(&id, changes).unwrap();
    let stats = scene.prepare_frame().unwrap();
    assert_eq!(stats.recreated, 0);
    assert_eq!(stats.uploads, 2);

    let mut changes = ChangeSet::new();
    changes.set_mask(None);
    scene.queue_changes(&id, changes).unwrap();
    let outcome = scene.apply_changes(&id).unwrap();
    assert!(outcome.recreated);
    assert!(!scene.get_as::<MultiVolumeObject>(&id).unwrap().mask_enabled());

    scene.clear().unwrap();
    assert!(scene.is_empty());
}

#[test]
fn headless_empty_object() {
    let Some(mut scene) = scene_or_skip() else {
        return;
    };

    scene
        .insert("empty", ObjectKind::MultiVolume, MultiVolumeDescriptor::new())
        .unwrap();
    let stats = scene.prepare_frame().unwrap();
    assert_eq!(stats.uploads, 2 * VOLUME_SLOTS + 2);

    let textures = scene.get_as::<MultiVolumeObject>(&"empty".into()).unwrap().texture_handles();
    for handle in textures {
        assert!(scene.backend().texture(handle).is_some());
    }
}

#[test]
fn headless_bind_groups_for_every_layout() {
    let Some(mut scene) = scene_or_skip() else {
        return;
    };

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
        for count in 0..=MAX_VOLUMES {
            for masked in [false, true] {
                let single = descriptor(kind);
                let mut d = (0..count).fold(MultiVolumeDescriptor::new(), |d, _| {
                    d.with_volume(
                        single.volume_list[0].clone(),
                        single.color_map_list[0].clone(),
                        single.opacity_function_list[0].clone(),
                        single.color_range_list[0],
                    )
                });
                if masked {
                    d = d.with_mask(
                        single.mask.clone().unwrap(),
                        single.mask_opacities.clone(),
                    );
                }

                let id = ObjectId::new(format!("{kind}-{count}-{masked}"));
                scene.insert(id.clone(), ObjectKind::MultiVolume, d).unwrap();
                let object = scene.get_as::<MultiVolumeObject>(&id).unwrap();
                assert_eq!(object.mask_enabled(), masked);
                assert!(
                    scene.backend().bind_group(object.bind_group()).is_some(),
                    "{kind} with {count} volume(s), mask {masked}"
                );
                scene.remove(&id).unwrap();
            }
        }
    }
    assert!(scene.is_empty());
}

#[test]
fn headless_draw_is_valid() {
    let Some(mut scene) = scene_or_skip() else {
        return;
    };

    scene
        .insert("mv", ObjectKind::MultiVolume, descriptor(ElementKind::Int16))
        .unwrap();
    scene
        .insert("empty", ObjectKind::MultiVolume, MultiVolumeDescriptor::new())
        .unwrap();
    scene.prepare_frame().unwrap();

    let calls: Vec<DrawCall> = ["mv", "empty"]
        .into_iter()
        .map(|id| scene.get_as::<MultiVolumeObject>(&id.into()).unwrap().draw_call())
        .collect();
    let backend = scene.backend_mut();
    let scene_uniforms = backend
        .create_buffer("scene uniforms", BufferUsage::Uniform, &[0; SCENE_UNIFORMS_SIZE])
        .unwrap();
    let scene_groups: Vec<BindGroupHandle> = calls
        .iter()
        .map(|call| {
            backend
                .create_bind_group(
                    "scene bind group",
                    call.program,
                    SCENE_GROUP,
                    &[BindingEntry::buffer(0, scene_uniforms)],
                )
                .unwrap()
        })
        .collect();

    let device = backend.device();
    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("render target"),
        size: wgpu::Extent3d {
            width: 16,
            height: 16,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: backend.color_format(),
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("draw encoder"),
    });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("draw pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        for (call, &scene_group) in calls.iter().zip(&scene_groups) {
            backend.draw(&mut pass, call, scene_group).unwrap();
        }
    }
    backend.queue().submit(std::iter::once(encoder.finish()));
    device.poll(wgpu::PollType::wait_indefinitely()).unwrap();
    let error = pollster::block_on(device.pop_error_scope());
    assert!(error.is_none(), "{error:?}");

    for scene_group in scene_groups {
        backend.release_bind_group(scene_group).unwrap();
    }
    backend.release_buffer(scene_uniforms).unwrap();
    scene.clear().unwrap();
}

#[test]
fn headless_invalid_texture_is_an_error() {
    let Some(mut scene) = scene_or_skip() else {
        return;
    };

    // 1D textures must be one texel high.
    let image = TextureImage {
        label: "too tall".to_string(),
        dimension: TextureDimension::D1,
        extent: Extent3::new(4, 2, 1),
        format: TexelFormat::Rgba8Unorm,
        sampling: Sampling::NEAREST_CLAMP,
        data: TexelData::Bytes(vec![0; 32]),
    };
    let err = scene.backend_mut().create_texture(&image).unwrap_err();
    assert!(matches!(err, RenderError::TextureCreationFailed(_)), "{err}");

    let err = scene
        .backend_mut()
        .write_buffer(BufferHandle(u64::MAX), &[0; 4])
        .unwrap_err();
    assert!(matches!(err, RenderError::UnknownBuffer(_)));
}
