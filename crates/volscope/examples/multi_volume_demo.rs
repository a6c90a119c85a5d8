//! Demo showing a two-volume object kept in sync with JSON change sets.
//!
//! Runs on a headless GPU when one is available and falls back to the
//! accounting backend otherwise. Run with `RUST_LOG=debug` to see every
//! resolved field and upload.

use volscope::*;

/// A sphere-like density field of `size`³ voxels.
fn density(size: usize) -> VolumeDescriptor {
    let center = (size as f32 - 1.0) / 2.0;
    let mut data = Vec::with_capacity(size * size * size);
    for z in 0..size {
        for y in 0..size {
            for x in 0..size {
                let p = Vec3::new(x as f32, y as f32, z as f32) - Vec3::splat(center);
                data.push((1.0 - p.length() / center).max(0.0));
            }
        }
    }
    VolumeDescriptor::new(ScalarData::Float32(data), [size, size, size])
}

/// Labels the lower and upper halves of the volume 1 and 2.
fn halves(size: usize) -> VolumeDescriptor {
    let slab = size * size;
    let data = (0..size * slab)
        .map(|i| if i / slab < size / 2 { 1 } else { 2 })
        .collect();
    VolumeDescriptor::new(ScalarData::Uint8(data), [size, size, size])
}

fn describe(changes: &ChangeSet, outcome: &ApplyOutcome) {
    for field in changes.fields() {
        let how = if outcome.resolution.is_resolved(field) {
            "in place"
        } else {
            "rebuild"
        };
        println!("  {field:<20} {how}");
    }
}

fn run<B: GpuBackend>(mut scene: Scene<B>) -> Result<()> {
    let size = 32;
    let descriptor = MultiVolumeDescriptor::new()
        .with_volume(
            density(size),
            ColorMapDescriptor::from_flat(&[0.0, 0.0, 0.0, 0.3, 1.0, 1.0, 0.9, 0.2])?,
            OpacityFunctionDescriptor::from_flat(&[0.0, 0.0, 0.2, 0.0, 1.0, 0.6])?,
            ColorRange::new(0.0, 1.0),
        )
        .with_volume(
            density(size),
            ColorMapDescriptor::from_flat(&[0.0, 0.1, 0.2, 0.8, 1.0, 0.9, 0.1, 0.1])?,
            OpacityFunctionDescriptor::from_flat(&[0.0, 0.0, 1.0, 0.3])?,
            ColorRange::new(0.2, 0.8),
        )
        .with_mask(halves(size), vec![0.0, 1.0, 0.4]);

    let id = ObjectId::from("demo");
    scene.insert(id.clone(), ObjectKind::MultiVolume, descriptor)?;
    let stats = scene.prepare_frame()?;
    println!("Created object with {} upload(s)", stats.uploads);

    let updates = [
        r#"{ "color_range[1]": { "value": [0.4, 0.9] }, "samples": { "value": 256 } }"#,
        r#"{ "opacity_function[0]": { "value": [0.0, 0.0, 0.5, 0.8, 1.0, 1.0] } }"#,
        r#"{ "mask_opacities": { "value": [0.0, 0.2, 1.0] } }"#,
        r#"{ "interpolation": { "value": false } }"#,
        r#"{ "mask": { "value": null } }"#,
    ];

    for json in updates {
        let changes = ChangeSet::from_json(json)?;
        scene.queue_changes(&id, changes.clone())?;
        let outcome = scene.apply_changes(&id)?;
        let stats = scene.prepare_frame()?;
        println!(
            "Applied {} change(s), {} upload(s){}",
            changes.len(),
            stats.uploads,
            if outcome.recreated { ", object rebuilt" } else { "" }
        );
        describe(&changes, &outcome);
    }

    scene.remove(&id)?;
    println!("Removed object");
    Ok(())
}

fn main() -> Result<()> {
    init_logging_with_default("info");

    match headless_scene(Options::default()) {
        Ok(scene) => {
            println!("Using headless GPU backend");
            run(scene)
        }
        Err(e) => {
            println!("No GPU adapter ({e}), using the accounting backend");
            run(Scene::new(MemoryBackend::new(), Options::default()))
        }
    }
}
