//! Proxy geometry for ray marching.

use glam::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

/// Bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// The unit cube `[-0.5, 0.5]^3` that the volume shader marches through.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCube {
    /// 36 non-indexed triangle vertices (vec4, w = 1).
    pub positions: Vec<[f32; 4]>,
    pub bounding_box: BoundingBox,
    pub bounding_sphere: BoundingSphere,
}

impl UnitCube {
    pub fn new() -> Self {
        let positions = generate_unit_cube();
        let bounding_box = compute_bounding_box(&positions);
        let center = (bounding_box.min + bounding_box.max) * 0.5;
        let radius = positions
            .iter()
            .map(|p| Vec3::new(p[0], p[1], p[2]).distance(center))
            .fold(0.0, f32::max);
        Self {
            positions,
            bounding_box,
            bounding_sphere: BoundingSphere { center, radius },
        }
    }

    pub fn vertex_count(&self) -> u32 {
        // Always 36.
        u32::try_from(self.positions.len()).unwrap_or(u32::MAX)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }
}

impl Default for UnitCube {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_bounding_box(positions: &[[f32; 4]]) -> BoundingBox {
    let (min, max) = positions.iter().fold(
        (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
        |(min, max), p| {
            let p = Vec3::new(p[0], p[1], p[2]);
            (min.min(p), max.max(p))
        },
    );
    BoundingBox { min, max }
}

/// Generates the 36 vertices of a unit cube, two triangles per face,
/// wound counter-clockwise seen from outside.
fn generate_unit_cube() -> Vec<[f32; 4]> {
    // Face order: +X, -X, +Y, -Y, +Z, -Z
    let faces: [[[f32; 3]; 4]; 6] = [
        [[0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5], [0.5, -0.5, 0.5]],
        [[-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5], [-0.5, -0.5, -0.5]],
        [[-0.5, 0.5, -0.5], [-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5]],
        [[-0.5, -0.5, 0.5], [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5]],
        [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]],
        [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]],
    ];

    let mut positions = Vec::with_capacity(36);
    for verts in &faces {
        for &vi in &[0, 1, 2, 0, 2, 3] {
            let v = verts[vi];
            positions.push([v[0], v[1], v[2], 1.0]);
        }
    }
    positions
}
