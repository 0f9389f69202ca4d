use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::f32::consts::{PI, TAU};

pub(super) const SPHERE_LAT_STEPS: u32 = 12;
pub(super) const SPHERE_LON_STEPS: u32 = 18;

/// Vertex of the shared sphere mesh every body renders with. The sphere has
/// unit diameter, so an instance scale equals the body's world diameter.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(super) struct PlanetVertex {
    pub(super) position: [f32; 3],
    pub(super) normal: [f32; 3],
    pub(super) uv: [f32; 2],
}

/// Per-body instance data. The model matrix carries spin, placement, and
/// diameter; `texture_slot` picks the array layer; `emissive` lifts the
/// fragment toward the raw tint (1.0 renders the sun self-lit).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(super) struct PlanetInstance {
    pub(super) model: [[f32; 4]; 4],
    pub(super) tint: [f32; 4],
    pub(super) texture_slot: u32,
    pub(super) emissive: f32,
}

/// Camera constants shared by the scene-pass pipelines.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(super) struct SceneUniforms {
    pub(super) view_projection: [[f32; 4]; 4],
}

pub(super) fn scene_uniforms(matrix: Mat4) -> SceneUniforms {
    SceneUniforms {
        view_projection: matrix.to_cols_array_2d(),
    }
}

/// Vertex for the star points and shooting-star line segments.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(super) struct StarVertex {
    pub(super) position: [f32; 3],
    pub(super) intensity: f32,
}

pub(super) struct PlanetMesh {
    pub(super) vertices: Vec<PlanetVertex>,
    pub(super) indices: Vec<u16>,
}

/// Latitude/longitude sphere wound counter-clockwise from outside, for
/// back-face culling. The seam column is duplicated so texture u stays
/// continuous across the wrap.
pub(super) fn build_planet_sphere(lat_divisions: u32, lon_divisions: u32) -> PlanetMesh {
    let lat_steps = lat_divisions.max(3);
    let lon_steps = lon_divisions.max(6);
    let ring = (lon_steps + 1) as usize;

    let mut vertices = Vec::with_capacity((lat_steps as usize + 1) * ring);
    for lat in 0..=lat_steps {
        let v = lat as f32 / lat_steps as f32;
        let theta = v * PI;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for lon in 0..=lon_steps {
            let u = lon as f32 / lon_steps as f32;
            let phi = u * TAU;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let normal = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            vertices.push(PlanetVertex {
                position: [normal[0] * 0.5, normal[1] * 0.5, normal[2] * 0.5],
                normal,
                uv: [u, v],
            });
        }
    }

    let mut indices = Vec::with_capacity((lat_steps * lon_steps * 6) as usize);
    for lat in 0..lat_steps as usize {
        for lon in 0..lon_steps as usize {
            let current = lat * ring + lon;
            let next = current + ring;

            indices.push(current as u16);
            indices.push((current + 1) as u16);
            indices.push(next as u16);

            indices.push(next as u16);
            indices.push((current + 1) as u16);
            indices.push((next + 1) as u16);
        }
    }

    PlanetMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn sphere_has_expected_counts() {
        let mesh = build_planet_sphere(12, 18);
        assert_eq!(mesh.vertices.len(), 13 * 19);
        assert_eq!(mesh.indices.len(), 12 * 18 * 6);
    }

    #[test]
    fn degenerate_divisions_are_clamped() {
        let mesh = build_planet_sphere(0, 0);
        assert_eq!(mesh.vertices.len(), 4 * 7);
        assert_eq!(mesh.indices.len(), 3 * 6 * 6);
    }

    #[test]
    fn sphere_has_unit_diameter_and_unit_normals() {
        let mesh = build_planet_sphere(8, 12);
        for vertex in &mesh.vertices {
            let radius = Vec3::from_array(vertex.position).length();
            assert!((radius - 0.5).abs() < 1e-5, "radius {radius}");
            let normal_len = Vec3::from_array(vertex.normal).length();
            assert!((normal_len - 1.0).abs() < 1e-5, "normal {normal_len}");
        }
    }

    #[test]
    fn uvs_cover_the_unit_square() {
        let mesh = build_planet_sphere(8, 12);
        for vertex in &mesh.vertices {
            assert!((0.0..=1.0).contains(&vertex.uv[0]));
            assert!((0.0..=1.0).contains(&vertex.uv[1]));
        }
        assert_eq!(mesh.vertices.first().map(|v| v.uv[1]), Some(0.0));
        assert_eq!(mesh.vertices.last().map(|v| v.uv[1]), Some(1.0));
    }

    #[test]
    fn indices_stay_in_bounds() {
        let mesh = build_planet_sphere(12, 18);
        let count = mesh.vertices.len() as u16;
        assert!(mesh.indices.iter().all(|index| *index < count));
    }

    #[test]
    fn equator_quads_wind_outward() {
        let mesh = build_planet_sphere(12, 18);
        for triangle in mesh.indices.chunks_exact(3) {
            let a = Vec3::from_array(mesh.vertices[triangle[0] as usize].position);
            let b = Vec3::from_array(mesh.vertices[triangle[1] as usize].position);
            let c = Vec3::from_array(mesh.vertices[triangle[2] as usize].position);
            let face_normal = (b - a).cross(c - a);
            if face_normal.length() < 1e-8 {
                continue; // pole caps collapse one edge
            }
            let centroid = (a + b + c) / 3.0;
            assert!(
                face_normal.dot(centroid) > 0.0,
                "inward-facing triangle {triangle:?}"
            );
        }
    }
}
