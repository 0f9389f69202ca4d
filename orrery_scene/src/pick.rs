use glam::{Mat4, Vec2, Vec3};

use crate::flight::FocusTarget;
use crate::registry::PlanetRegistry;

/// Radius of the central sun sphere at the world origin.
pub const SUN_RADIUS: f32 = 5.0;

/// World-space ray under the cursor.
#[derive(Debug, Clone, Copy)]
pub struct PickRay {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Unprojects a cursor position in normalized device coordinates through
/// the inverse view-projection matrix. Depth 0 is the near plane and 1 the
/// far plane. Returns `None` when the matrix degenerates at that point.
pub fn ray_from_ndc(ndc: Vec2, inv_view_proj: Mat4) -> Option<PickRay> {
    let near = inv_view_proj.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
    let far = inv_view_proj.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
    if !near.is_finite() || !far.is_finite() {
        return None;
    }
    let direction = (far - near).try_normalize()?;
    Some(PickRay {
        origin: near,
        direction,
    })
}

/// Resolves the nearest body the ray passes through: the sun, or a planet
/// keyed by wallet. Entities behind the ray origin never match.
pub fn pick_target(ray: &PickRay, registry: &PlanetRegistry) -> Option<FocusTarget> {
    let mut best = ray_sphere(ray, Vec3::ZERO, SUN_RADIUS).map(|t| (t, FocusTarget::Sun));
    for entity in registry.iter() {
        let Some(t) = ray_sphere(ray, entity.position, entity.size) else {
            continue;
        };
        if best.as_ref().map_or(true, |(best_t, _)| t < *best_t) {
            best = Some((t, FocusTarget::Planet(entity.wallet_address.clone())));
        }
    }
    best.map(|(_, target)| target)
}

/// Nearest non-negative ray parameter where the ray meets the sphere. A
/// ray starting inside the sphere hits its back face.
fn ray_sphere(ray: &PickRay, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let a = ray.direction.length_squared();
    let half_b = oc.dot(ray.direction);
    let c = oc.length_squared() - radius * radius;
    let discriminant = half_b * half_b - a * c;
    if discriminant < 0.0 || a <= f32::EPSILON {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let t_near = (-half_b - sqrt_d) / a;
    if t_near >= 0.0 {
        return Some(t_near);
    }
    let t_far = (-half_b + sqrt_d) / a;
    (t_far >= 0.0).then_some(t_far)
}
