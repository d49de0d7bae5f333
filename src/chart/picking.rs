//! Ray picking against slice meshes.

use glam::{Mat4, Vec3};

use super::camera::Ray;
use super::geometry::DiscSegment;

/// Möller–Trumbore ray/triangle test, double sided. Returns the ray
/// parameter of the hit.
pub fn intersect_triangle(origin: Vec3, dir: Vec3, [a, b, c]: [Vec3; 3]) -> Option<f32> {
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-9 {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t > 1e-6).then_some(t)
}

fn intersect_sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> bool {
    let oc = origin - center;
    let a = dir.length_squared();
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    b * b - a * c >= 0.0
}

/// Nearest ray parameter at which `ray` hits `mesh` placed by `world`.
///
/// The ray is moved into mesh-local space instead of transforming every
/// vertex. The direction is left unnormalized there so `t` stays comparable
/// across meshes with different transforms.
pub fn intersect_mesh(ray: &Ray, mesh: &DiscSegment, world: &Mat4) -> Option<f32> {
    let inv = world.inverse();
    let origin = inv.transform_point3(ray.origin);
    let dir = inv.transform_vector3(ray.dir);
    if !intersect_sphere(origin, dir, mesh.bounds_center, mesh.bounds_radius) {
        return None;
    }
    mesh.faces
        .iter()
        .filter_map(|face| intersect_triangle(origin, dir, mesh.triangle(face)))
        .min_by(f32::total_cmp)
}

/// Index of the nearest mesh hit by `ray`, if any.
pub fn pick<'a, I>(ray: &Ray, targets: I) -> Option<usize>
where
    I: IntoIterator<Item = (usize, &'a DiscSegment, Mat4)>,
{
    targets
        .into_iter()
        .filter_map(|(index, mesh, world)| intersect_mesh(ray, mesh, &world).map(|t| (index, t)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}
