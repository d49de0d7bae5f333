//! Perspective camera and surface-space projection.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Fallback surface used when the host reports a zero-sized area.
pub const FALLBACK_WIDTH: f64 = 400.0;
pub const FALLBACK_HEIGHT: f64 = 300.0;

/// Pixel dimensions of the area a chart renders into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    /// Zero, negative, or non-finite dimensions fall back to 400x300.
    pub fn new(width: f64, height: f64) -> Self {
        let sane = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
        Self {
            width: sane(width, FALLBACK_WIDTH),
            height: sane(height, FALLBACK_HEIGHT),
        }
    }

    pub fn aspect(&self) -> f32 {
        (self.width / self.height) as f32
    }

    /// Map a surface-relative pixel position to normalized device coordinates.
    pub fn to_ndc(&self, pos: Vec2) -> Vec2 {
        Vec2::new(
            (pos.x as f64 / self.width * 2.0 - 1.0) as f32,
            (-(pos.y as f64 / self.height) * 2.0 + 1.0) as f32,
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

/// Camera on the +z axis looking at the origin, GL clip conventions
/// (`z` in `[-1, 1]` after the perspective divide).
#[derive(Debug, Clone)]
pub struct Camera {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub eye: Vec3,
}

impl Camera {
    pub fn new(fov_deg: f32, distance: f32, surface: SurfaceSize) -> Self {
        Self {
            fov_y: fov_deg.to_radians(),
            aspect: surface.aspect(),
            near: 0.1,
            far: 1000.0,
            eye: Vec3::new(0.0, 0.0, distance),
        }
    }

    pub fn set_surface(&mut self, surface: SurfaceSize) {
        self.aspect = surface.aspect();
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, Vec3::ZERO, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// World-space ray from the eye through an NDC point.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inv_vp = self.view_projection().inverse();
        let near = inv_vp * Vec4::new(ndc.x, ndc.y, -1.0, 1.0);
        let far = inv_vp * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let origin = near.truncate() / near.w;
        let target = far.truncate() / far.w;
        Ray {
            origin,
            dir: (target - origin).normalize(),
        }
    }
}

/// A world point after projection onto a chart surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// Pixels from the surface's left edge.
    pub x: f64,
    /// Pixels from the surface's top edge.
    pub y: f64,
    /// NDC depth after the perspective divide.
    pub ndc_z: f32,
    pub visible: bool,
}

/// Project a slice-local point through `world` and the camera onto the surface.
///
/// Points outside the near/far range (`|ndc_z| >= 1`) or behind the eye are
/// flagged invisible.
pub fn project_to_surface(
    local: Vec3,
    world: &Mat4,
    camera: &Camera,
    surface: SurfaceSize,
) -> SurfacePoint {
    project_world(world.transform_point3(local), &camera.view_projection(), surface)
}

/// Project an already world-space point with a precomputed view-projection.
pub fn project_world(point: Vec3, view_projection: &Mat4, surface: SurfaceSize) -> SurfacePoint {
    let clip = *view_projection * point.extend(1.0);
    if clip.w <= f32::EPSILON {
        return SurfacePoint {
            x: 0.0,
            y: 0.0,
            ndc_z: 1.0,
            visible: false,
        };
    }
    let ndc = clip.truncate() / clip.w;
    SurfacePoint {
        x: (ndc.x as f64 * 0.5 + 0.5) * surface.width,
        y: (-ndc.y as f64 * 0.5 + 0.5) * surface.height,
        ndc_z: ndc.z,
        visible: ndc.z.abs() < 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(surface: SurfaceSize) -> Camera {
        Camera::new(45.0, 5.0, surface)
    }

    #[test]
    fn zero_surface_falls_back() {
        let s = SurfaceSize::new(0.0, 0.0);
        assert_eq!(s, SurfaceSize::new(FALLBACK_WIDTH, FALLBACK_HEIGHT));
        let s = SurfaceSize::new(320.0, f64::NAN);
        assert!((s.width - 320.0).abs() < f64::EPSILON);
        assert!((s.height - FALLBACK_HEIGHT).abs() < f64::EPSILON);
        assert!(camera(s).aspect.is_finite());
    }

    #[test]
    fn origin_projects_to_surface_centre() {
        let surface = SurfaceSize::new(320.0, 320.0);
        let p = project_to_surface(Vec3::ZERO, &Mat4::IDENTITY, &camera(surface), surface);
        assert!(p.visible);
        assert!((p.x - 160.0).abs() < 1e-3);
        assert!((p.y - 160.0).abs() < 1e-3);
    }

    #[test]
    fn screen_axes_follow_world_axes() {
        let surface = SurfaceSize::new(200.0, 200.0);
        let cam = camera(surface);
        let right = project_to_surface(Vec3::X, &Mat4::IDENTITY, &cam, surface);
        let up = project_to_surface(Vec3::Y, &Mat4::IDENTITY, &cam, surface);
        assert!(right.x > 100.0);
        assert!(up.y < 100.0);
    }

    #[test]
    fn world_transform_is_applied() {
        let surface = SurfaceSize::new(200.0, 200.0);
        let cam = camera(surface);
        let moved = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let a = project_to_surface(Vec3::ZERO, &moved, &cam, surface);
        let b = project_to_surface(Vec3::X, &Mat4::IDENTITY, &cam, surface);
        assert!((a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4);
    }

    #[test]
    fn points_behind_camera_are_hidden() {
        let surface = SurfaceSize::new(200.0, 200.0);
        let cam = camera(surface);
        let behind = project_to_surface(Vec3::new(0.0, 0.0, 10.0), &Mat4::IDENTITY, &cam, surface);
        assert!(!behind.visible);
        let too_far = project_to_surface(Vec3::new(0.0, 0.0, -2000.0), &Mat4::IDENTITY, &cam, surface);
        assert!(!too_far.visible);
    }

    #[test]
    fn ndc_round_trip_through_ray() {
        let surface = SurfaceSize::new(300.0, 300.0);
        let cam = camera(surface);
        let ndc = surface.to_ndc(Vec2::new(225.0, 75.0));
        assert!((ndc.x - 0.5).abs() < 1e-6 && (ndc.y - 0.5).abs() < 1e-6);

        let ray = cam.ray_from_ndc(ndc);
        // Intersect with the z = 0 plane and project back.
        let t = -ray.origin.z / ray.dir.z;
        let hit = ray.origin + ray.dir * t;
        let p = project_to_surface(hit, &Mat4::IDENTITY, &cam, surface);
        assert!((p.x - 225.0).abs() < 1e-2 && (p.y - 75.0).abs() < 1e-2);
    }
}
