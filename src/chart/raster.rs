//! Draws a `PieChart` into a vello scene.
//!
//! Slices are projected on the CPU and painted back to front: visible wall
//! triangles sorted by distance from the eye, then the camera-facing cap of
//! every slice, then leader lines and the hover marker. A cap can only be
//! hidden by walls of the same slab, so drawing caps last is enough.

use glam::{Mat4, Vec3};
use vello::kurbo::{Affine, BezPath, Point, Stroke};
use vello::peniko::{Color, Fill};
use vello::Scene;

use super::camera::{project_world, SurfaceSize};
use super::geometry::FacePart;
use super::{CategorySlice, PieChart};

const AMBIENT: f32 = 0.55;
const DIFFUSE: f32 = 0.6;
/// Walls are darkened so the rim reads as depth.
const WALL_SHADE: f32 = 0.7;

const LEADER_COLOR: Color = Color::new([0.059, 0.090, 0.165, 1.0]); // #0f172a
const LEADER_WIDTH: f64 = 2.0;
const MARKER_WIDTH: f64 = 2.5;
/// Hairline in the fill colour over each facet hides antialiasing seams.
const SEAM_WIDTH: f64 = 0.75;

fn light_dir() -> Vec3 {
    Vec3::new(5.0, 5.0, 5.0).normalize()
}

/// Lambert shade of `base` for a world-space `normal`.
pub fn shade(base: Color, normal: Vec3, part: FacePart) -> Color {
    let lambert = (AMBIENT + DIFFUSE * normal.dot(light_dir()).max(0.0)).min(1.0);
    let factor = match part {
        FacePart::SideWall | FacePart::EndWall => lambert * WALL_SHADE,
        FacePart::FrontCap | FacePart::BackCap => lambert,
    };
    let [r, g, b, a] = base.components;
    Color::new([r * factor, g * factor, b * factor, a])
}

/// True when a face with `normal` through `point` is turned towards `eye`.
pub fn faces_eye(normal: Vec3, point: Vec3, eye: Vec3) -> bool {
    normal.dot(eye - point) > 0.0
}

/// One projected polygon ready to fill.
#[derive(Debug, Clone)]
pub struct Facet {
    pub points: Vec<Point>,
    /// Distance from the eye to the polygon centroid.
    pub depth: f32,
    pub color: Color,
    pub part: FacePart,
}

fn project_polygon(points: impl Iterator<Item = Vec3>, vp: &Mat4, surface: SurfaceSize) -> Option<Vec<Point>> {
    points
        .map(|p| {
            let at = project_world(p, vp, surface);
            at.visible.then_some(Point::new(at.x, at.y))
        })
        .collect()
}

/// Visible facets of every slice in paint order.
pub fn collect_facets(chart: &PieChart) -> Vec<Facet> {
    let Some(surface) = chart.surface() else {
        return Vec::new();
    };
    let vp = chart.camera().view_projection();
    let eye = chart.camera().eye;

    let mut walls = Vec::new();
    let mut caps = Vec::new();
    for (i, slice) in chart.slices().iter().enumerate() {
        let world = chart.slice_world(i);
        wall_facets(slice, &world, &vp, eye, surface, &mut walls);
        if let Some(cap) = cap_facet(slice, &world, &vp, eye, surface) {
            caps.push(cap);
        }
    }
    walls.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    caps.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    walls.extend(caps);
    walls
}

fn wall_facets(
    slice: &CategorySlice,
    world: &Mat4,
    vp: &Mat4,
    eye: Vec3,
    surface: SurfaceSize,
    out: &mut Vec<Facet>,
) {
    let base = slice.color();
    for face in slice
        .mesh
        .faces
        .iter()
        .filter(|f| matches!(f.part, FacePart::SideWall | FacePart::EndWall))
    {
        let corners = slice.mesh.triangle(face).map(|p| world.transform_point3(p));
        let normal = world.transform_vector3(face.normal).normalize_or_zero();
        let centroid = (corners[0] + corners[1] + corners[2]) / 3.0;
        if !faces_eye(normal, centroid, eye) {
            continue;
        }
        let Some(points) = project_polygon(corners.into_iter(), vp, surface) else {
            continue;
        };
        out.push(Facet {
            points,
            depth: centroid.distance(eye),
            color: shade(base, normal, face.part),
            part: face.part,
        });
    }
}

fn cap_facet(slice: &CategorySlice, world: &Mat4, vp: &Mat4, eye: Vec3, surface: SurfaceSize) -> Option<Facet> {
    let front_normal = world.transform_vector3(Vec3::Z).normalize_or_zero();
    let front_centre = world.transform_point3(Vec3::new(0.0, 0.0, slice.mesh.depth()));
    let (outline, normal, part): (Vec<Vec3>, Vec3, FacePart) = if faces_eye(front_normal, front_centre, eye) {
        (slice.mesh.front_outline().collect(), front_normal, FacePart::FrontCap)
    } else {
        (slice.mesh.back_outline().collect(), -front_normal, FacePart::BackCap)
    };
    let world_outline: Vec<Vec3> = outline.iter().map(|p| world.transform_point3(*p)).collect();
    let centroid = world_outline.iter().copied().sum::<Vec3>() / world_outline.len().max(1) as f32;
    let points = project_polygon(world_outline.into_iter(), vp, surface)?;
    Some(Facet {
        points,
        depth: centroid.distance(eye),
        color: shade(slice.color(), normal, part),
        part,
    })
}

fn polyline(points: &[Point], close: bool) -> BezPath {
    let mut path = BezPath::new();
    for (i, p) in points.iter().enumerate() {
        if i == 0 {
            path.move_to(*p);
        } else {
            path.line_to(*p);
        }
    }
    if close {
        path.close_path();
    }
    path
}

/// Paint `chart` with its surface's top-left corner at `origin`.
pub fn render_chart(scene: &mut Scene, chart: &PieChart, origin: Point) {
    let Some(surface) = chart.surface() else {
        return;
    };
    let transform = Affine::translate((origin.x, origin.y));

    for facet in collect_facets(chart) {
        let path = polyline(&facet.points, true);
        scene.fill(Fill::NonZero, transform, facet.color, None, &path);
        scene.stroke(&Stroke::new(SEAM_WIDTH), transform, facet.color, None, &path);
    }

    let vp = chart.camera().view_projection();
    let group = chart.group();
    for (i, slice) in chart.slices().iter().enumerate() {
        if let Some(points) = leader_points(chart, i) {
            scene.stroke(&Stroke::new(LEADER_WIDTH), transform, LEADER_COLOR, None, &polyline(&points, false));
        }
        if slice.marker.visible {
            draw_marker(scene, transform, slice, &group, chart.camera().eye, &vp, surface);
        }
    }
}

/// Surface points of a slice's leader line, following its pop-out offset.
/// `None` when any point falls outside the camera's depth range.
pub fn leader_points(chart: &PieChart, index: usize) -> Option<Vec<Point>> {
    let surface = chart.surface()?;
    let slice = chart.slices().get(index)?;
    let group = chart.group();
    let anchored = slice.leader.anchored(slice.offset).map(|p| group.transform_point3(p));
    project_polygon(anchored.into_iter(), &chart.camera().view_projection(), surface)
}

/// Arrow from the leader terminus pointing radially outward.
fn draw_marker(
    scene: &mut Scene,
    transform: Affine,
    slice: &CategorySlice,
    group: &Mat4,
    eye: Vec3,
    vp: &Mat4,
    surface: SurfaceSize,
) {
    let marker = &slice.marker;
    let start = group.transform_point3(slice.leader.terminus + slice.offset);
    let dir = group.transform_vector3(slice.radial_dir()).normalize_or_zero();
    let tip = start + dir * marker.length;
    let neck = start + dir * (marker.length - marker.head_length).max(0.0);
    let across = dir.cross(eye - start).normalize_or_zero() * marker.head_width;

    let color = slice.color();
    if let Some(shaft) = project_polygon([start, neck].into_iter(), vp, surface) {
        scene.stroke(&Stroke::new(MARKER_WIDTH), transform, color, None, &polyline(&shaft, false));
    }
    if let Some(head) = project_polygon([neck + across, tip, neck - across].into_iter(), vp, surface) {
        scene.fill(Fill::NonZero, transform, color, None, &polyline(&head, true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::camera::SurfaceSize;
    use crate::chart::labels::LabelOverlay;
    use crate::chart::{ChartInput, PointerInput};
    use crate::config::ChartTokens;
    use glam::Vec2;

    fn chart() -> (PieChart, LabelOverlay) {
        let mut overlay = LabelOverlay::new();
        let mut chart = PieChart::new(ChartTokens {
            segments: 24,
            ..ChartTokens::default()
        });
        chart.mount(SurfaceSize::new(320.0, 320.0), ChartInput::new(40.0, 40.0, 20.0), &mut overlay, 0.0);
        chart.tick(0.0, &mut overlay);
        (chart, overlay)
    }

    #[test]
    fn shading_brightens_lit_faces_and_darkens_walls() {
        let base = Color::new([0.5, 0.5, 0.5, 1.0]);
        let lit = shade(base, light_dir(), FacePart::FrontCap);
        let unlit = shade(base, -light_dir(), FacePart::FrontCap);
        let wall = shade(base, light_dir(), FacePart::SideWall);
        assert!((lit.components[0] - 0.5).abs() < 1e-6);
        assert!((unlit.components[0] - 0.5 * AMBIENT).abs() < 1e-6);
        assert!(wall.components[0] < lit.components[0]);
        assert_eq!(wall.components[3], 1.0);
    }

    #[test]
    fn back_faces_are_culled() {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        assert!(faces_eye(Vec3::Z, Vec3::ZERO, eye));
        assert!(!faces_eye(Vec3::NEG_Z, Vec3::ZERO, eye));
    }

    #[test]
    fn unrotated_chart_shows_front_caps_last() {
        let (chart, _overlay) = chart();
        let facets = collect_facets(&chart);
        let caps: Vec<_> = facets
            .iter()
            .filter(|f| matches!(f.part, FacePart::FrontCap | FacePart::BackCap))
            .collect();
        assert_eq!(caps.len(), 3);
        assert!(caps.iter().all(|f| f.part == FacePart::FrontCap));

        let first_cap = facets.iter().position(|f| f.part == FacePart::FrontCap).unwrap();
        assert!(facets[first_cap..].iter().all(|f| f.part == FacePart::FrontCap));
        assert!(facets[..first_cap].windows(2).all(|w| w[0].depth >= w[1].depth));
    }

    #[test]
    fn flipped_chart_shows_back_caps() {
        let (mut chart, mut overlay) = chart();
        chart.handle_pointer(PointerInput::Down(Vec2::ZERO), 0.0);
        // Half a turn of yaw at the default sensitivity.
        let pixels = std::f32::consts::PI / chart.tokens().drag_sensitivity;
        chart.handle_pointer(PointerInput::Move(Vec2::new(pixels, 0.0)), 0.0);
        chart.handle_pointer(PointerInput::Up, 0.0);
        chart.tick(0.0, &mut overlay);
        let facets = collect_facets(&chart);
        assert!(facets.iter().any(|f| f.part == FacePart::BackCap));
        assert!(facets.iter().all(|f| f.part != FacePart::FrontCap));
    }

    #[test]
    fn leader_line_moves_with_popped_slice() {
        let (mut chart, mut overlay) = chart();
        let resting = leader_points(&chart, 0).unwrap();
        assert_eq!(resting.len(), 3);

        // Hover the middle of slice 0's front cap until it has popped out.
        let slice = &chart.slices()[0];
        let local = slice.radial_dir() * chart.tokens().radius * 0.6 + Vec3::Z * chart.tokens().depth;
        let surface = chart.surface().unwrap();
        let at = project_world(local, &chart.camera().view_projection(), surface);
        chart.handle_pointer(PointerInput::Move(Vec2::new(at.x as f32, at.y as f32)), 0.0);
        for frame in 1..=120 {
            chart.tick(0.016 * frame as f64, &mut overlay);
        }
        assert_eq!(chart.hovered(), Some(0));

        let slice = &chart.slices()[0];
        let popped = leader_points(&chart, 0).unwrap();
        let vp = chart.camera().view_projection();
        for (point, local) in popped.iter().zip(slice.leader.anchored(slice.offset)) {
            let expected = project_world(chart.group().transform_point3(local), &vp, surface);
            assert!((point.x - expected.x).abs() < 1e-6);
            assert!((point.y - expected.y).abs() < 1e-6);
        }
        assert!(popped[2].distance(resting[2]) > 1.0);
    }

    #[test]
    fn unmounted_chart_has_nothing_to_paint() {
        let chart = PieChart::new(ChartTokens::default());
        assert!(collect_facets(&chart).is_empty());
        let mut scene = Scene::new();
        render_chart(&mut scene, &chart, Point::ZERO);
    }
}
