//! Leader lines and the floating percentage labels they point at.
//!
//! Lines live in slice-local space so they rotate rigidly with the disc. The
//! labels themselves are flat overlay entries owned by the host surface and
//! repositioned every tick from the projected line terminus.

use std::collections::BTreeMap;

use glam::Vec3;

use super::camera::SurfacePoint;

/// Which side of the terminus a label hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// `cos(mid)` below this counts as vertical.
const VERTICAL_EPSILON: f32 = 1e-9;

/// Side for a slice's mid-angle: right for positive cosine, left otherwise.
pub fn side_for(mid_angle: f32) -> Side {
    if mid_angle.cos() > VERTICAL_EPSILON {
        Side::Right
    } else {
        Side::Left
    }
}

/// Three-point polyline: rim → radially out → horizontal terminus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderLine {
    pub rim: Vec3,
    pub bend: Vec3,
    pub terminus: Vec3,
    pub side: Side,
}

impl LeaderLine {
    pub fn new(mid_angle: f32, radius: f32, depth: f32, out: f32, horizontal: f32) -> Self {
        let (sin, cos) = mid_angle.sin_cos();
        let z = depth * 0.5;
        let rim = Vec3::new(cos * radius, sin * radius, z);
        let bend = Vec3::new(cos * (radius + out), sin * (radius + out), z);
        let side = side_for(mid_angle);
        let dx = match side {
            Side::Right => horizontal,
            Side::Left => -horizontal,
        };
        Self {
            rim,
            bend,
            terminus: bend + Vec3::new(dx, 0.0, 0.0),
            side,
        }
    }

    /// The three points shifted by the slice's current pop-out offset.
    pub fn anchored(&self, offset: Vec3) -> [Vec3; 3] {
        [self.rim + offset, self.bend + offset, self.terminus + offset]
    }
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(u64);

/// A label drawn on top of a chart surface, in surface pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingLabel {
    pub text: String,
    /// Anchor x: the label's left edge for `Side::Right`, its right edge
    /// for `Side::Left`.
    pub x: f64,
    /// Vertical centre.
    pub y: f64,
    pub side: Side,
    pub visible: bool,
}

/// Host-owned set of floating labels for one chart surface.
#[derive(Debug, Default)]
pub struct LabelOverlay {
    next_id: u64,
    labels: BTreeMap<LabelId, FloatingLabel>,
}

impl LabelOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a new, initially hidden label.
    pub fn attach(&mut self, text: impl Into<String>, side: Side) -> LabelId {
        let id = LabelId(self.next_id);
        self.next_id += 1;
        self.labels.insert(
            id,
            FloatingLabel {
                text: text.into(),
                x: 0.0,
                y: 0.0,
                side,
                visible: false,
            },
        );
        id
    }

    pub fn detach(&mut self, id: LabelId) -> Option<FloatingLabel> {
        self.labels.remove(&id)
    }

    pub fn get(&self, id: LabelId) -> Option<&FloatingLabel> {
        self.labels.get(&id)
    }

    /// Move a label to the projected terminus, or hide it when the terminus
    /// is outside the camera's depth range.
    pub fn place(&mut self, id: LabelId, at: SurfacePoint, gap: f64) {
        let Some(label) = self.labels.get_mut(&id) else {
            return;
        };
        label.visible = at.visible;
        label.x = match label.side {
            Side::Right => at.x + gap,
            Side::Left => at.x - gap,
        };
        label.y = at.y;
    }

    pub fn iter(&self) -> impl Iterator<Item = &FloatingLabel> {
        self.labels.values()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
