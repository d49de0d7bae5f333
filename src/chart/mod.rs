//! Interactive 3D pie chart.
//!
//! A `PieChart` turns three category values into extruded disc wedges, spins
//! them under pointer drag or idle auto-rotation, pops the hovered wedge
//! outward, and keeps a floating percentage label attached to each wedge.
//!
//! Lifecycle:
//!
//! ```text
//! new ──mount──▶ mounted ──set_input (changed)──▶ rebuild slices + labels
//!                   │
//!                   └──teardown──▶ unmounted (tick stops, labels detached)
//! ```
//!
//! A rebuild keeps the group rotation and any drag in progress.
//!
//! The host owns the label overlay and passes it in wherever labels are
//! attached, moved, or removed.

pub mod camera;
pub mod geometry;
pub mod labels;
pub mod picking;
pub mod raster;

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{EulerRot, Mat4, Vec2, Vec3};
use statig::blocking::StateMachine;
use statig::prelude::*;
use tracing::{debug, info};
use vello::peniko::Color;

use crate::config::ChartTokens;
use crate::state_machine::interaction_sm::{self, CursorStyle, InteractionEvent, InteractionMachine};

use camera::{Camera, SurfaceSize};
use geometry::DiscSegment;
use labels::{LabelId, LabelOverlay, LeaderLine, Side};

/// Angle at which the first slice starts: six o'clock, sweeping counter-clockwise.
const START_ANGLE: f32 = -FRAC_PI_2;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The three magnitudes a chart visualises.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChartInput {
    pub completed: f64,
    pub pending: f64,
    pub auto_closed: f64,
}

impl ChartInput {
    pub fn new(completed: f64, pending: f64, auto_closed: f64) -> Self {
        Self {
            completed,
            pending,
            auto_closed,
        }
    }

    /// Values in construction order. Negative or non-finite values read as 0.
    pub fn values(&self) -> [(Category, f64); 3] {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        [
            (Category::Completed, clean(self.completed)),
            (Category::Pending, clean(self.pending)),
            (Category::AutoClosed, clean(self.auto_closed)),
        ]
    }

    pub fn total(&self) -> f64 {
        self.values().iter().map(|(_, v)| v).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Completed,
    Pending,
    AutoClosed,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Completed, Category::Pending, Category::AutoClosed];

    pub fn color(self) -> Color {
        match self {
            Category::Completed => Color::from_rgb8(0x10, 0xb9, 0x81),
            Category::Pending => Color::from_rgb8(0x00, 0x31, 0x49),
            Category::AutoClosed => Color::from_rgb8(0xf5, 0x9e, 0x0b),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Completed => "Completed",
            Category::Pending => "Pending",
            Category::AutoClosed => "Auto Closed",
        }
    }
}

// ---------------------------------------------------------------------------
// Slice planning
// ---------------------------------------------------------------------------

/// Angular layout of one non-empty category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePlan {
    pub category: Category,
    pub start_angle: f32,
    pub sweep_angle: f32,
    pub mid_angle: f32,
    /// Rounded integer share of the total.
    pub percent: u32,
    pub side: Side,
}

/// Lay out slices for `input`. Zero categories are skipped; a zero total
/// yields no slices. The last slice absorbs rounding so sweeps sum to `TAU`.
pub fn plan_slices(input: &ChartInput) -> Vec<SlicePlan> {
    let total = input.total();
    if total <= 0.0 {
        return Vec::new();
    }
    let present: Vec<_> = input.values().into_iter().filter(|(_, v)| *v > 0.0).collect();
    let mut start = START_ANGLE;
    let mut swept = 0.0_f32;
    present
        .iter()
        .enumerate()
        .map(|(i, &(category, value))| {
            let sweep = if i + 1 == present.len() {
                TAU - swept
            } else {
                (value / total) as f32 * TAU
            };
            let mid = start + sweep / 2.0;
            let plan = SlicePlan {
                category,
                start_angle: start,
                sweep_angle: sweep,
                mid_angle: mid,
                percent: (value / total * 100.0).round() as u32,
                side: labels::side_for(mid),
            };
            start += sweep;
            swept += sweep;
            plan
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Slices
// ---------------------------------------------------------------------------

/// Pulsing arrow shown at the leader terminus of the hovered slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverMarker {
    pub visible: bool,
    pub length: f32,
    pub head_length: f32,
    pub head_width: f32,
}

/// Base head proportions of the marker arrow.
const MARKER_HEAD_LENGTH: f32 = 0.08;
const MARKER_HEAD_WIDTH: f32 = 0.04;

#[derive(Debug)]
pub struct CategorySlice {
    pub plan: SlicePlan,
    pub mesh: DiscSegment,
    pub leader: LeaderLine,
    pub label: LabelId,
    pub marker: HoverMarker,
    /// Current pop-out displacement in group space.
    pub offset: Vec3,
}

impl CategorySlice {
    pub fn radial_dir(&self) -> Vec3 {
        let (sin, cos) = self.plan.mid_angle.sin_cos();
        Vec3::new(cos, sin, 0.0)
    }

    pub fn color(&self) -> Color {
        self.plan.category.color()
    }
}

// ---------------------------------------------------------------------------
// PieChart
// ---------------------------------------------------------------------------

/// Whether the host should keep scheduling frames for this chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stopped,
}

/// Pointer input in surface-relative pixels, as routed by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Down(Vec2),
    Move(Vec2),
    Up,
    Enter,
    Leave,
}

pub struct PieChart {
    tokens: ChartTokens,
    input: ChartInput,
    camera: Camera,
    /// `None` until mounted on a host surface.
    surface: Option<SurfaceSize>,
    slices: Vec<CategorySlice>,
    hovered: Option<usize>,
    machine: StateMachine<InteractionMachine>,
    group: Mat4,
    scheduled: bool,
}

impl PieChart {
    pub fn new(tokens: ChartTokens) -> Self {
        let fallback = SurfaceSize::new(0.0, 0.0);
        Self {
            camera: Camera::new(tokens.fov_deg, tokens.camera_distance, fallback),
            machine: InteractionMachine::new(&tokens, 0.0).state_machine(),
            tokens,
            input: ChartInput::default(),
            surface: None,
            slices: Vec::new(),
            hovered: None,
            group: Mat4::IDENTITY,
            scheduled: false,
        }
    }

    /// Attach to a host surface and build the scene for `input`.
    pub fn mount(&mut self, surface: SurfaceSize, input: ChartInput, overlay: &mut LabelOverlay, now: f64) {
        if self.surface.is_some() {
            self.teardown(overlay);
        }
        self.surface = Some(surface);
        self.camera.set_surface(surface);
        self.input = input;
        self.rebuild(overlay, now);
    }

    /// Replace the input. Any change rebuilds every slice from scratch.
    pub fn set_input(&mut self, input: ChartInput, overlay: &mut LabelOverlay, now: f64) {
        if input == self.input {
            return;
        }
        self.input = input;
        if self.surface.is_some() {
            self.rebuild(overlay, now);
        }
    }

    /// Host surface changed size.
    pub fn resize(&mut self, surface: SurfaceSize) {
        if self.surface.is_none() {
            return;
        }
        self.surface = Some(surface);
        self.camera.set_surface(surface);
        debug!(target: "chart", width = surface.width, height = surface.height, "resize");
    }

    /// Stop ticking and release every slice and label.
    pub fn teardown(&mut self, overlay: &mut LabelOverlay) {
        self.release_slices(overlay);
        self.surface = None;
        self.scheduled = false;
        self.machine = InteractionMachine::new(&self.tokens, 0.0).state_machine();
    }

    fn release_slices(&mut self, overlay: &mut LabelOverlay) {
        for slice in self.slices.drain(..) {
            overlay.detach(slice.label);
        }
        self.hovered = None;
    }

    /// Rebuild slices, leader lines and labels. Rotation and drag state
    /// survive; only the idle timer restarts.
    fn rebuild(&mut self, overlay: &mut LabelOverlay, now: f64) {
        self.release_slices(overlay);
        self.machine.handle(&InteractionEvent::Rebuilt { now });

        let t = &self.tokens;
        self.slices = plan_slices(&self.input)
            .into_iter()
            .map(|plan| CategorySlice {
                mesh: DiscSegment::build(plan.start_angle, plan.sweep_angle, t.radius, t.depth, t.segments),
                leader: LeaderLine::new(plan.mid_angle, t.radius, t.depth, t.leader_out, t.leader_horizontal),
                label: overlay.attach(format!("{}%", plan.percent), plan.side),
                marker: HoverMarker {
                    visible: false,
                    length: t.marker_length,
                    head_length: MARKER_HEAD_LENGTH,
                    head_width: MARKER_HEAD_WIDTH,
                },
                offset: Vec3::ZERO,
                plan,
            })
            .collect();

        // Nothing to animate for an empty chart.
        self.scheduled = !self.slices.is_empty();
        info!(target: "chart", slices = self.slices.len(), input = ?self.input, "chart rebuilt");
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn handle_pointer(&mut self, input: PointerInput, now: f64) {
        let Some(surface) = self.surface else {
            return;
        };
        // An empty chart still lets a drag in progress finish.
        if !self.scheduled && !matches!(input, PointerInput::Up | PointerInput::Leave) {
            return;
        }
        let event = match input {
            PointerInput::Down(pos) => InteractionEvent::PointerDown { pos },
            PointerInput::Move(pos) => InteractionEvent::PointerMove {
                pos,
                ndc: surface.to_ndc(pos),
                now,
            },
            PointerInput::Up => InteractionEvent::PointerUp,
            PointerInput::Enter => InteractionEvent::PointerEnter,
            PointerInput::Leave => InteractionEvent::PointerLeave,
        };
        self.machine.handle(&event);
    }

    // -----------------------------------------------------------------------
    // Frame update
    // -----------------------------------------------------------------------

    /// Advance one animation frame and reposition labels.
    pub fn tick(&mut self, now: f64, overlay: &mut LabelOverlay) -> TickOutcome {
        let Some(surface) = self.surface.filter(|_| self.scheduled) else {
            return TickOutcome::Stopped;
        };

        self.machine.handle(&InteractionEvent::Tick { now });

        let rotation = self.interaction().rotation;
        self.group = Mat4::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);

        let hovered = self.pick();
        if hovered != self.hovered {
            debug!(target: "chart", ?hovered, "hover changed");
            self.hovered = hovered;
            for (i, slice) in self.slices.iter_mut().enumerate() {
                slice.marker.visible = Some(i) == hovered;
            }
        }

        let t = &self.tokens;
        let pulse = t.pulse_amplitude * (now * t.pulse_rate).sin() as f32;
        for (i, slice) in self.slices.iter_mut().enumerate() {
            let target = if Some(i) == self.hovered {
                slice.radial_dir() * t.pop_distance
            } else {
                Vec3::ZERO
            };
            slice.offset = slice.offset.lerp(target, t.pop_smoothing);

            if slice.marker.visible {
                slice.marker.length = t.marker_length + pulse;
                slice.marker.head_length = MARKER_HEAD_LENGTH + pulse * 0.2;
                slice.marker.head_width = MARKER_HEAD_WIDTH + pulse * 0.4;
            }
        }

        for (i, slice) in self.slices.iter().enumerate() {
            let at = camera::project_to_surface(slice.leader.terminus, &self.slice_world(i), &self.camera, surface);
            overlay.place(slice.label, at, self.tokens.label_gap);
        }

        TickOutcome::Continue
    }

    fn pick(&self) -> Option<usize> {
        let ndc = self.interaction().pointer_ndc?;
        let ray = self.camera.ray_from_ndc(ndc);
        picking::pick(
            &ray,
            self.slices
                .iter()
                .enumerate()
                .map(|(i, s)| (i, &s.mesh, self.slice_world(i))),
        )
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    fn interaction(&self) -> &InteractionMachine {
        &self.machine
    }

    /// Group rotation followed by the slice's pop-out offset.
    pub fn slice_world(&self, index: usize) -> Mat4 {
        let offset = self.slices.get(index).map_or(Vec3::ZERO, |s| s.offset);
        self.group * Mat4::from_translation(offset)
    }

    /// Current group rotation, without any slice offset.
    pub fn group(&self) -> Mat4 {
        self.group
    }

    pub fn slices(&self) -> &[CategorySlice] {
        &self.slices
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn rotation(&self) -> Vec3 {
        self.interaction().rotation
    }

    pub fn cursor(&self) -> CursorStyle {
        self.interaction().cursor
    }

    pub fn is_dragging(&self) -> bool {
        interaction_sm::is_dragging(&self.machine)
    }

    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn surface(&self) -> Option<SurfaceSize> {
        self.surface
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn tokens(&self) -> &ChartTokens {
        &self.tokens
    }
}
