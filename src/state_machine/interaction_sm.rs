//! Chart interaction state machine.
//!
//! ```text
//! Idle ──PointerDown──▶ Dragging
//!  ▲                       │
//!  └──PointerUp / Leave────┘
//! ```
//!
//! Idle covers both "auto-rotating" and "settled"; the difference is only
//! the elapsed-time gate checked on every `Tick`.

use glam::{Vec2, Vec3};
use statig::prelude::*;
use tracing::trace;

use crate::config::ChartTokens;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events dispatched to the interaction state machine. Positions are in
/// surface pixels, times in seconds on the host clock.
#[derive(Debug, Clone)]
pub enum InteractionEvent {
    PointerDown { pos: Vec2 },
    PointerMove { pos: Vec2, ndc: Vec2, now: f64 },
    PointerUp,
    PointerEnter,
    PointerLeave,
    /// Once per animation frame, before the group rotation is applied.
    Tick { now: f64 },
    /// Slices were rebuilt for new values. Restarts the idle timer; rotation
    /// and any drag in progress carry over.
    Rebuilt { now: f64 },
}

/// Cursor the host should show over the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Default,
    Grab,
    Grabbing,
}

/// Whether the idle auto-rotation should advance this tick.
pub fn should_auto_rotate(now: f64, last_interaction: f64, dragging: bool, threshold: f64) -> bool {
    !dragging && now - last_interaction >= threshold
}

/// Whether `machine` is mid-drag.
pub fn is_dragging(machine: &statig::blocking::StateMachine<InteractionMachine>) -> bool {
    machine.state() == &State::dragging()
}

// ---------------------------------------------------------------------------
// Shared storage
// ---------------------------------------------------------------------------

pub struct InteractionMachine {
    /// Accumulated group rotation (pitch, yaw, roll) in radians.
    pub rotation: Vec3,
    /// Last pointer position seen, the origin of the next drag delta.
    pub anchor: Vec2,
    pub last_interaction: f64,
    /// Hover-pick coordinate; `None` while the pointer is off the surface.
    pub pointer_ndc: Option<Vec2>,
    pub cursor: CursorStyle,
    sensitivity: f32,
    idle_threshold: f64,
    auto_rotate_step: f32,
}

impl InteractionMachine {
    pub fn new(tokens: &ChartTokens, now: f64) -> Self {
        Self {
            rotation: Vec3::ZERO,
            anchor: Vec2::ZERO,
            last_interaction: now,
            pointer_ndc: None,
            cursor: CursorStyle::Default,
            sensitivity: tokens.drag_sensitivity,
            idle_threshold: tokens.idle_threshold_secs,
            auto_rotate_step: tokens.auto_rotate_step,
        }
    }
}

// ---------------------------------------------------------------------------
// State machine implementation
// ---------------------------------------------------------------------------

#[state_machine(
    initial = "State::idle()",
    state(derive(Debug, Clone, PartialEq))
)]
impl InteractionMachine {
    /// Not dragging. Pointer motion only feeds hover picking.
    #[state]
    fn idle(&mut self, event: &InteractionEvent) -> Outcome<State> {
        match event {
            InteractionEvent::PointerDown { pos } => {
                self.anchor = *pos;
                self.cursor = CursorStyle::Grabbing;
                Transition(State::dragging())
            }
            InteractionEvent::PointerMove { pos, ndc, .. } => {
                self.anchor = *pos;
                self.pointer_ndc = Some(*ndc);
                Handled
            }
            InteractionEvent::PointerUp | InteractionEvent::PointerEnter => {
                self.cursor = CursorStyle::Grab;
                Handled
            }
            InteractionEvent::PointerLeave => {
                self.cursor = CursorStyle::Default;
                self.pointer_ndc = None;
                Handled
            }
            InteractionEvent::Tick { now } => {
                if should_auto_rotate(*now, self.last_interaction, false, self.idle_threshold) {
                    self.rotation.y += self.auto_rotate_step;
                }
                Handled
            }
            InteractionEvent::Rebuilt { now } => {
                self.last_interaction = *now;
                Handled
            }
        }
    }

    /// Pointer held down: motion rotates the group.
    #[state]
    fn dragging(&mut self, event: &InteractionEvent) -> Outcome<State> {
        match event {
            InteractionEvent::PointerMove { pos, ndc, now } => {
                let delta = *pos - self.anchor;
                self.rotation.y += delta.x * self.sensitivity;
                self.rotation.x += delta.y * self.sensitivity;
                self.last_interaction = *now;
                self.anchor = *pos;
                self.pointer_ndc = Some(*ndc);
                trace!(target: "chart", ?delta, rotation = ?self.rotation, "drag");
                Handled
            }
            InteractionEvent::PointerUp => {
                self.cursor = CursorStyle::Grab;
                Transition(State::idle())
            }
            InteractionEvent::PointerLeave => {
                self.cursor = CursorStyle::Default;
                self.pointer_ndc = None;
                Transition(State::idle())
            }
            InteractionEvent::PointerDown { pos } => {
                self.anchor = *pos;
                Handled
            }
            InteractionEvent::Rebuilt { now } => {
                self.last_interaction = *now;
                Handled
            }
            InteractionEvent::PointerEnter | InteractionEvent::Tick { .. } => Handled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(now: f64) -> statig::blocking::StateMachine<InteractionMachine> {
        InteractionMachine::new(&ChartTokens::default(), now).state_machine()
    }

    fn moved(x: f32, y: f32, now: f64) -> InteractionEvent {
        InteractionEvent::PointerMove {
            pos: Vec2::new(x, y),
            ndc: Vec2::ZERO,
            now,
        }
    }

    #[test]
    fn auto_rotate_gate() {
        assert!(!should_auto_rotate(2.9, 0.0, false, 3.0));
        assert!(should_auto_rotate(3.0, 0.0, false, 3.0));
        assert!(should_auto_rotate(10.0, 0.0, false, 3.0));
        assert!(!should_auto_rotate(10.0, 0.0, true, 3.0));
    }

    #[test]
    fn drag_scales_delta_into_rotation() {
        let mut sm = machine(0.0);
        sm.handle(&InteractionEvent::PointerDown { pos: Vec2::new(10.0, 10.0) });
        assert!(is_dragging(&sm));
        assert_eq!(sm.cursor, CursorStyle::Grabbing);

        sm.handle(&moved(40.0, -10.0, 5.0));
        assert!((sm.rotation.y - 0.30).abs() < 1e-6);
        assert!((sm.rotation.x + 0.20).abs() < 1e-6);
        assert!((sm.last_interaction - 5.0).abs() < f64::EPSILON);

        // Deltas are measured from the previous move, not the press.
        sm.handle(&moved(50.0, -10.0, 5.1));
        assert!((sm.rotation.y - 0.40).abs() < 1e-6);
    }

    #[test]
    fn drag_resets_idle_timer() {
        let mut sm = machine(0.0);
        sm.handle(&InteractionEvent::PointerDown { pos: Vec2::ZERO });
        sm.handle(&moved(5.0, 0.0, 10.0));
        sm.handle(&InteractionEvent::PointerUp);
        let yaw = sm.rotation.y;
        sm.handle(&InteractionEvent::Tick { now: 10.0 });
        assert!((sm.rotation.y - yaw).abs() < f32::EPSILON);
    }

    #[test]
    fn idle_ticks_rotate_after_threshold() {
        let mut sm = machine(0.0);
        sm.handle(&InteractionEvent::Tick { now: 1.0 });
        assert_eq!(sm.rotation.y, 0.0);

        let mut previous = sm.rotation.y;
        for i in 0..5 {
            sm.handle(&InteractionEvent::Tick { now: 3.0 + i as f64 * 0.016 });
            assert!((sm.rotation.y - previous - 0.002).abs() < 1e-6);
            previous = sm.rotation.y;
        }
    }

    #[test]
    fn no_auto_rotation_while_dragging() {
        let mut sm = machine(0.0);
        sm.handle(&InteractionEvent::PointerDown { pos: Vec2::ZERO });
        sm.handle(&InteractionEvent::Tick { now: 100.0 });
        assert_eq!(sm.rotation.y, 0.0);
    }

    #[test]
    fn hover_move_does_not_rotate() {
        let mut sm = machine(0.0);
        sm.handle(&InteractionEvent::PointerMove {
            pos: Vec2::new(100.0, 20.0),
            ndc: Vec2::new(0.25, -0.5),
            now: 1.0,
        });
        assert_eq!(sm.rotation, Vec3::ZERO);
        assert_eq!(sm.pointer_ndc, Some(Vec2::new(0.25, -0.5)));
        assert!((sm.last_interaction).abs() < f64::EPSILON);
    }

    #[test]
    fn cursor_affordances() {
        let mut sm = machine(0.0);
        sm.handle(&InteractionEvent::PointerEnter);
        assert_eq!(sm.cursor, CursorStyle::Grab);
        sm.handle(&InteractionEvent::PointerDown { pos: Vec2::ZERO });
        assert_eq!(sm.cursor, CursorStyle::Grabbing);
        sm.handle(&InteractionEvent::PointerUp);
        assert_eq!(sm.cursor, CursorStyle::Grab);
        assert_eq!(sm.state(), &State::idle());
    }

    #[test]
    fn rebuild_restarts_idle_timer_without_dropping_drag() {
        let mut sm = machine(0.0);
        sm.handle(&InteractionEvent::PointerDown { pos: Vec2::ZERO });
        sm.handle(&moved(20.0, 0.0, 1.0));
        let rotation = sm.rotation;

        sm.handle(&InteractionEvent::Rebuilt { now: 8.0 });
        assert!(is_dragging(&sm));
        assert_eq!(sm.rotation, rotation);
        assert!((sm.last_interaction - 8.0).abs() < f64::EPSILON);

        sm.handle(&InteractionEvent::PointerUp);
        sm.handle(&InteractionEvent::Rebuilt { now: 20.0 });
        sm.handle(&InteractionEvent::Tick { now: 21.0 });
        assert_eq!(sm.rotation, rotation);
    }

    #[test]
    fn leave_ends_drag_and_clears_hover() {
        let mut sm = machine(0.0);
        sm.handle(&moved(1.0, 1.0, 0.5));
        sm.handle(&InteractionEvent::PointerDown { pos: Vec2::ZERO });
        sm.handle(&InteractionEvent::PointerLeave);
        assert_eq!(sm.state(), &State::idle());
        assert_eq!(sm.cursor, CursorStyle::Default);
        assert_eq!(sm.pointer_ndc, None);
    }
}
