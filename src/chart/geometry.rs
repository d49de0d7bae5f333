//! Disc-segment mesh construction.
//!
//! A slice is a wedge of a flat disc extruded along +z: back cap at `z = 0`,
//! front cap at `z = depth`, a curved side wall along the rim, and two flat
//! end walls along the radial edges. Every face keeps its own normal so the
//! solid shades faceted rather than smooth.

use glam::Vec3;
use std::f32::consts::TAU;

/// Which part of the solid a face belongs to. Walls shade darker than caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacePart {
    FrontCap,
    BackCap,
    SideWall,
    EndWall,
}

#[derive(Debug, Clone, Copy)]
pub struct Face {
    pub indices: [u32; 3],
    pub normal: Vec3,
    pub part: FacePart,
}

/// Indexed triangle mesh of one disc segment, in slice-local space.
#[derive(Debug, Clone)]
pub struct DiscSegment {
    pub positions: Vec<Vec3>,
    pub faces: Vec<Face>,
    segments: usize,
    /// Centre of the bounding sphere used to reject rays early.
    pub bounds_center: Vec3,
    pub bounds_radius: f32,
}

impl DiscSegment {
    /// Build the wedge spanning `[start, start + sweep]` radians.
    ///
    /// `segments` is clamped to at least 1.
    pub fn build(start: f32, sweep: f32, radius: f32, depth: f32, segments: usize) -> Self {
        let n = segments.max(1);
        let rim = |z: f32| {
            (0..=n).map(move |i| {
                let a = start + (i as f32 / n as f32) * sweep;
                Vec3::new(a.cos() * radius, a.sin() * radius, z)
            })
        };

        let mut positions = Vec::with_capacity(2 * n + 4);
        positions.extend(rim(depth));
        positions.push(Vec3::new(0.0, 0.0, depth));
        positions.extend(rim(0.0));
        positions.push(Vec3::ZERO);

        let n32 = n as u32;
        let front = |i: u32| i;
        let front_center = n32 + 1;
        let back = |i: u32| n32 + 2 + i;
        let back_center = 2 * n32 + 3;

        let mut indexed: Vec<([u32; 3], FacePart)> = Vec::with_capacity(4 * n + 4);
        for i in 0..n32 {
            indexed.push(([front(i), front(i + 1), front_center], FacePart::FrontCap));
        }
        for i in 0..n32 {
            indexed.push(([back(i + 1), back(i), back_center], FacePart::BackCap));
        }
        for i in 0..n32 {
            indexed.push(([front(i), back(i), back(i + 1)], FacePart::SideWall));
            indexed.push(([front(i), back(i + 1), front(i + 1)], FacePart::SideWall));
        }
        // A full revolution has no radial edges to close.
        if sweep < TAU - 1e-4 {
            indexed.push(([front_center, back(0), front(0)], FacePart::EndWall));
            indexed.push(([front_center, back_center, back(0)], FacePart::EndWall));
            indexed.push(([front_center, front(n32), back(n32)], FacePart::EndWall));
            indexed.push(([front_center, back(n32), back_center], FacePart::EndWall));
        }

        let faces = indexed
            .into_iter()
            .map(|(indices, part)| Face {
                indices,
                normal: face_normal(&positions, indices),
                part,
            })
            .collect();

        let bounds_center = Vec3::new(0.0, 0.0, depth * 0.5);
        Self {
            positions,
            faces,
            segments: n,
            bounds_center,
            bounds_radius: (radius * radius + depth * depth * 0.25).sqrt(),
        }
    }

    pub fn triangle(&self, face: &Face) -> [Vec3; 3] {
        face.indices.map(|i| self.positions[i as usize])
    }

    /// Front cap outline: centre followed by the rim, in winding order.
    pub fn front_outline(&self) -> impl Iterator<Item = Vec3> + '_ {
        let n = self.segments;
        std::iter::once(self.positions[n + 1]).chain(self.positions[..=n].iter().copied())
    }

    /// Back cap outline: centre followed by the rim.
    pub fn back_outline(&self) -> impl Iterator<Item = Vec3> + '_ {
        let n = self.segments;
        let back_start = n + 2;
        std::iter::once(self.positions[2 * n + 3])
            .chain(self.positions[back_start..=back_start + n].iter().copied())
    }

    pub fn depth(&self) -> f32 {
        self.positions[self.segments + 1].z
    }
}

fn face_normal(positions: &[Vec3], [a, b, c]: [u32; 3]) -> Vec3 {
    let (a, b, c) = (
        positions[a as usize],
        positions[b as usize],
        positions[c as usize],
    );
    (b - a).cross(c - a).normalize_or_zero()
}
