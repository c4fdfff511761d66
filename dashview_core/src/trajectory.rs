//! Trajectory Builder - 3D polylines to screen-space ribbons
//!
//! Each model polyline has [`TRAJECTORY_SIZE`] samples, index 0 nearest to
//! the car. A ribbon is built from two passes over the samples up to a
//! cutoff index:
//!
//! ```text
//!   outward pass (-half_width)   0 → 1 → … → max_idx
//!                                                  │
//!   return pass  (+half_width)   0 ← 1 ← … ← max_idx
//! ```
//!
//! Only points that project successfully are kept, so a strip may hold
//! fewer than `2 * (max_idx + 1)` vertices.

use crate::geometry::Projector;
use dashview_env::messages::{LeadData, XyztData};
use nalgebra::{Point2, Vector3};
use serde::Serialize;

/// Samples per model polyline.
pub const TRAJECTORY_SIZE: usize = 33;

/// Shortest drawn path (m).
pub const MIN_DRAW_DISTANCE: f32 = 10.0;

/// Longest drawn path (m).
pub const MAX_DRAW_DISTANCE: f32 = 100.0;

/// Vertex capacity of a strip: outward plus return pass.
pub const STRIP_CAPACITY: usize = 2 * TRAJECTORY_SIZE;

/// Ordered ribbon boundary in display coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VertexStrip {
    points: Vec<Point2<f32>>,
}

impl VertexStrip {
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(STRIP_CAPACITY),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point2<f32>] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Appends a vertex; returns `false` once the strip is full.
    pub fn push(&mut self, point: Point2<f32>) -> bool {
        if self.points.len() >= STRIP_CAPACITY {
            return false;
        }
        self.points.push(point);
        true
    }

    /// Rebuilds the strip in place from `line` up to `max_idx`.
    ///
    /// The lateral offset at sample `i` is interpolated from
    /// `half_width_near` at 0 to `half_width_far` at `max_idx`.
    pub fn fill(
        &mut self,
        projector: &Projector,
        line: &XyztData,
        half_width_far: f32,
        half_width_near: f32,
        z_offset: f32,
        max_idx: usize,
    ) {
        self.clear();
        if line.is_empty() {
            return;
        }
        let max_idx = max_idx.min(line.len() - 1).min(TRAJECTORY_SIZE - 1);

        let half_width = |i: usize| {
            if max_idx == 0 {
                half_width_near
            } else {
                let t = i as f32 / max_idx as f32;
                half_width_near + (half_width_far - half_width_near) * t
            }
        };

        let sample = |i: usize, lateral: f32| {
            Vector3::new(line.x[i], line.y[i] + lateral, line.z[i] + z_offset)
        };

        for i in 0..=max_idx {
            if let Some(p) = projector.project(&sample(i, -half_width(i))) {
                self.push(p);
            }
        }
        for i in (0..=max_idx).rev() {
            if let Some(p) = projector.project(&sample(i, half_width(i))) {
                self.push(p);
            }
        }
    }
}

/// Builds a fresh ribbon strip for `line`.
pub fn build_strip(
    projector: &Projector,
    line: &XyztData,
    half_width_far: f32,
    half_width_near: f32,
    z_offset: f32,
    max_idx: usize,
) -> VertexStrip {
    let mut strip = VertexStrip::new();
    strip.fill(projector, line, half_width_far, half_width_near, z_offset, max_idx);
    strip
}

/// Last index, scanning from 0, whose `x` is still strictly below `distance`.
///
/// Returns 0 when the first sample is already at or beyond `distance`.
pub fn path_length_idx(line: &XyztData, distance: f32) -> usize {
    let mut max_idx = 0;
    for (i, x) in line.x.iter().take(TRAJECTORY_SIZE).enumerate() {
        if !(*x < distance) {
            break;
        }
        max_idx = i;
    }
    max_idx
}

/// Visible length of the planned path.
///
/// The last model sample (index `TRAJECTORY_SIZE - 1`) is clamped to the draw distance range, then
/// shortened when a tracked lead is close.
pub fn draw_distance(position: &XyztData, lead: Option<&LeadData>) -> f32 {
    let farthest = position.x.get(TRAJECTORY_SIZE - 1).copied().unwrap_or(MIN_DRAW_DISTANCE);
    let max_distance = farthest.clamp(MIN_DRAW_DISTANCE, MAX_DRAW_DISTANCE);

    match lead {
        Some(lead) if lead.status => {
            let lead_d = lead.d_rel * 2.0;
            (lead_d - (lead_d * 0.35).min(10.0)).clamp(0.0, max_distance)
        }
        _ => max_distance,
    }
}
