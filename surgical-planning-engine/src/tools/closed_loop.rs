use crate::engine::mesh::patch::{flatten_to_plane, plane_rotation, signed_area};
use crate::tools::registry::DrawnGeometry;
use bevy::prelude::*;
use constants::tool_defaults::LOOP_MIN_POINTS;

/// A stroke closes when it is long enough and ends near where it started.
pub fn is_closed_loop(points: &[Vec3], closure_distance: f32) -> bool {
    if points.len() < LOOP_MIN_POINTS {
        return false;
    }
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => first.distance(*last) < closure_distance,
        _ => false,
    }
}

/// Newell's method. Robust for non-planar and concave outlines.
pub fn newell_normal(points: &[Vec3]) -> Vec3 {
    let n = points.len();
    let mut normal = Vec3::ZERO;
    for i in 0..n {
        let cur = points[i];
        let next = points[(i + 1) % n];
        normal.x += (cur.y - next.y) * (cur.z + next.z);
        normal.y += (cur.z - next.z) * (cur.x + next.x);
        normal.z += (cur.x - next.x) * (cur.y + next.y);
    }
    normal.normalize_or_zero()
}

/// Enclosed area of a loop, flattened onto its best-fit plane.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopArea {
    /// Physical area, already multiplied by the squared scale factor.
    pub area: f32,
    pub centroid: Vec3,
    pub normal: Vec3,
    /// Outline in the plane frame centred on `centroid`.
    pub polygon: Vec<Vec2>,
}

impl LoopArea {
    /// Fill patch over the loop, lifted along the normal so it does not z-fight
    /// with the scan. `None` for degenerate loops.
    pub fn fill_geometry(&self, lift: f32) -> Option<DrawnGeometry> {
        if self.polygon.len() < 3 {
            return None;
        }
        let back = plane_rotation(self.normal).inverse();
        let origin = self.centroid + self.normal * lift;
        let outline = self
            .polygon
            .iter()
            .map(|p| back * p.extend(0.0) + origin)
            .collect();
        DrawnGeometry::fill(outline, self.normal)
    }
}

/// Measure a closed outline. The normal is turned to face `eye`.
///
/// Fewer than three points give a zero area and no polygon.
pub fn measure_loop(points: &[Vec3], scale_factor: f32, eye: Vec3) -> LoopArea {
    let mut outline = points;
    if let [first, .., last] = points {
        if points.len() > 3 && first.distance_squared(*last) < 1e-12 {
            outline = &points[..points.len() - 1];
        }
    }

    if outline.len() < 3 {
        let centroid = if outline.is_empty() {
            Vec3::ZERO
        } else {
            outline.iter().copied().sum::<Vec3>() / outline.len() as f32
        };
        return LoopArea {
            area: 0.0,
            centroid,
            normal: Vec3::ZERO,
            polygon: Vec::new(),
        };
    }

    let centroid = outline.iter().copied().sum::<Vec3>() / outline.len() as f32;
    let mut normal = newell_normal(outline);
    if normal.dot(eye - centroid) < 0.0 {
        normal = -normal;
    }
    let polygon = flatten_to_plane(outline, centroid, normal);
    let area = signed_area(&polygon).abs() * scale_factor * scale_factor;

    LoopArea {
        area,
        centroid,
        normal,
        polygon,
    }
}
