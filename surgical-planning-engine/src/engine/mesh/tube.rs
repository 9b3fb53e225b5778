use crate::engine::mesh::geometry::GeometryBuffers;
use bevy::prelude::*;
use std::f32::consts::TAU;

/// Evaluate a uniform Catmull–Rom spline through `points` at `u` in `[0, 1]`.
///
/// Endpoints are duplicated so the curve starts and ends on the first and last
/// control points.
pub fn catmull_rom_at(points: &[Vec3], u: f32) -> Option<Vec3> {
    let last = points.len().checked_sub(1)?;
    if last == 0 {
        return points.first().copied();
    }

    let scaled = u.clamp(0.0, 1.0) * last as f32;
    let segment = (scaled.floor() as usize).min(last - 1);
    let t = scaled - segment as f32;

    let get = |i: isize| points[i.clamp(0, last as isize) as usize];
    let i = segment as isize;
    Some(catmull_rom(get(i - 1), get(i), get(i + 1), get(i + 2), t))
}

fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    // Tension 0.5.
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Sweep a circle along a smooth curve through `points`.
///
/// `tubular_segments` rings are spread evenly over the curve parameter and
/// framed by parallel transport so the tube does not twist on tight turns.
/// Returns empty buffers for fewer than two distinct points.
pub fn build_tube(
    points: &[Vec3],
    radius: f32,
    tubular_segments: usize,
    radial_segments: usize,
) -> GeometryBuffers {
    let tubular_segments = tubular_segments.max(1);
    let radial_segments = radial_segments.max(3);

    let centres: Vec<Vec3> = (0..=tubular_segments)
        .filter_map(|i| catmull_rom_at(points, i as f32 / tubular_segments as f32))
        .collect();
    let Some(tangents) = curve_tangents(&centres) else {
        return GeometryBuffers::default();
    };

    let mut normal = initial_normal(tangents[0]);
    let mut buffers = GeometryBuffers::default();
    for (i, (centre, tangent)) in centres.iter().zip(&tangents).enumerate() {
        if i > 0 {
            normal = Quat::from_rotation_arc(tangents[i - 1], *tangent) * normal;
        }
        let binormal = tangent.cross(normal).normalize_or_zero();
        for j in 0..=radial_segments {
            let angle = j as f32 / radial_segments as f32 * TAU;
            let direction = normal * angle.cos() + binormal * angle.sin();
            buffers.positions.push(*centre + direction * radius);
            buffers.normals.push(direction);
        }
    }

    let ring = radial_segments as u32 + 1;
    for i in 1..=tubular_segments as u32 {
        for j in 1..=radial_segments as u32 {
            let a = ring * (i - 1) + (j - 1);
            let b = ring * i + (j - 1);
            let c = ring * i + j;
            let d = ring * (i - 1) + j;
            buffers.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    buffers
}

/// Unit tangents for each sample, carrying the previous one across repeats.
fn curve_tangents(centres: &[Vec3]) -> Option<Vec<Vec3>> {
    if centres.len() < 2 {
        return None;
    }

    let raw: Vec<Vec3> = (0..centres.len())
        .map(|i| {
            let prev = centres[i.saturating_sub(1)];
            let next = centres[(i + 1).min(centres.len() - 1)];
            (next - prev).normalize_or_zero()
        })
        .collect();

    let first = raw.iter().copied().find(|t| *t != Vec3::ZERO)?;
    let mut tangents = Vec::with_capacity(raw.len());
    let mut current = first;
    for t in raw {
        if t != Vec3::ZERO {
            current = t;
        }
        tangents.push(current);
    }
    Some(tangents)
}

fn initial_normal(tangent: Vec3) -> Vec3 {
    let abs = tangent.abs();
    let axis = if abs.x <= abs.y && abs.x <= abs.z {
        Vec3::X
    } else if abs.y <= abs.z {
        Vec3::Y
    } else {
        Vec3::Z
    };
    tangent.cross(axis).cross(tangent).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.5, 0.0),
            Vec3::new(2.0, -0.5, 0.2),
            Vec3::new(3.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn spline_passes_through_control_points() {
        let points = zigzag();
        for (i, p) in points.iter().enumerate() {
            let u = i as f32 / (points.len() - 1) as f32;
            assert!((catmull_rom_at(&points, u).unwrap() - *p).length() < 1e-5);
        }
    }

    #[test]
    fn tube_has_ring_per_segment() {
        let points = zigzag();
        let tube = build_tube(&points, 0.1, 8, 8);
        assert_eq!(tube.positions.len(), 9 * 9);
        assert_eq!(tube.normals.len(), tube.positions.len());
        assert_eq!(tube.triangle_count(), 8 * 8 * 2);
        assert!(tube.indices.iter().all(|&i| (i as usize) < tube.positions.len()));
    }

    #[test]
    fn ring_vertices_sit_on_radius() {
        let points = vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0)];
        let tube = build_tube(&points, 0.25, 4, 8);
        for (p, n) in tube.positions.iter().zip(&tube.normals) {
            assert!((Vec2::new(p.x, p.y).length() - 0.25).abs() < 1e-4);
            assert!((n.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn rebuild_is_deterministic() {
        let points = zigzag();
        assert_eq!(build_tube(&points, 0.05, 8, 8), build_tube(&points, 0.05, 8, 8));
    }

    #[test]
    fn degenerate_input_yields_nothing() {
        assert!(build_tube(&[], 0.1, 4, 8).is_empty());
        assert!(build_tube(&[Vec3::ONE], 0.1, 4, 8).is_empty());
        assert!(build_tube(&[Vec3::ONE, Vec3::ONE], 0.1, 4, 8).is_empty());
    }
}
