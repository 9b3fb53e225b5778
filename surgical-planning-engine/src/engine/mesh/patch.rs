use crate::engine::mesh::geometry::GeometryBuffers;
use bevy::prelude::*;

/// Rotation that maps `normal` onto +Z, identity for a zero normal.
pub fn plane_rotation(normal: Vec3) -> Quat {
    let normal = normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(normal, Vec3::Z)
    }
}

/// Flatten points into the plane through `origin` with the given normal.
pub fn flatten_to_plane(points: &[Vec3], origin: Vec3, normal: Vec3) -> Vec<Vec2> {
    let rotation = plane_rotation(normal);
    points
        .iter()
        .map(|p| (rotation * (*p - origin)).truncate())
        .collect()
}

/// Signed shoelace area, positive for counter-clockwise polygons.
pub fn signed_area(polygon: &[Vec2]) -> f32 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f32 = (0..n)
        .map(|i| {
            let a = polygon[i];
            let b = polygon[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice * 0.5
}

/// Triangulate a simple polygon by ear clipping. Falls back to a fan over the
/// remaining vertices when no ear can be found, e.g. for self-intersecting input.
pub fn triangulate_polygon(polygon: &[Vec2]) -> Vec<[u32; 3]> {
    if polygon.len() < 3 {
        return Vec::new();
    }

    let mut remaining: Vec<usize> = (0..polygon.len()).collect();
    if signed_area(polygon) < 0.0 {
        remaining.reverse();
    }

    let mut triangles = Vec::with_capacity(polygon.len() - 2);
    while remaining.len() > 3 {
        let n = remaining.len();
        let ear = (0..n).find(|&i| {
            let prev = remaining[(i + n - 1) % n];
            let cur = remaining[i];
            let next = remaining[(i + 1) % n];
            is_ear(polygon, &remaining, prev, cur, next)
        });

        match ear {
            Some(i) => {
                let prev = remaining[(i + n - 1) % n];
                let next = remaining[(i + 1) % n];
                triangles.push([prev as u32, remaining[i] as u32, next as u32]);
                remaining.remove(i);
            }
            None => break,
        }
    }

    for i in 1..remaining.len().saturating_sub(1) {
        triangles.push([
            remaining[0] as u32,
            remaining[i] as u32,
            remaining[i + 1] as u32,
        ]);
    }
    triangles
}

fn is_ear(polygon: &[Vec2], remaining: &[usize], prev: usize, cur: usize, next: usize) -> bool {
    let (a, b, c) = (polygon[prev], polygon[cur], polygon[next]);
    if (b - a).perp_dot(c - b) <= f32::EPSILON {
        return false;
    }
    remaining
        .iter()
        .filter(|&&i| i != prev && i != cur && i != next)
        .all(|&i| !point_in_triangle(polygon[i], a, b, c))
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = (b - a).perp_dot(p - a);
    let d2 = (c - b).perp_dot(p - b);
    let d3 = (a - c).perp_dot(p - c);
    d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0
}

/// Build a flat fill over a closed outline lying roughly in the plane of `normal`.
///
/// A trailing point that repeats the first is dropped. Triangles are wound so
/// their face normal agrees with `normal`.
pub fn build_patch(outline: &[Vec3], normal: Vec3) -> GeometryBuffers {
    let mut outline = outline.to_vec();
    if outline.len() > 3 {
        if let (Some(first), Some(last)) = (outline.first(), outline.last()) {
            if first.distance_squared(*last) < 1e-12 {
                outline.pop();
            }
        }
    }
    if outline.len() < 3 {
        return GeometryBuffers::default();
    }

    let origin = outline.iter().copied().sum::<Vec3>() / outline.len() as f32;
    let polygon = flatten_to_plane(&outline, origin, normal);
    let normal = normal.normalize_or_zero();

    GeometryBuffers {
        normals: vec![normal; outline.len()],
        positions: outline,
        indices: triangulate_polygon(&polygon).into_iter().flatten().collect(),
    }
}
