use crate::engine::camera::view_projection::ViewProjection;
use crate::engine::surface::raycast::{SurfaceMesh, SurfaceOffset};
use bevy::prelude::*;

/// Land a single world position on the surface as seen from the camera.
///
/// The ray runs from the eye through `point`, so an already lifted point is
/// re-snapped to the face behind it.
pub fn snap_to_surface(
    surface: &SurfaceMesh,
    view: &ViewProjection,
    point: Vec3,
    offset: SurfaceOffset,
) -> Option<Vec3> {
    let ray = view.ray_towards(point)?;
    surface.cast_ray(ray).map(|hit| offset.apply(&hit))
}

/// Project the straight segment `from → to` onto the surface.
///
/// Returns `steps + 1` points. Samples whose ray misses the mesh keep the raw
/// interpolated position so the path stays continuous across holes.
pub fn project_surface_path(
    surface: &SurfaceMesh,
    view: &ViewProjection,
    from: Vec3,
    to: Vec3,
    steps: usize,
    offset: SurfaceOffset,
) -> Vec<Vec3> {
    if steps == 0 {
        return vec![snap_to_surface(surface, view, from, offset).unwrap_or(from)];
    }

    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            let raw = from.lerp(to, t);
            snap_to_surface(surface, view, raw, offset).unwrap_or(raw)
        })
        .collect()
}
