//! Shared fixtures: a flat square of scan surface facing a perspective camera.

use crate::engine::camera::view_projection::ViewProjection;
use crate::engine::surface::raycast::{SurfaceMesh, SurfaceOffset};
use crate::tools::context::ToolContext;
use crate::tools::settings::{SceneScale, ToolSettings};
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_4;

pub const TEST_ZOOM: f32 = 4.0;
pub const SURFACE_HALF_EXTENT: f32 = 2.0;

/// Square of side 4 in the z = 0 plane, facing +Z.
pub fn flat_surface() -> SurfaceMesh {
    let h = SURFACE_HALF_EXTENT;
    SurfaceMesh::from_triangles([
        [
            Vec3::new(-h, -h, 0.0),
            Vec3::new(h, -h, 0.0),
            Vec3::new(h, h, 0.0),
        ],
        [
            Vec3::new(-h, -h, 0.0),
            Vec3::new(h, h, 0.0),
            Vec3::new(-h, h, 0.0),
        ],
    ])
}

fn view_from(eye: Vec3) -> ViewProjection {
    ViewProjection::new(
        Transform::from_translation(eye)
            .looking_at(Vec3::ZERO, Vec3::Y)
            .compute_matrix(),
        Mat4::perspective_infinite_reverse_rh(FRAC_PI_4, 1.0, 0.1),
        Rect::new(0.0, 0.0, 800.0, 800.0),
    )
}

/// Camera on +Z looking at the origin over an 800x800 viewport.
pub fn front_view() -> ViewProjection {
    view_from(Vec3::new(0.0, 0.0, 5.0))
}

/// Same target seen from an oblique position.
pub fn orbited_view() -> ViewProjection {
    view_from(Vec3::new(2.0, -1.5, 4.0))
}

pub fn test_offset() -> SurfaceOffset {
    SurfaceOffset {
        current_zoom: TEST_ZOOM,
        offset_factor: ToolSettings::default().surface_offset_factor,
    }
}

pub struct TestScene {
    pub surface: SurfaceMesh,
    pub view: ViewProjection,
    pub settings: ToolSettings,
    pub scale: SceneScale,
}

impl TestScene {
    pub fn new() -> Self {
        Self {
            surface: flat_surface(),
            view: front_view(),
            settings: ToolSettings::default(),
            scale: SceneScale::new(TEST_ZOOM, 1.0),
        }
    }

    pub fn ctx(&self, now: f64) -> ToolContext<'_> {
        ToolContext {
            surface: &self.surface,
            view: &self.view,
            settings: &self.settings,
            scale: &self.scale,
            now,
        }
    }

    /// Screen position of a world point.
    pub fn screen(&self, world: Vec3) -> Vec2 {
        self.view.world_to_screen(world).unwrap_or(Vec2::ZERO)
    }
}
