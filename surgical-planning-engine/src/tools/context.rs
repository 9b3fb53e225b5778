use crate::engine::camera::view_projection::ViewProjection;
use crate::engine::surface::path::project_surface_path;
use crate::engine::surface::raycast::{SurfaceHit, SurfaceMesh, SurfaceOffset};
use crate::tools::registry::{AnnotationId, MarkStyle, MeasurementId, ObjectId, Removal};
use crate::tools::settings::{SceneScale, ToolSettings};
use bevy::prelude::*;

/// Read-only view of the world handed to every tool handler.
///
/// Handlers never touch the ECS directly, which keeps them callable from
/// tests with a hand-built surface and camera.
#[derive(Clone, Copy)]
pub struct ToolContext<'a> {
    pub surface: &'a SurfaceMesh,
    pub view: &'a ViewProjection,
    pub settings: &'a ToolSettings,
    pub scale: &'a SceneScale,
    /// Seconds since startup.
    pub now: f64,
}

impl ToolContext<'_> {
    pub fn offset(&self) -> SurfaceOffset {
        SurfaceOffset {
            current_zoom: self.scale.current_zoom,
            offset_factor: self.settings.surface_offset_factor,
        }
    }

    /// Surface under a screen position.
    pub fn pick(&self, screen: Vec2) -> Option<SurfaceHit> {
        let ray = self.view.ray_from_screen(screen)?;
        self.surface.cast_ray(ray)
    }

    /// Lifted surface point under a screen position.
    pub fn pick_point(&self, screen: Vec2) -> Option<Vec3> {
        self.pick(screen).map(|hit| self.offset().apply(&hit))
    }

    pub fn surface_path(&self, from: Vec3, to: Vec3, steps: usize) -> Vec<Vec3> {
        project_surface_path(self.surface, self.view, from, to, steps, self.offset())
    }

    /// World length for a fraction of the current zoom.
    pub fn relative(&self, fraction: f32) -> f32 {
        self.scale.relative(fraction)
    }

    pub fn stroke_style(&self) -> MarkStyle {
        MarkStyle::new(self.settings.colour, self.settings.opacity)
    }

    pub fn stroke_radius(&self) -> f32 {
        self.relative(self.settings.line_width)
    }
}

/// Something a pointer gesture changed, reported to the host and the log.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    StrokeCommitted(ObjectId),
    MeasurementCompleted(MeasurementId),
    AnnotationCreated(AnnotationId),
    Erased(Vec<Removal>),
    MeasurementRemoved(Removal),
}
