use bevy::prelude::*;

/// Per-frame snapshot of the camera used for every screen/world conversion.
///
/// Screen positions are logical pixels with the origin at the top-left of the
/// window, matching `Window::cursor_position` and UI node placement.
#[derive(Resource, Debug, Clone, Copy)]
pub struct ViewProjection {
    world_from_view: Mat4,
    clip_from_view: Mat4,
    clip_from_world: Mat4,
    world_from_clip: Mat4,
    viewport: Rect,
}

impl ViewProjection {
    pub fn new(world_from_view: Mat4, clip_from_view: Mat4, viewport: Rect) -> Self {
        let clip_from_world = clip_from_view * world_from_view.inverse();
        Self {
            world_from_view,
            clip_from_view,
            clip_from_world,
            world_from_clip: clip_from_world.inverse(),
            viewport,
        }
    }

    /// Capture the current state of a camera. `None` until the camera has a viewport.
    pub fn from_camera(camera: &Camera, transform: &Transform) -> Option<Self> {
        let viewport = camera.logical_viewport_rect()?;
        if viewport.width() <= 0.0 || viewport.height() <= 0.0 {
            return None;
        }
        Some(Self::new(
            transform.compute_matrix(),
            camera.clip_from_view(),
            viewport,
        ))
    }

    pub fn camera_position(&self) -> Vec3 {
        self.world_from_view.w_axis.truncate()
    }

    pub fn clip_from_view(&self) -> Mat4 {
        self.clip_from_view
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn screen_to_ndc(&self, screen: Vec2) -> Vec2 {
        let size = self.viewport.size();
        let local = (screen - self.viewport.min) / size;
        Vec2::new(local.x * 2.0 - 1.0, 1.0 - local.y * 2.0)
    }

    pub fn ndc_to_screen(&self, ndc: Vec2) -> Vec2 {
        let size = self.viewport.size();
        let local = Vec2::new((ndc.x + 1.0) * 0.5, (1.0 - ndc.y) * 0.5);
        self.viewport.min + local * size
    }

    /// Ray from the eye through a screen position.
    pub fn ray_from_screen(&self, screen: Vec2) -> Option<Ray3d> {
        let ndc = self.screen_to_ndc(screen);
        // Two depths that stay finite under Bevy's reverse-Z infinite projection.
        let near = self.world_from_clip.project_point3(ndc.extend(1.0));
        let mid = self.world_from_clip.project_point3(ndc.extend(0.5));
        let direction = Dir3::new(mid - near).ok()?;
        near.is_finite().then(|| Ray3d::new(near, direction))
    }

    /// Ray from the eye towards a world position.
    pub fn ray_towards(&self, target: Vec3) -> Option<Ray3d> {
        let origin = self.camera_position();
        let direction = Dir3::new(target - origin).ok()?;
        Some(Ray3d::new(origin, direction))
    }

    /// Project a world position to the screen. `None` when it is behind the eye.
    pub fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.clip_from_world * world.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(self.ndc_to_screen(ndc.truncate()))
    }
}

/// Refresh the shared view after the camera has moved.
pub fn update_view_projection(
    mut commands: Commands,
    camera_query: Query<(&Camera, &Transform), With<Camera3d>>,
    view: Option<ResMut<ViewProjection>>,
) {
    let Ok((camera, transform)) = camera_query.single() else {
        return;
    };
    let Some(current) = ViewProjection::from_camera(camera, transform) else {
        return;
    };
    match view {
        Some(mut view) => *view = current,
        None => commands.insert_resource(current),
    }
}
