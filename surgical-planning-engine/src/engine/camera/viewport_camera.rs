use crate::tools::tool_manager::ToolManager;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::math::EulerRot;
use bevy::prelude::*;

const ORBIT_SENSITIVITY: f32 = 0.005;
const PITCH_LIMIT: f32 = 1.55;
const DOLLY_PER_LINE: f32 = 0.1;
const FRAMING_DISTANCE: f32 = 2.5;

/// Orbit camera around a focus point.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ViewportCamera {
    pub focus_point: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ViewportCamera {
    fn default() -> Self {
        Self {
            focus_point: Vec3::ZERO,
            distance: 5.0,
            yaw: 0.0,
            pitch: -0.3,
            min_distance: 0.05,
            max_distance: 100.0,
        }
    }
}

impl ViewportCamera {
    /// Frame a model whose bounding box spans `min..max`.
    pub fn with_bounds(min: Vec3, max: Vec3) -> Self {
        let radius = ((max - min).length() * 0.5).max(f32::EPSILON);
        Self {
            focus_point: (min + max) * 0.5,
            distance: radius * FRAMING_DISTANCE,
            min_distance: radius * 0.05,
            max_distance: radius * 20.0,
            ..default()
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn eye(&self) -> Vec3 {
        self.focus_point + self.rotation() * Vec3::Z * self.distance
    }

    pub fn target_transform(&self) -> Transform {
        Transform::from_translation(self.eye()).with_rotation(self.rotation())
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * ORBIT_SENSITIVITY;
        self.pitch = (self.pitch - delta.y * ORBIT_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Move the focus point in the view plane, scaled so the model tracks the pointer.
    pub fn pan(&mut self, delta: Vec2, viewport_height: f32) {
        let world_per_pixel = self.distance / viewport_height.max(1.0);
        let rotation = self.rotation();
        let right = rotation * Vec3::X;
        let up = rotation * Vec3::Y;
        self.focus_point += (-right * delta.x + up * delta.y) * world_per_pixel;
    }

    /// Positive scroll moves towards the focus point.
    pub fn dolly(&mut self, scroll_lines: f32) {
        let factor = (1.0 - scroll_lines * DOLLY_PER_LINE).max(0.1);
        self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
    }
}

/// Orbit, pan and zoom while the view tool is active and no label is dragged.
pub fn camera_controller(
    mut camera_query: Query<(&mut Transform, &Camera), With<Camera3d>>,
    mut viewport_camera: ResMut<ViewportCamera>,
    tool_manager: Res<ToolManager>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut scroll_events: EventReader<MouseWheel>,
    time: Res<Time>,
) {
    let Ok((mut camera_transform, camera)) = camera_query.single_mut() else {
        return;
    };

    let mouse_delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    let scroll: f32 = scroll_events
        .read()
        .map(|ev| match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y * 0.05,
        })
        .sum();

    if tool_manager.camera_orbit_enabled() {
        if mouse_button.pressed(MouseButton::Left) && mouse_delta != Vec2::ZERO {
            viewport_camera.orbit(mouse_delta);
        }
        if mouse_button.pressed(MouseButton::Right) && mouse_delta != Vec2::ZERO {
            let height = camera
                .logical_viewport_size()
                .map(|size| size.y)
                .unwrap_or(1.0);
            viewport_camera.pan(mouse_delta, height);
        }
        if let Some(touch) = touches.iter().next() {
            viewport_camera.orbit(touch.delta());
        }
        if scroll.abs() > f32::EPSILON {
            viewport_camera.dolly(scroll);
        }
    }

    let target = viewport_camera.target_transform();
    let lerp_speed = (12.0 * time.delta_secs()).min(1.0);
    camera_transform.translation = camera_transform
        .translation
        .lerp(target.translation, lerp_speed);
    camera_transform.rotation = camera_transform.rotation.slerp(target.rotation, lerp_speed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_centres_on_bounds() {
        let camera = ViewportCamera::with_bounds(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
        assert_eq!(camera.focus_point, Vec3::new(0.0, 1.0, 0.0));
        assert!((camera.eye().distance(camera.focus_point) - camera.distance).abs() < 1e-4);
    }

    #[test]
    fn eye_looks_at_focus() {
        let mut camera = ViewportCamera::default();
        camera.orbit(Vec2::new(120.0, -40.0));
        let transform = camera.target_transform();
        let towards_focus = (camera.focus_point - transform.translation).normalize();
        assert!(transform.forward().dot(towards_focus) > 0.999);
    }

    #[test]
    fn pitch_and_distance_are_clamped() {
        let mut camera = ViewportCamera::default();
        camera.orbit(Vec2::new(0.0, -10_000.0));
        assert_eq!(camera.pitch, PITCH_LIMIT);
        // One scroll zooms in at most tenfold.
        camera.dolly(1_000.0);
        assert!((camera.distance - 0.5).abs() < 1e-5);
        for _ in 0..3 {
            camera.dolly(1_000.0);
        }
        assert_eq!(camera.distance, camera.min_distance);
        camera.dolly(-1_000.0);
        assert_eq!(camera.distance, camera.max_distance);
    }
}
