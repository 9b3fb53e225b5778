use crate::engine::camera::view_projection::ViewProjection;
use crate::engine::surface::raycast::SurfaceMesh;
use crate::tools::settings::{SceneScale, ToolSettings};
use crate::tools::tool_manager::{ToolManager, ToolType};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use constants::render_settings::ERASER_CURSOR_COLOUR;

#[derive(Component)]
pub struct EraserCursorGizmo;

/// Unit sphere scaled to the eraser radius each frame.
pub fn create_eraser_cursor(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: ERASER_CURSOR_COLOUR,
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        })),
        Transform::default(),
        Visibility::Hidden,
        EraserCursorGizmo,
    ));
}

pub fn update_eraser_cursor(
    mut gizmo_query: Query<(&mut Transform, &mut Visibility), With<EraserCursorGizmo>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    tool_manager: Res<ToolManager>,
    surface: Res<SurfaceMesh>,
    view: Option<Res<ViewProjection>>,
    settings: Res<ToolSettings>,
    scale: Res<SceneScale>,
) {
    let Ok((mut gizmo_transform, mut gizmo_visibility)) = gizmo_query.single_mut() else {
        return;
    };

    let hit = view.filter(|_| tool_manager.is_tool_active(ToolType::Eraser)).and_then(|view| {
        let cursor = windows.single().ok()?.cursor_position()?;
        surface.cast_ray(view.ray_from_screen(cursor)?)
    });

    match hit {
        Some(hit) => {
            gizmo_transform.translation = hit.point;
            gizmo_transform.scale = Vec3::splat(scale.relative(settings.eraser_radius));
            *gizmo_visibility = Visibility::Visible;
        }
        None => *gizmo_visibility = Visibility::Hidden,
    }
}
