use crate::engine::assets::scan_manifest::ScanManifest;
use crate::engine::camera::viewport_camera::ViewportCamera;
use crate::engine::loading::manifest_loader::ScanModel;
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::surface::raycast::SurfaceMesh;
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::settings::SceneScale;
use bevy::prelude::*;
use bevy::scene::SceneInstance;

/// Copy every model triangle into the ray-cast surface once the scene is in
/// the world and its transforms have propagated.
pub fn build_surface_when_ready(
    mut loading_progress: ResMut<LoadingProgress>,
    model_query: Query<(Entity, &SceneInstance), With<ScanModel>>,
    scene_spawner: Res<SceneSpawner>,
    children: Query<&Children>,
    mesh_query: Query<(&Mesh3d, &GlobalTransform)>,
    meshes: Res<Assets<Mesh>>,
    manifest: Option<Res<ScanManifest>>,
    mut surface: ResMut<SurfaceMesh>,
    mut scale: ResMut<SceneScale>,
    mut viewport_camera: ResMut<ViewportCamera>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    if loading_progress.surface_ready {
        return;
    }
    let Ok((root, instance)) = model_query.single() else {
        return;
    };
    if !scene_spawner.instance_is_ready(**instance) {
        return;
    }
    // Global transforms of the new scene are written after this frame.
    if !loading_progress.scene_spawned {
        loading_progress.scene_spawned = true;
        return;
    }

    let parts: Vec<_> = children
        .iter_descendants(root)
        .filter_map(|entity| mesh_query.get(entity).ok())
        .collect();
    if parts.iter().any(|(mesh, _)| !meshes.contains(&mesh.0)) {
        return;
    }

    let mut extracted = SurfaceMesh::default();
    for (mesh, transform) in parts {
        if let Some(mesh) = meshes.get(&mesh.0) {
            extracted.push_mesh(mesh, transform);
        }
    }

    let Some((min, max)) = extracted.bounds() else {
        warn!("Scan model has no triangles; nothing can be drawn on it");
        loading_progress.failed = true;
        return;
    };

    scale.current_zoom = SceneScale::zoom_for_bounds(min, max);
    *viewport_camera = ViewportCamera::with_bounds(min, max);
    info!(
        "✓ Surface ready: {} triangles, zoom {:.3}",
        extracted.triangle_count(),
        scale.current_zoom
    );

    rpc_interface.send_notification(
        "model_loaded",
        serde_json::json!({
            "title": manifest.as_ref().map(|m| m.title.clone()),
            "triangles": extracted.triangle_count(),
            "bounds": { "min": min.to_array(), "max": max.to_array() },
            "current_zoom": scale.current_zoom,
            "scale_factor": scale.scale_factor(),
        }),
    );
    *surface = extracted;
    loading_progress.surface_ready = true;
}
