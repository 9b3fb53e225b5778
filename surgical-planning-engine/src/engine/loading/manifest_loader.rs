use crate::engine::assets::scan_manifest::ScanManifest;
use crate::engine::loading::progress::LoadingProgress;
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::settings::SceneScale;
use bevy::asset::LoadState;
use bevy::gltf::GltfAssetLabel;
use bevy::prelude::*;
use constants::path::RELATIVE_MANIFEST_PATH;

/// Root of the spawned scan scene.
#[derive(Component)]
pub struct ScanModel;

#[derive(Resource, Default)]
pub struct ManifestLoader {
    handle: Option<Handle<ScanManifest>>,
}

// Start the loading process
pub fn start_loading(mut manifest_loader: ResMut<ManifestLoader>, asset_server: Res<AssetServer>) {
    info!("Loading scan manifest from {}", RELATIVE_MANIFEST_PATH);
    manifest_loader.handle = Some(asset_server.load(RELATIVE_MANIFEST_PATH));
}

/// Apply the manifest's calibration and spawn the model scene.
pub fn load_manifest_system(
    mut loading_progress: ResMut<LoadingProgress>,
    manifest_loader: Res<ManifestLoader>,
    mut scale: ResMut<SceneScale>,
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    manifests: Res<Assets<ScanManifest>>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    if loading_progress.manifest_loaded || loading_progress.failed {
        return;
    }
    let Some(handle) = manifest_loader.handle.as_ref() else {
        return;
    };

    if let Some(LoadState::Failed(error)) = asset_server.get_load_state(handle) {
        error!("Scan manifest failed to load: {}", error);
        loading_progress.failed = true;
        rpc_interface.send_notification(
            "debug_message",
            serde_json::json!({
                "message": format!("Scan manifest failed to load: {}", error)
            }),
        );
        return;
    }

    let Some(manifest) = manifests.get(handle) else {
        return;
    };
    info!("✓ Scan manifest loaded: {}", manifest.title);

    if let Some(scale_factor) = manifest.scale_factor {
        match scale.set_scale_factor(scale_factor) {
            Ok(()) => info!("Calibration from manifest: {} mm per unit", scale_factor),
            Err(error) => warn!("Ignoring manifest calibration: {}", error),
        }
    }

    let model_path = manifest.model_path(RELATIVE_MANIFEST_PATH);
    debug!("Spawning scan model {}", model_path);
    let scene = asset_server.load(GltfAssetLabel::Scene(0).from_asset(model_path));
    commands.spawn((SceneRoot(scene), ScanModel));
    commands.insert_resource(manifest.clone());
    loading_progress.manifest_loaded = true;
}
