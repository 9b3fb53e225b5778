use bevy::asset::AssetMetaCheck;
use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;
// Crate engine modules
use crate::engine::assets::scan_manifest::ScanManifest;
use crate::engine::camera::view_projection::update_view_projection;
use crate::engine::camera::viewport_camera::{ViewportCamera, camera_controller};
use crate::engine::core::app_state::{AppState, transition_to_running};
use crate::engine::core::window_config::create_window_config;
use crate::engine::loading::manifest_loader::{ManifestLoader, load_manifest_system, start_loading};
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::loading::surface_builder::build_surface_when_ready;
use crate::engine::render::drawn_objects::{RenderedObjects, sync_drawn_objects};
use crate::engine::render::hud::{spawn_hud, update_hud};
use crate::engine::render::label_overlay::{position_label_nodes, sync_label_nodes};
use crate::engine::scene::gizmos::{create_eraser_cursor, update_eraser_cursor};
use crate::engine::surface::raycast::SurfaceMesh;
// Crate tools modules
use crate::tools::{
    labels::{LabelLayout, reproject_labels},
    pointer::{PointerInput, collect_pointer_input, dispatch_pointer_input},
    registry::ObjectRegistry,
    settings::{SceneScale, ToolSettings},
    tool_manager::{
        ClearToolEvent, HistoryActionEvent, ToolManager, ToolSelectionEvent,
        expire_transient_markers, handle_clear_tool_events, handle_history_events,
        handle_tool_keyboard_shortcuts, handle_tool_selection_events,
    },
};
// Create Web RPC modules
use crate::rpc::web_rpc::WebRpcPlugin;

#[cfg(not(target_arch = "wasm32"))]
use crate::tools::tool_manager::clear_tool_on_escape;

const LOG_FILTER: &str = "wgpu=error,naga=warn,bevy_render=info,surgical_planning_engine=debug";

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .init_state::<AppState>()
        // Registers ScanManifest as a loadable asset type from JSON files.
        .add_plugins(JsonAssetPlugin::<ScanManifest>::new(&["scan.json"]))
        .add_plugins(WebRpcPlugin)
        .insert_resource(ClearColor(Color::srgb(0.12, 0.12, 0.14)))
        .insert_resource(AmbientLight {
            brightness: 400.0,
            ..default()
        });

    // Initialise resources early
    app.init_resource::<LoadingProgress>()
        .init_resource::<ManifestLoader>()
        .init_resource::<SurfaceMesh>()
        .init_resource::<SceneScale>()
        .init_resource::<ViewportCamera>()
        .init_resource::<ToolSettings>()
        .init_resource::<ToolManager>()
        .init_resource::<ObjectRegistry>()
        .init_resource::<LabelLayout>()
        .init_resource::<RenderedObjects>()
        .add_event::<ToolSelectionEvent>()
        .add_event::<ClearToolEvent>()
        .add_event::<HistoryActionEvent>()
        .add_event::<PointerInput>();

    // State-based system scheduling
    app.add_systems(Startup, (setup, start_loading).chain())
        .add_systems(
            Update,
            (
                // Loading phase systems
                load_manifest_system,
                build_surface_when_ready,
                transition_to_running,
            )
                .chain()
                .run_if(in_state(AppState::Loading)),
        );

    // Tool state changes land before pointer handling in the same frame.
    let tool_systems = (
        handle_tool_keyboard_shortcuts, // Native shortcuts or no-op for WASM
        handle_clear_tool_events,
        handle_tool_selection_events,
        handle_history_events,
        collect_pointer_input,
        dispatch_pointer_input,
        expire_transient_markers,
    )
        .chain();

    // View follows the camera, then everything screen-space is re-derived.
    let view_systems = (
        camera_controller,
        update_view_projection,
        reproject_labels,
        sync_drawn_objects,
        sync_label_nodes,
        position_label_nodes,
        update_hud,
        update_eraser_cursor,
    )
        .chain();

    app.add_systems(
        Update,
        (tool_systems, view_systems)
            .chain()
            .run_if(in_state(AppState::Running)),
    );

    #[cfg(not(target_arch = "wasm32"))]
    {
        app.add_systems(
            Update,
            clear_tool_on_escape
                .before(handle_clear_tool_events)
                .run_if(in_state(AppState::Running)),
        );
    }

    app
}

fn spawn_lighting(commands: &mut Commands) {
    commands.spawn((
        DirectionalLight {
            shadows_enabled: false,
            illuminance: 8_000.0,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
}

fn spawn_camera(commands: &mut Commands, viewport_camera: &ViewportCamera) {
    commands.spawn((Camera3d::default(), viewport_camera.target_transform()));
}

// Startup system that only handles basic initialisation
fn setup(
    mut commands: Commands,
    viewport_camera: Res<ViewportCamera>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    spawn_lighting(&mut commands);
    spawn_camera(&mut commands, &viewport_camera);
    spawn_hud(&mut commands);
    create_eraser_cursor(&mut commands, &mut meshes, &mut materials);
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    let log_config = LogPlugin {
        level: Level::INFO,
        filter: LOG_FILTER.to_string(),
        ..default()
    };

    DefaultPlugins
        .set(window_config)
        .set(asset_config)
        .set(log_config)
}
