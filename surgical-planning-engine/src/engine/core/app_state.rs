use crate::engine::loading::progress::LoadingProgress;
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::tool_manager::ToolManager;
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum AppState {
    #[default]
    Loading,
    Running,
}

// Final transition to running state
pub fn transition_to_running(
    loading_progress: Res<LoadingProgress>,
    tool_manager: Res<ToolManager>,
    mut next_state: ResMut<NextState<AppState>>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    if loading_progress.surface_ready {
        info!("→ Surface ready, transitioning to Running state");
        next_state.set(AppState::Running);
        rpc_interface.send_notification("tool_state_changed", tool_manager.state_json());
    }
}
