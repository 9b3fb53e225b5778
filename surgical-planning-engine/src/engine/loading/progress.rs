use bevy::prelude::*;

#[derive(Resource, Default, Debug)]
pub struct LoadingProgress {
    pub manifest_loaded: bool,
    pub scene_spawned: bool,
    pub surface_ready: bool,
    pub failed: bool,
}
