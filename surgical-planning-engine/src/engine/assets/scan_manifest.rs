use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Scan description written by the ingestion pipeline next to the converted model.
/// Loaded as a Bevy asset from `*.scan.json`.
#[derive(Asset, Debug, Clone, Serialize, Deserialize, TypePath, Resource)]
pub struct ScanManifest {
    pub title: String,
    /// glTF/GLB file, relative to the manifest's directory.
    pub model: String,
    /// Millimetres per scene unit, when the scan was captured calibrated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_factor: Option<f32>,
}

impl ScanManifest {
    /// Model path relative to the asset root.
    pub fn model_path(&self, manifest_path: &str) -> String {
        match manifest_path.rsplit_once('/') {
            Some((directory, _)) if !self.model.starts_with('/') => {
                format!("{}/{}", directory, self.model)
            }
            _ => self.model.trim_start_matches('/').to_string(),
        }
    }
}
