//! Asset loading and initialisation systems for the scanned model.
//!
//! Manages the loading pipeline from manifest parsing through glTF scene
//! spawning to surface extraction, with progress tracking for state transitions.

/// Scan manifest loading and model scene spawning.
pub mod manifest_loader;

/// Loading progress tracking resource for state transitions.
pub mod progress;

/// Ray-castable surface extraction from the spawned model meshes.
///
/// Derives the scene zoom from model bounds and frames the camera.
pub mod surface_builder;
