//! Rendering of registry contents and screen-space overlays.
//!
//! Keeps Bevy entities in step with the `ObjectRegistry` and places label
//! and HUD nodes over the viewport each frame.

/// Mesh entities for drawn objects, created and disposed with registry entries.
///
/// Removal despawns the entity and drops its mesh and material assets together.
pub mod drawn_objects;

/// Tool title, hint and measurement readout.
pub mod hud;

/// Floating measurement and annotation labels positioned from the label layout.
pub mod label_overlay;
