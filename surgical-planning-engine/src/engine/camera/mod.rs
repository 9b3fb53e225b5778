//! Viewport camera and the per-frame view used for picking.
//!
//! Provides orbit camera controls gated by the active tool, and a
//! `ViewProjection` snapshot for screen/world conversions in tools and labels.

/// Screen/world conversion snapshot refreshed every frame.
pub mod view_projection;

/// Viewport camera resource and controller system for scene navigation.
pub mod viewport_camera;
