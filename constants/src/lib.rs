//! Shared tuning constants for the surgical planning engine.
//!
//! Every empirically chosen threshold lives here so that the runtime
//! `ToolSettings` resource and the tests agree on the same defaults.

/// Default tool settings and the ranges the settings panel clamps into.
pub mod tool_defaults;

/// Geometry sizes, colours and overlay dimensions used when drawing.
pub mod render_settings;

/// Asset paths resolved relative to the Bevy asset root.
pub mod path;
