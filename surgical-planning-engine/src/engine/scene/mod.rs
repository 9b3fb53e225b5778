//! Cursor feedback drawn into the 3D scene.

/// Eraser reach indicator following the pointer over the surface.
///
/// Visible only while the eraser tool is active and the pointer is over the model.
pub mod gizmos;
