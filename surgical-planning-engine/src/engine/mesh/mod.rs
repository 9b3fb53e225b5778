//! CPU-side geometry for drawn objects.
//!
//! Builds world-space vertex and index buffers for surface-following tubes
//! and flat fill patches, then hands them to Bevy as triangle-list meshes.

/// Shared vertex/index buffer type and conversion to a Bevy mesh.
pub mod geometry;

/// Ear-clipping triangulation of closed loops projected onto their best-fit plane.
///
/// Produces the translucent fill shown inside a closed brush stroke.
pub mod patch;

/// Catmull-Rom tube generation with parallel-transport frames.
pub mod tube;
