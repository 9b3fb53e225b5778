//! Surface queries against the loaded scan.
//!
//! The scan's triangles are copied once into a ray-castable soup; every tool
//! picks points and projects paths through it.

/// Screen-to-surface path projection with an outward offset.
pub mod path;

/// Triangle soup with per-part bounds and nearest-hit ray casting.
pub mod raycast;
