//! Interactive marking and measurement tools for the scanned surface.
//!
//! Every tool works on surface hits from the raycaster, writes into the
//! shared `ObjectRegistry`, and is coordinated by a single `ToolManager`.
//!
//! ## Tool Manager Architecture
//!
//! The `ToolManager` resource owns the active tool and the interaction session:
//! - Only one tool is active at a time, `view` by default
//! - Selecting the active tool again toggles its settings panel
//! - Any transition discards previews, click markers and half-built angles
//! - Camera orbit is enabled only in `view`, and never while a label is dragged
//!
//! ### Tool Activation Flow
//!
//! ```text
//! Keyboard/RPC Input
//!   └─> ToolSelectionEvent
//!       └─> handle_tool_selection_events()
//!           ├─> Discard interaction session
//!           ├─> Activate requested tool
//!           └─> Send tool_state_changed to frontend
//! ```
//!
//! ### Pointer Flow
//!
//! ```text
//! Mouse/Touch/Window events
//!   └─> collect_pointer_input()  Down / Move / Up / Tap / Cancel
//!       └─> dispatch_pointer_input()
//!           ├─> Label under pointer? drag it, or close its measurement
//!           └─> Active tool handler
//!               └─> ToolOutcome ─> RPC notification
//! ```
//!
//! ## Available Tools
//!
//! ### Brush (`ToolType::Brush`)
//! - Drag to draw a tube that follows the surface
//! - A stroke ending near its start closes into a filled loop with an area measurement
//!
//! ### Eraser (`ToolType::Eraser`)
//! - Drag to remove committed objects within the eraser radius
//! - Objects owned by a measurement or annotation take their owner with them
//!
//! ### Line and Distance (`ToolType::Line`, `ToolType::Distance`)
//! - Two clicks draw a surface-following line
//! - Distance also records the length in millimetres with a floating label
//!
//! ### Angle (`ToolType::Angle`)
//! - Clicks on start, vertex and end; each arm is drawn as soon as it is known
//!
//! ### Annotation (`ToolType::Annotation`)
//! - Click to pin a numbered marker with an editable note
//!
//! ## Cross-Platform Considerations
//!
//! ### Native Builds
//! - Keyboard shortcuts for tools, undo, clear and colour presets
//!
//! ### WASM Builds
//! - All tool control via JSON-RPC 2.0 from the host page

/// Annotation records and placement.
pub mod annotation;

/// Freehand brush strokes and surface lines.
pub mod brush;

/// Closed-loop detection and area measurement.
pub mod closed_loop;

/// Read-only world view passed to tool handlers.
pub mod context;

/// Eraser hit testing with owner cascade.
pub mod eraser;

/// Floating labels: projection, hit testing and dragging.
pub mod labels;

/// Distance and angle measurements.
pub mod measure;

/// Pointer collection and per-tool dispatch.
pub mod pointer;

/// Project snapshot, restore and report listing.
pub mod project;

/// Drawn objects, ownership and undo history.
pub mod registry;

/// Runtime tool settings and calibration.
pub mod settings;

/// Unified tool manager coordinating exclusive tool activation and state.
///
/// Handles tool selection events from keyboard shortcuts and RPC with frontend notifications.
pub mod tool_manager;

#[cfg(test)]
pub mod test_support;
