use bevy::color::Color;

pub const TUBE_RADIAL_SEGMENTS: usize = 8;
pub const TUBE_SEGMENTS_PER_POINT: usize = 2;

// Marker radii as fractions of the current zoom.
pub const MEASURE_MARKER_RADIUS: f32 = 0.002;
pub const ANGLE_VERTEX_MARKER_RADIUS: f32 = 0.003;
pub const ANNOTATION_MARKER_RADIUS: f32 = 0.003;

pub const MEASURE_MARKER_COLOUR: [f32; 3] = [1.0, 0.0, 0.0];
pub const ANGLE_START_COLOUR: [f32; 3] = [0.0, 1.0, 0.0];
pub const ANGLE_VERTEX_COLOUR: [f32; 3] = [1.0, 0.0, 0.0];
pub const ANGLE_END_COLOUR: [f32; 3] = [0.0, 0.0, 1.0];
pub const MARKER_OPACITY: f32 = 1.0;

/// Closed-loop fill patch opacity.
pub const FILL_OPACITY: f32 = 0.35;

/// Fill patch lift along the loop normal, as a fraction of the zoom.
pub const FILL_LIFT_FRACTION: f32 = 0.0005;

pub const ERASER_CURSOR_COLOUR: Color = Color::srgba(1.0, 0.322, 0.322, 0.3);

// Floating label overlay, logical pixels.
pub const LABEL_WIDTH: f32 = 120.0;
pub const LABEL_HEIGHT: f32 = 28.0;
pub const LABEL_CLOSE_SIZE: f32 = 14.0;
pub const LABEL_FONT_SIZE: f32 = 13.0;
pub const LABEL_BACKGROUND: Color = Color::srgba(0.08, 0.08, 0.1, 0.85);
pub const LABEL_TEXT_COLOUR: Color = Color::WHITE;
pub const HUD_FONT_SIZE: f32 = 15.0;
