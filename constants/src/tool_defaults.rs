// Marker colour presets, sRGB. The first entry is the default.
pub const MARKER_COLOUR_PRESETS: [[f32; 3]; 10] = [
    [0.612, 0.153, 0.690], // #9C27B0
    [0.914, 0.118, 0.388], // #E91E63
    [0.129, 0.588, 0.953], // #2196F3
    [0.298, 0.686, 0.314], // #4CAF50
    [1.000, 0.596, 0.000], // #FF9800
    [0.957, 0.263, 0.212], // #F44336
    [0.000, 0.737, 0.831], // #00BCD4
    [1.000, 0.922, 0.231], // #FFEB3B
    [1.000, 1.000, 1.000], // #FFFFFF
    [0.000, 0.000, 0.000], // #000000
];

/// Tube radius as a fraction of the current zoom.
pub const DEFAULT_LINE_WIDTH: f32 = 0.003;
pub const MIN_LINE_WIDTH: f32 = 0.002;
pub const MAX_LINE_WIDTH: f32 = 0.012;

pub const DEFAULT_OPACITY: f32 = 0.95;
pub const MIN_OPACITY: f32 = 0.3;
pub const MAX_OPACITY: f32 = 1.0;

/// Lift along the surface normal, as a fraction of the current zoom.
pub const DEFAULT_SURFACE_OFFSET_FACTOR: f32 = 0.0001;
pub const MIN_SURFACE_OFFSET_FACTOR: f32 = 0.00001;
pub const MAX_SURFACE_OFFSET_FACTOR: f32 = 0.001;

/// Eraser reach as a fraction of the current zoom.
pub const DEFAULT_ERASER_RADIUS: f32 = 0.05;
pub const MIN_ERASER_RADIUS: f32 = 0.02;
pub const MAX_ERASER_RADIUS: f32 = 0.15;

/// Stroke endpoints closer than this fraction of the zoom close the loop.
pub const LOOP_CLOSURE_FRACTION: f32 = 0.05;
pub const LOOP_MIN_POINTS: usize = 10;

/// Angle clicks closer than this fraction of the zoom to the previous click are dropped.
pub const ANGLE_DOUBLE_TAP_FRACTION: f32 = 0.01;

/// Pointer moves are sampled at most once per interval while drawing or erasing.
pub const POINTER_MOVE_INTERVAL_SECS: f64 = 0.016;

/// Minimum brush sample spacing as a fraction of the zoom.
pub const BRUSH_MIN_STEP_FRACTION: f32 = 0.001;

/// Intermediate surface samples between consecutive brush samples.
pub const BRUSH_SEGMENT_STEPS: usize = 2;

/// Surface samples along a clicked line or measurement edge.
pub const SURFACE_LINE_STEPS: usize = 30;

/// Lifetime of click markers once a measurement completes.
pub const TRANSIENT_MARKER_LIFETIME_SECS: f64 = 3.0;

/// Second press of the clear shortcut must land inside this window.
pub const CLEAR_CONFIRM_WINDOW_SECS: f64 = 2.0;

/// Taps longer than this are treated as a press, not a click.
pub const TOUCH_TAP_MAX_SECS: f64 = 0.5;

/// Zoom used before a model is loaded.
pub const DEFAULT_ZOOM: f32 = 300.0;

/// Zoom is this multiple of the largest model extent.
pub const ZOOM_PER_MODEL_EXTENT: f32 = 2.0;

/// Millimetres per scene unit before calibration.
pub const DEFAULT_SCALE_FACTOR: f32 = 1.0;
