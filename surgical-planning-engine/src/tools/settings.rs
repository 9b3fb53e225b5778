use bevy::prelude::*;
use constants::tool_defaults::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-adjustable drawing settings. Read when an object is created; never
/// applied retroactively.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// sRGB marker colour.
    pub colour: [f32; 3],
    /// Tube radius as a fraction of the current zoom.
    pub line_width: f32,
    pub opacity: f32,
    pub surface_offset_factor: f32,
    /// Eraser reach as a fraction of the current zoom.
    pub eraser_radius: f32,
    pub auto_detect_closed_loop: bool,
    pub loop_closure_fraction: f32,
    pub angle_double_tap_fraction: f32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            colour: MARKER_COLOUR_PRESETS[0],
            line_width: DEFAULT_LINE_WIDTH,
            opacity: DEFAULT_OPACITY,
            surface_offset_factor: DEFAULT_SURFACE_OFFSET_FACTOR,
            eraser_radius: DEFAULT_ERASER_RADIUS,
            auto_detect_closed_loop: true,
            loop_closure_fraction: LOOP_CLOSURE_FRACTION,
            angle_double_tap_fraction: ANGLE_DOUBLE_TAP_FRACTION,
        }
    }
}

/// Partial settings update, as sent by the host panel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolSettingsPatch {
    pub colour: Option<[f32; 3]>,
    pub line_width: Option<f32>,
    pub opacity: Option<f32>,
    pub surface_offset_factor: Option<f32>,
    pub eraser_radius: Option<f32>,
    pub auto_detect_closed_loop: Option<bool>,
    pub loop_closure_fraction: Option<f32>,
    pub angle_double_tap_fraction: Option<f32>,
}

impl ToolSettings {
    pub fn set_colour(&mut self, colour: [f32; 3]) {
        self.colour = colour.map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 });
    }

    pub fn set_preset(&mut self, index: usize) -> bool {
        match MARKER_COLOUR_PRESETS.get(index) {
            Some(colour) => {
                self.colour = *colour;
                true
            }
            None => false,
        }
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = clamp_finite(width, MIN_LINE_WIDTH, MAX_LINE_WIDTH, self.line_width);
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = clamp_finite(opacity, MIN_OPACITY, MAX_OPACITY, self.opacity);
    }

    pub fn set_surface_offset_factor(&mut self, factor: f32) {
        self.surface_offset_factor = clamp_finite(
            factor,
            MIN_SURFACE_OFFSET_FACTOR,
            MAX_SURFACE_OFFSET_FACTOR,
            self.surface_offset_factor,
        );
    }

    pub fn set_eraser_radius(&mut self, radius: f32) {
        self.eraser_radius =
            clamp_finite(radius, MIN_ERASER_RADIUS, MAX_ERASER_RADIUS, self.eraser_radius);
    }

    pub fn apply(&mut self, patch: &ToolSettingsPatch) {
        if let Some(colour) = patch.colour {
            self.set_colour(colour);
        }
        if let Some(width) = patch.line_width {
            self.set_line_width(width);
        }
        if let Some(opacity) = patch.opacity {
            self.set_opacity(opacity);
        }
        if let Some(factor) = patch.surface_offset_factor {
            self.set_surface_offset_factor(factor);
        }
        if let Some(radius) = patch.eraser_radius {
            self.set_eraser_radius(radius);
        }
        if let Some(enabled) = patch.auto_detect_closed_loop {
            self.auto_detect_closed_loop = enabled;
        }
        if let Some(fraction) = patch.loop_closure_fraction {
            self.loop_closure_fraction =
                clamp_finite(fraction, 0.0, 1.0, self.loop_closure_fraction);
        }
        if let Some(fraction) = patch.angle_double_tap_fraction {
            self.angle_double_tap_fraction =
                clamp_finite(fraction, 0.0, 1.0, self.angle_double_tap_fraction);
        }
    }
}

fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("virtual distance must be positive, got {0}")]
    InvalidVirtualDistance(f32),

    #[error("real distance must be positive, got {0}")]
    InvalidRealDistance(f32),

    #[error("scale factor must be positive, got {0}")]
    InvalidScaleFactor(f32),
}

/// Scene-wide scale: the zoom that drives every size-relative threshold, and
/// the calibration from scene units to millimetres.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct SceneScale {
    pub current_zoom: f32,
    scale_factor: f32,
}

impl Default for SceneScale {
    fn default() -> Self {
        Self {
            current_zoom: DEFAULT_ZOOM,
            scale_factor: DEFAULT_SCALE_FACTOR,
        }
    }
}

impl SceneScale {
    pub fn new(current_zoom: f32, scale_factor: f32) -> Self {
        Self {
            current_zoom,
            scale_factor,
        }
    }

    /// Zoom for a model whose bounding box spans `min..max`.
    pub fn zoom_for_bounds(min: Vec3, max: Vec3) -> f32 {
        let extent = (max - min).max_element();
        if extent.is_finite() && extent > 0.0 {
            extent * ZOOM_PER_MODEL_EXTENT
        } else {
            DEFAULT_ZOOM
        }
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn set_scale_factor(&mut self, scale_factor: f32) -> Result<(), CalibrationError> {
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(CalibrationError::InvalidScaleFactor(scale_factor));
        }
        self.scale_factor = scale_factor;
        Ok(())
    }

    /// Derive the scale from a known distance: `real_mm / virtual_units`.
    pub fn calibrate(
        &mut self,
        virtual_distance: f32,
        real_distance_mm: f32,
    ) -> Result<f32, CalibrationError> {
        if !virtual_distance.is_finite() || virtual_distance <= 0.0 {
            return Err(CalibrationError::InvalidVirtualDistance(virtual_distance));
        }
        if !real_distance_mm.is_finite() || real_distance_mm <= 0.0 {
            return Err(CalibrationError::InvalidRealDistance(real_distance_mm));
        }
        self.scale_factor = real_distance_mm / virtual_distance;
        Ok(self.scale_factor)
    }

    /// World-space length for a zoom-relative fraction.
    pub fn relative(&self, fraction: f32) -> f32 {
        self.current_zoom * fraction
    }
}
