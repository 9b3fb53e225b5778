use crate::tools::brush::{draw_scratch_surface_line, draw_surface_line};
use crate::tools::context::{ToolContext, ToolOutcome};
use crate::tools::labels::FloatingLabel;
use crate::tools::registry::{DrawnGeometry, MarkStyle, MeasurementId, ObjectId, ObjectRegistry};
use crate::tools::tool_manager::InteractionSession;
use bevy::prelude::*;
use constants::render_settings::{
    ANGLE_END_COLOUR, ANGLE_START_COLOUR, ANGLE_VERTEX_COLOUR, ANGLE_VERTEX_MARKER_RADIUS,
    MARKER_OPACITY, MEASURE_MARKER_COLOUR, MEASURE_MARKER_RADIUS,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    Distance,
    Angle,
    Area,
}

impl MeasurementKind {
    pub fn unit(&self) -> MeasurementUnit {
        match self {
            Self::Distance => MeasurementUnit::Millimetre,
            Self::Angle => MeasurementUnit::Degree,
            Self::Area => MeasurementUnit::SquareMillimetre,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Angle => "angle",
            Self::Area => "area",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementUnit {
    #[serde(rename = "mm")]
    Millimetre,
    #[serde(rename = "deg")]
    Degree,
    #[serde(rename = "mm2")]
    SquareMillimetre,
}

impl MeasurementUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Millimetre => "mm",
            Self::Degree => "°",
            Self::SquareMillimetre => "mm²",
        }
    }
}

/// A quantified result bound to its label and the geometry that shows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: MeasurementId,
    pub kind: MeasurementKind,
    pub value: f32,
    pub unit: MeasurementUnit,
    pub anchors: Vec<Vec3>,
    pub label: FloatingLabel,
    pub related: Vec<ObjectId>,
}

impl Measurement {
    pub fn new(
        id: MeasurementId,
        kind: MeasurementKind,
        value: f32,
        anchors: Vec<Vec3>,
        label: FloatingLabel,
        related: Vec<ObjectId>,
    ) -> Self {
        Self {
            id,
            kind,
            value,
            unit: kind.unit(),
            anchors,
            label,
            related,
        }
    }

    /// Label text: two decimals for lengths and areas, one for angles.
    pub fn display_value(&self) -> String {
        match self.kind {
            MeasurementKind::Angle => format!("{:.1}{}", self.value, self.unit.symbol()),
            _ => format!("{:.2} {}", self.value, self.unit.symbol()),
        }
    }
}

/// Clicks collected for a line, distance or angle that is not finished yet.
#[derive(Debug, Clone, Default)]
pub struct ClickSequence {
    pub points: Vec<Vec3>,
    /// Scratch markers shown at each click.
    pub markers: Vec<ObjectId>,
    /// Edges already committed, e.g. the first arm of an angle.
    pub edges: Vec<ObjectId>,
}

/// Interior angle at `vertex` in degrees. `None` when an arm has no length.
pub fn angle_degrees(start: Vec3, vertex: Vec3, end: Vec3) -> Option<f32> {
    let ba = (start - vertex).try_normalize()?;
    let bc = (end - vertex).try_normalize()?;
    Some(ba.dot(bc).clamp(-1.0, 1.0).acos().to_degrees())
}

fn place_click_marker(
    registry: &mut ObjectRegistry,
    ctx: &ToolContext,
    point: Vec3,
    radius_fraction: f32,
    colour: [f32; 3],
) -> ObjectId {
    registry.add_scratch(
        DrawnGeometry::marker(point, ctx.relative(radius_fraction)),
        MarkStyle::new(colour, MARKER_OPACITY),
    )
}

/// Line and distance tools: two clicks draw a surface-following edge.
///
/// With `measure` set, the edge is bound to a distance measurement labelled at
/// the midpoint. Click markers are left to expire.
pub fn handle_two_point_click(
    session: &mut InteractionSession,
    registry: &mut ObjectRegistry,
    ctx: &ToolContext,
    point: Vec3,
    measure: bool,
) -> Option<ToolOutcome> {
    let marker = place_click_marker(
        registry,
        ctx,
        point,
        MEASURE_MARKER_RADIUS,
        MEASURE_MARKER_COLOUR,
    );
    session.clicks.points.push(point);
    session.clicks.markers.push(marker);
    if session.clicks.points.len() < 2 {
        return None;
    }

    let clicks = std::mem::take(&mut session.clicks);
    session.expire_later(&clicks.markers, ctx.now);
    let (start, end) = (clicks.points[0], clicks.points[1]);

    let edge = draw_surface_line(registry, ctx, start, end)?;
    if !measure {
        return Some(ToolOutcome::StrokeCommitted(edge));
    }

    let value = start.distance(end) * ctx.scale.scale_factor();
    let id = registry.add_measurement(
        MeasurementKind::Distance,
        value,
        vec![start, end],
        start.lerp(end, 0.5),
        vec![edge],
    );
    info!("Distance measurement {} completed: {:.2} mm", id.0, value);
    Some(ToolOutcome::MeasurementCompleted(id))
}

/// Angle tool: start, vertex, end. Each arm is drawn as soon as it is known.
pub fn handle_angle_click(
    session: &mut InteractionSession,
    registry: &mut ObjectRegistry,
    ctx: &ToolContext,
    point: Vec3,
) -> Option<ToolOutcome> {
    let guard = ctx.relative(ctx.settings.angle_double_tap_fraction);
    if let Some(last) = session.last_angle_click {
        if last.distance(point) < guard {
            debug!("Angle click ignored: within {:.4} of previous click", guard);
            return None;
        }
    }
    session.last_angle_click = Some(point);

    match session.clicks.points.len() {
        0 => {
            session.flush_expiring(registry);
            let marker = place_click_marker(
                registry,
                ctx,
                point,
                MEASURE_MARKER_RADIUS,
                ANGLE_START_COLOUR,
            );
            session.clicks.points.push(point);
            session.clicks.markers.push(marker);
            None
        }
        1 => {
            let marker = place_click_marker(
                registry,
                ctx,
                point,
                ANGLE_VERTEX_MARKER_RADIUS,
                ANGLE_VERTEX_COLOUR,
            );
            let start = session.clicks.points[0];
            session.clicks.points.push(point);
            session.clicks.markers.push(marker);
            if let Some(edge) = draw_scratch_surface_line(registry, ctx, point, start) {
                session.clicks.edges.push(edge);
            }
            None
        }
        _ => {
            let marker = place_click_marker(
                registry,
                ctx,
                point,
                MEASURE_MARKER_RADIUS,
                ANGLE_END_COLOUR,
            );
            let mut clicks = std::mem::take(&mut session.clicks);
            clicks.markers.push(marker);
            session.expire_later(&clicks.markers, ctx.now);

            let (start, vertex) = (clicks.points[0], clicks.points[1]);
            let Some(value) = angle_degrees(start, vertex, point) else {
                for edge in clicks.edges {
                    registry.remove_scratch(edge);
                }
                return None;
            };

            // First arm joins the undo stack only once the angle is complete.
            clicks.edges.retain(|edge| registry.promote_scratch(*edge));
            if let Some(edge) = draw_surface_line(registry, ctx, vertex, point) {
                clicks.edges.push(edge);
            }

            let id = registry.add_measurement(
                MeasurementKind::Angle,
                value,
                vec![start, vertex, point],
                vertex,
                clicks.edges,
            );
            info!("Angle measurement {} completed: {:.1}°", id.0, value);
            Some(ToolOutcome::MeasurementCompleted(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::TestScene;
    use crate::tools::registry::DrawnKind;

    #[test]
    fn right_angle() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let c = Vec3::new(0.0, 1.0, 0.0);
        assert!((angle_degrees(a, Vec3::ZERO, c).unwrap() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn collinear_points_give_straight_angle() {
        let a = Vec3::new(-1.0, 0.0, 0.0);
        let c = Vec3::new(2.0, 0.0, 0.0);
        assert!((angle_degrees(a, Vec3::ZERO, c).unwrap() - 180.0).abs() < 1e-3);
        assert!(angle_degrees(Vec3::ZERO, Vec3::ZERO, c).is_none());
    }

    #[test]
    fn value_formatting() {
        let label = FloatingLabel::new(Vec3::ZERO);
        let distance = Measurement::new(
            MeasurementId(1),
            MeasurementKind::Distance,
            12.345,
            Vec::new(),
            label,
            Vec::new(),
        );
        assert_eq!(distance.display_value(), "12.35 mm");
        let angle = Measurement::new(
            MeasurementId(2),
            MeasurementKind::Angle,
            89.96,
            Vec::new(),
            label,
            Vec::new(),
        );
        assert_eq!(angle.display_value(), "90.0°");
    }

    #[test]
    fn distance_is_scaled_and_bound_to_its_edge() {
        let mut scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        scene.scale.set_scale_factor(2.0).unwrap();
        let a = Vec3::new(-0.5, 0.0, 0.0004);
        let b = Vec3::new(0.5, 0.0, 0.0004);

        let ctx = scene.ctx(0.0);
        let mut session = InteractionSession::default();
        assert!(handle_two_point_click(&mut session, &mut registry, &ctx, a, true).is_none());
        let outcome = handle_two_point_click(&mut session, &mut registry, &ctx, b, true);

        let Some(ToolOutcome::MeasurementCompleted(id)) = outcome else {
            panic!("expected a measurement, got {outcome:?}");
        };
        let measurement = registry.measurement(id).unwrap();
        assert!((measurement.value - 2.0).abs() < 1e-4);
        assert_eq!(measurement.related.len(), 1);
        assert!((measurement.label.anchor - a.lerp(b, 0.5)).length() < 1e-6);
        assert_eq!(registry.scratch_objects().len(), 2);
        assert!(session.clicks.points.is_empty());
    }

    #[test]
    fn line_tool_commits_plain_stroke() {
        let scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let mut session = InteractionSession::default();
        handle_two_point_click(&mut session, &mut registry, &ctx, Vec3::ZERO, false);
        let outcome =
            handle_two_point_click(&mut session, &mut registry, &ctx, Vec3::X * 0.5, false);

        assert!(matches!(outcome, Some(ToolOutcome::StrokeCommitted(_))));
        assert!(registry.measurements().is_empty());
        assert_eq!(registry.objects()[0].owner, None);
    }

    #[test]
    fn angle_sequence_owns_both_arms() {
        let scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let mut session = InteractionSession::default();
        let clicks = [
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::new(0.0, 0.5, 0.0),
        ];

        let mut outcome = None;
        for point in clicks {
            outcome = handle_angle_click(&mut session, &mut registry, &ctx, point);
        }
        let Some(ToolOutcome::MeasurementCompleted(id)) = outcome else {
            panic!("expected an angle, got {outcome:?}");
        };
        let measurement = registry.measurement(id).unwrap();
        assert!((measurement.value - 90.0).abs() < 1e-3);
        assert_eq!(measurement.related.len(), 2);
        assert!(registry.objects().iter().all(|o| o.owner.is_some()));
    }

    #[test]
    fn unfinished_angle_stays_off_the_undo_stack() {
        let scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let mut session = InteractionSession::default();
        handle_angle_click(&mut session, &mut registry, &ctx, Vec3::new(0.5, 0.0, 0.0));
        handle_angle_click(&mut session, &mut registry, &ctx, Vec3::ZERO);

        assert!(registry.objects().is_empty());
        assert_eq!(session.clicks.edges.len(), 1);
        // Two click markers and the first arm.
        assert_eq!(registry.scratch_objects().len(), 3);

        handle_angle_click(&mut session, &mut registry, &ctx, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(registry.objects().len(), 2);
        assert!(registry.objects().iter().all(|o| o.kind() == DrawnKind::Stroke));
    }

    #[test]
    fn angle_double_tap_is_ignored() {
        let scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let mut session = InteractionSession::default();
        let a = Vec3::new(0.5, 0.0, 0.0);
        handle_angle_click(&mut session, &mut registry, &ctx, a);
        // 1% of zoom 4.0 is 0.04.
        handle_angle_click(&mut session, &mut registry, &ctx, a + Vec3::X * 0.01);
        assert_eq!(session.clicks.points.len(), 1);
        handle_angle_click(&mut session, &mut registry, &ctx, Vec3::ZERO);
        assert_eq!(session.clicks.points.len(), 2);
    }

    #[test]
    fn new_click_after_completed_angle_restarts() {
        let scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let mut session = InteractionSession::default();
        for point in [Vec3::X * 0.5, Vec3::ZERO, Vec3::Y * 0.5, Vec3::new(-0.5, -0.5, 0.0)] {
            handle_angle_click(&mut session, &mut registry, &ctx, point);
        }
        assert_eq!(registry.measurements().len(), 1);
        assert_eq!(session.clicks.points.len(), 1);
        assert_eq!(registry.scratch_objects().len(), 1);
    }
}
