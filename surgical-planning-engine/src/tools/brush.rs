use crate::tools::closed_loop::{is_closed_loop, measure_loop};
use crate::tools::context::{ToolContext, ToolOutcome};
use crate::tools::measure::MeasurementKind;
use crate::tools::registry::{DrawnGeometry, MarkStyle, ObjectId, ObjectRegistry};
use bevy::prelude::*;
use constants::render_settings::{FILL_LIFT_FRACTION, FILL_OPACITY};
use constants::tool_defaults::{BRUSH_MIN_STEP_FRACTION, BRUSH_SEGMENT_STEPS, SURFACE_LINE_STEPS};

/// Freehand stroke being drawn. The preview lives in registry scratch and is
/// replaced wholesale each time the point list grows.
#[derive(Debug, Clone)]
pub struct StrokeBuilder {
    points: Vec<Vec3>,
    style: MarkStyle,
    radius: f32,
    preview: Option<ObjectId>,
}

impl StrokeBuilder {
    pub fn begin(start: Vec3, style: MarkStyle, radius: f32) -> Self {
        Self {
            points: vec![start],
            style,
            radius,
            preview: None,
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn preview(&self) -> Option<ObjectId> {
        self.preview
    }

    pub fn extend(&mut self, points: impl IntoIterator<Item = Vec3>) {
        self.points.extend(points);
    }

    /// Repeat the first point so the tube meets itself.
    pub fn close_loop(&mut self) {
        if let Some(first) = self.points.first().copied() {
            self.points.push(first);
        }
    }

    /// Dispose the old preview and build a new one from the full point list.
    pub fn rebuild_preview(&mut self, registry: &mut ObjectRegistry) {
        self.discard(registry);
        if let Some(geometry) = DrawnGeometry::stroke(self.points.clone(), self.radius) {
            self.preview = Some(registry.add_scratch(geometry, self.style));
        }
    }

    pub fn discard(&mut self, registry: &mut ObjectRegistry) {
        if let Some(preview) = self.preview.take() {
            registry.remove_scratch(preview);
        }
    }

    /// Promote the final stroke onto the undo stack. `None` for a stroke that
    /// never left its first point.
    pub fn commit(mut self, registry: &mut ObjectRegistry) -> Option<ObjectId> {
        self.rebuild_preview(registry);
        let id = self.preview.take()?;
        registry.promote_scratch(id).then_some(id)
    }
}

fn surface_line(ctx: &ToolContext, from: Vec3, to: Vec3) -> Option<DrawnGeometry> {
    let path = ctx.surface_path(from, to, SURFACE_LINE_STEPS);
    DrawnGeometry::stroke(path, ctx.stroke_radius())
}

/// Commit a surface-following tube between two points.
pub fn draw_surface_line(
    registry: &mut ObjectRegistry,
    ctx: &ToolContext,
    from: Vec3,
    to: Vec3,
) -> Option<ObjectId> {
    let geometry = surface_line(ctx, from, to)?;
    Some(registry.commit(geometry, ctx.stroke_style()))
}

/// Surface line held in scratch until the gesture that drew it completes.
pub fn draw_scratch_surface_line(
    registry: &mut ObjectRegistry,
    ctx: &ToolContext,
    from: Vec3,
    to: Vec3,
) -> Option<ObjectId> {
    let geometry = surface_line(ctx, from, to)?;
    Some(registry.add_scratch(geometry, ctx.stroke_style()))
}

pub fn begin_brush_stroke(ctx: &ToolContext, screen: Vec2) -> Option<StrokeBuilder> {
    let start = ctx.pick_point(screen)?;
    Some(StrokeBuilder::begin(start, ctx.stroke_style(), ctx.stroke_radius()))
}

/// Extend the stroke towards the surface point under the pointer.
///
/// Samples closer than the minimum step are dropped. Accepted samples are
/// joined to the previous one along the surface.
pub fn continue_brush_stroke(
    stroke: &mut StrokeBuilder,
    registry: &mut ObjectRegistry,
    ctx: &ToolContext,
    screen: Vec2,
) -> bool {
    let Some(point) = ctx.pick_point(screen) else {
        return false;
    };
    let Some(last) = stroke.points().last().copied() else {
        return false;
    };
    if last.distance(point) <= ctx.relative(BRUSH_MIN_STEP_FRACTION) {
        return false;
    }

    let segment = ctx.surface_path(last, point, BRUSH_SEGMENT_STEPS);
    stroke.extend(segment.into_iter().skip(1));
    stroke.rebuild_preview(registry);
    true
}

/// Release: commit the stroke, and when it closes on itself also add a fill
/// patch and an area measurement that owns both.
pub fn finish_brush_stroke(
    mut stroke: StrokeBuilder,
    registry: &mut ObjectRegistry,
    ctx: &ToolContext,
) -> Option<ToolOutcome> {
    let closure = ctx.relative(ctx.settings.loop_closure_fraction);
    let closed = ctx.settings.auto_detect_closed_loop && is_closed_loop(stroke.points(), closure);
    if !closed {
        return stroke.commit(registry).map(ToolOutcome::StrokeCommitted);
    }

    let outline = stroke.points().to_vec();
    let style = stroke.style;
    stroke.close_loop();
    let stroke_id = stroke.commit(registry)?;

    let area = measure_loop(&outline, ctx.scale.scale_factor(), ctx.view.camera_position());
    let Some(fill) = area.fill_geometry(ctx.relative(FILL_LIFT_FRACTION)) else {
        return Some(ToolOutcome::StrokeCommitted(stroke_id));
    };
    let fill_id = registry.commit(fill, MarkStyle::new(style.colour, FILL_OPACITY));

    let id = registry.add_measurement(
        MeasurementKind::Area,
        area.area,
        vec![area.centroid],
        area.centroid,
        vec![stroke_id, fill_id],
    );
    info!("Closed loop {} measured: {:.2} mm²", id.0, area.area);
    Some(ToolOutcome::MeasurementCompleted(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::{DrawnKind, ObjectOwner};
    use crate::tools::test_support::TestScene;
    use std::f32::consts::TAU;

    fn circle_screen_points(scene: &TestScene, radius: f32, count: usize) -> Vec<Vec2> {
        (0..=count)
            .map(|i| {
                let angle = i as f32 / count as f32 * TAU;
                scene.screen(Vec3::new(angle.cos(), angle.sin(), 0.0) * radius)
            })
            .collect()
    }

    fn draw(scene: &TestScene, registry: &mut ObjectRegistry, screens: &[Vec2]) -> Option<ToolOutcome> {
        let ctx = scene.ctx(0.0);
        let mut stroke = begin_brush_stroke(&ctx, screens[0]).unwrap();
        for screen in &screens[1..] {
            continue_brush_stroke(&mut stroke, registry, &ctx, *screen);
        }
        finish_brush_stroke(stroke, registry, &ctx)
    }

    #[test]
    fn open_stroke_commits_single_tube() {
        let scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        let screens: Vec<Vec2> = (0..8)
            .map(|i| scene.screen(Vec3::new(-0.8 + i as f32 * 0.2, 0.1, 0.0)))
            .collect();

        let outcome = draw(&scene, &mut registry, &screens);
        assert!(matches!(outcome, Some(ToolOutcome::StrokeCommitted(_))));
        assert_eq!(registry.objects().len(), 1);
        assert!(registry.scratch_objects().is_empty());
        assert!(registry.measurements().is_empty());
    }

    #[test]
    fn closed_stroke_creates_fill_and_area() {
        let scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        let screens = circle_screen_points(&scene, 0.5, 24);

        let outcome = draw(&scene, &mut registry, &screens);
        let Some(ToolOutcome::MeasurementCompleted(id)) = outcome else {
            panic!("expected an area, got {outcome:?}");
        };

        let measurement = registry.measurement(id).unwrap();
        assert_eq!(measurement.kind, MeasurementKind::Area);
        // Inscribed 24-gon of radius 0.5 is within 2% of the circle.
        let circle = std::f32::consts::PI * 0.25;
        assert!((measurement.value - circle).abs() / circle < 0.02);

        let kinds: Vec<DrawnKind> = registry.objects().iter().map(|o| o.kind()).collect();
        assert_eq!(kinds, vec![DrawnKind::Stroke, DrawnKind::Fill]);
        assert!(registry
            .objects()
            .iter()
            .all(|o| o.owner == Some(ObjectOwner::Measurement(id))));
    }

    #[test]
    fn closed_detection_can_be_disabled() {
        let mut scene = TestScene::new();
        scene.settings.auto_detect_closed_loop = false;
        let mut registry = ObjectRegistry::default();
        let screens = circle_screen_points(&scene, 0.5, 24);

        let outcome = draw(&scene, &mut registry, &screens);
        assert!(matches!(outcome, Some(ToolOutcome::StrokeCommitted(_))));
        assert!(registry.measurements().is_empty());
    }

    #[test]
    fn tiny_moves_are_not_sampled() {
        let scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let start = scene.screen(Vec3::ZERO);
        let mut stroke = begin_brush_stroke(&ctx, start).unwrap();

        // 0.1% of zoom 4.0 is 0.004 world units.
        let nudge = scene.screen(Vec3::new(0.001, 0.0, 0.0));
        assert!(!continue_brush_stroke(&mut stroke, &mut registry, &ctx, nudge));
        assert_eq!(stroke.points().len(), 1);

        let step = scene.screen(Vec3::new(0.2, 0.0, 0.0));
        assert!(continue_brush_stroke(&mut stroke, &mut registry, &ctx, step));
        assert_eq!(stroke.points().len(), 1 + BRUSH_SEGMENT_STEPS);
        assert!(stroke.preview().is_some());
    }

    #[test]
    fn click_without_drag_leaves_nothing() {
        let scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let stroke = begin_brush_stroke(&ctx, scene.screen(Vec3::ZERO)).unwrap();
        assert!(finish_brush_stroke(stroke, &mut registry, &ctx).is_none());
        assert!(registry.rendered_objects().next().is_none());
    }

    #[test]
    fn surface_line_is_committed_with_current_style() {
        let mut scene = TestScene::new();
        scene.settings.set_preset(3);
        let mut registry = ObjectRegistry::default();
        let ctx = scene.ctx(0.0);
        let id = draw_surface_line(&mut registry, &ctx, Vec3::ZERO, Vec3::X).unwrap();

        let object = registry.object(id).unwrap();
        assert_eq!(object.style.colour, scene.settings.colour);
        let DrawnGeometry::Stroke { path, .. } = &object.geometry else {
            panic!("expected a stroke");
        };
        assert_eq!(path.len(), SURFACE_LINE_STEPS + 1);
    }
}
