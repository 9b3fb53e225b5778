use crate::tools::context::{ToolContext, ToolOutcome};
use crate::tools::registry::{ObjectId, ObjectRegistry, Removal};
use bevy::prelude::*;

/// Delete every committed object with a vertex within `radius` of `point`.
///
/// Newest objects are tested first. Deleting an owned object takes its
/// measurement or annotation with it, so later candidates that were already
/// removed by a cascade are skipped.
pub fn erase_near(registry: &mut ObjectRegistry, point: Vec3, radius: f32) -> Vec<Removal> {
    let candidates: Vec<ObjectId> = registry
        .objects()
        .iter()
        .rev()
        .filter(|o| o.geometry.is_near(point, radius))
        .map(|o| o.id)
        .collect();

    candidates
        .into_iter()
        .filter_map(|id| registry.remove_object(id))
        .collect()
}

/// Erase under the pointer using the configured reach.
pub fn erase_at_pointer(
    registry: &mut ObjectRegistry,
    ctx: &ToolContext,
    screen: Vec2,
) -> Option<ToolOutcome> {
    let point = ctx.pick(screen)?.point;
    let removed = erase_near(registry, point, ctx.relative(ctx.settings.eraser_radius));
    if removed.is_empty() {
        return None;
    }
    info!("Eraser removed {} item(s)", removed.len());
    Some(ToolOutcome::Erased(removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::measure::MeasurementKind;
    use crate::tools::registry::{DrawnGeometry, MarkStyle};
    use crate::tools::test_support::TestScene;

    fn style() -> MarkStyle {
        MarkStyle::new([0.0, 1.0, 0.0], 1.0)
    }

    fn stroke(from: Vec3, to: Vec3) -> DrawnGeometry {
        DrawnGeometry::stroke(vec![from, from.lerp(to, 0.5), to], 0.01).unwrap()
    }

    #[test]
    fn erases_only_nearby_objects() {
        let mut registry = ObjectRegistry::default();
        let near = registry.commit(stroke(Vec3::ZERO, Vec3::X), style());
        let far = registry.commit(stroke(Vec3::Y * 5.0, Vec3::new(1.0, 5.0, 0.0)), style());

        let removed = erase_near(&mut registry, Vec3::new(0.5, 0.0, 0.0), 0.05);
        assert_eq!(removed, vec![Removal::Object(near)]);
        assert_eq!(registry.objects().len(), 1);
        assert_eq!(registry.objects()[0].id, far);
    }

    #[test]
    fn erasing_a_measurement_arm_removes_the_whole_measurement() {
        let mut registry = ObjectRegistry::default();
        let arm_a = registry.commit(stroke(Vec3::ZERO, Vec3::X), style());
        let arm_b = registry.commit(stroke(Vec3::ZERO, Vec3::Y), style());
        let id = registry.add_measurement(
            MeasurementKind::Angle,
            90.0,
            vec![Vec3::X, Vec3::ZERO, Vec3::Y],
            Vec3::ZERO,
            vec![arm_a, arm_b],
        );

        // Near both arms: the second candidate is already gone after the cascade.
        let removed = erase_near(&mut registry, Vec3::ZERO, 0.05);
        assert_eq!(removed.len(), 1);
        assert!(matches!(&removed[0], Removal::Measurement { id: m, .. } if *m == id));
        assert!(registry.objects().is_empty());
        assert!(registry.measurements().is_empty());
    }

    #[test]
    fn erasing_annotation_marker_removes_annotation() {
        let mut registry = ObjectRegistry::default();
        registry.add_annotation(Vec3::new(0.3, 0.3, 0.0), 0.01, style());

        let removed = erase_near(&mut registry, Vec3::new(0.31, 0.3, 0.0), 0.05);
        assert_eq!(removed.len(), 1);
        assert!(registry.annotations().is_empty());
    }

    #[test]
    fn pointer_erase_uses_zoom_relative_radius() {
        let scene = TestScene::new();
        let mut registry = ObjectRegistry::default();
        registry.commit(stroke(Vec3::new(0.1, 0.0, 0.0), Vec3::new(0.1, 1.0, 0.0)), style());

        // Reach is 5% of zoom 4.0: 0.2 world units.
        let ctx = scene.ctx(0.0);
        assert!(erase_at_pointer(&mut registry, &ctx, scene.screen(Vec3::new(-0.5, 0.0, 0.0))).is_none());
        let outcome = erase_at_pointer(&mut registry, &ctx, scene.screen(Vec3::new(-0.05, 0.0, 0.0)));
        assert!(matches!(outcome, Some(ToolOutcome::Erased(_))));
        assert!(registry.objects().is_empty());
    }
}
