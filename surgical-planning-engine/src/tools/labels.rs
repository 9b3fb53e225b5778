use crate::engine::camera::view_projection::ViewProjection;
use crate::tools::registry::{AnnotationId, MeasurementId, ObjectRegistry};
use bevy::prelude::*;
use constants::render_settings::{LABEL_CLOSE_SIZE, LABEL_HEIGHT, LABEL_WIDTH};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Screen-space panel pinned to a world anchor.
///
/// Only the drag offset is stored. The on-screen position is re-derived from
/// the anchor every frame, so labels follow the model while the camera moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatingLabel {
    pub anchor: Vec3,
    #[serde(default)]
    pub offset: Vec2,
}

impl FloatingLabel {
    pub fn new(anchor: Vec3) -> Self {
        Self {
            anchor,
            offset: Vec2::ZERO,
        }
    }

    /// Label centre on screen, `None` while the anchor is behind the camera.
    pub fn screen_position(&self, view: &ViewProjection) -> Option<Vec2> {
        view.world_to_screen(self.anchor).map(|p| p + self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum LabelTarget {
    Measurement(MeasurementId),
    Annotation(AnnotationId),
}

pub fn label_rect(centre: Vec2) -> Rect {
    Rect::from_center_size(centre, Vec2::new(LABEL_WIDTH, LABEL_HEIGHT))
}

/// Close box in the top-right corner of a measurement label.
pub fn close_rect(centre: Vec2) -> Rect {
    let corner = centre + Vec2::new(LABEL_WIDTH, -LABEL_HEIGHT) * 0.5;
    let half = LABEL_CLOSE_SIZE * 0.5;
    Rect::from_center_size(corner + Vec2::new(-half, half), Vec2::splat(LABEL_CLOSE_SIZE))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelHit {
    pub target: LabelTarget,
    pub centre: Vec2,
    pub on_close: bool,
}

/// Where every label sits this frame. Written only by [`reproject_labels`].
#[derive(Resource, Debug, Default)]
pub struct LabelLayout {
    positions: HashMap<LabelTarget, Vec2>,
}

impl LabelLayout {
    pub fn position(&self, target: LabelTarget) -> Option<Vec2> {
        self.positions.get(&target).copied()
    }

    pub fn rebuild(&mut self, registry: &ObjectRegistry, view: &ViewProjection) {
        self.positions.clear();
        for (target, label) in registry.labels() {
            if let Some(position) = label.screen_position(view) {
                self.positions.insert(target, position);
            }
        }
    }

    /// Label under the pointer, preferring the one whose centre is closest.
    pub fn hit_test(&self, pointer: Vec2) -> Option<LabelHit> {
        self.positions
            .iter()
            .filter(|(_, centre)| label_rect(**centre).contains(pointer))
            .min_by(|(_, a), (_, b)| {
                a.distance_squared(pointer)
                    .total_cmp(&b.distance_squared(pointer))
            })
            .map(|(target, centre)| LabelHit {
                target: *target,
                centre: *centre,
                on_close: matches!(target, LabelTarget::Measurement(_))
                    && close_rect(*centre).contains(pointer),
            })
    }
}

/// Active label drag. The grab offset keeps the label from jumping under the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelDrag {
    pub target: LabelTarget,
    pub grab: Vec2,
}

impl LabelDrag {
    pub fn begin(target: LabelTarget, pointer: Vec2, label_centre: Vec2) -> Self {
        Self {
            target,
            grab: pointer - label_centre,
        }
    }

    /// Move the label under the pointer and store the offset relative to the
    /// anchor's current projection. Returns the new label centre.
    pub fn update(
        &self,
        pointer: Vec2,
        label: &mut FloatingLabel,
        view: &ViewProjection,
    ) -> Option<Vec2> {
        let centre = pointer - self.grab;
        let anchor = view.world_to_screen(label.anchor)?;
        label.offset = centre - anchor;
        Some(centre)
    }
}

/// Re-derive every label position from its anchor.
pub fn reproject_labels(
    registry: Res<ObjectRegistry>,
    view: Option<Res<ViewProjection>>,
    mut layout: ResMut<LabelLayout>,
) {
    let Some(view) = view else {
        return;
    };
    layout.rebuild(&registry, &view);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::measure::MeasurementKind;
    use crate::tools::registry::MarkStyle;
    use crate::tools::test_support::{front_view, orbited_view};

    #[test]
    fn label_follows_anchor_plus_offset() {
        let view = front_view();
        let mut label = FloatingLabel::new(Vec3::new(0.5, 0.5, 0.0));
        label.offset = Vec2::new(30.0, -10.0);

        let projected = view.world_to_screen(label.anchor).unwrap();
        assert_eq!(label.screen_position(&view), Some(projected + label.offset));
    }

    #[test]
    fn drag_keeps_grab_point_and_rederives_offset() {
        let view = front_view();
        let mut label = FloatingLabel::new(Vec3::ZERO);
        let centre = label.screen_position(&view).unwrap();

        let pointer = centre + Vec2::new(12.0, 5.0);
        let drag = LabelDrag::begin(LabelTarget::Annotation(AnnotationId(1)), pointer, centre);
        let moved = drag
            .update(pointer + Vec2::new(100.0, 40.0), &mut label, &view)
            .unwrap();

        assert!((moved - (centre + Vec2::new(100.0, 40.0))).length() < 1e-3);
        assert!((label.offset - Vec2::new(100.0, 40.0)).length() < 1e-3);
    }

    #[test]
    fn offset_is_preserved_across_camera_moves() {
        let mut label = FloatingLabel::new(Vec3::new(0.2, 0.1, 0.0));
        label.offset = Vec2::new(40.0, 0.0);

        let view = orbited_view();
        let anchor = view.world_to_screen(label.anchor).unwrap();
        let position = label.screen_position(&view).unwrap();
        assert!((position - anchor - Vec2::new(40.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn hit_test_finds_close_box_on_measurements_only() {
        let view = front_view();
        let mut registry = ObjectRegistry::default();
        registry.add_measurement(
            MeasurementKind::Distance,
            10.0,
            vec![Vec3::ZERO, Vec3::X],
            Vec3::ZERO,
            Vec::new(),
        );
        let annotation = registry.add_annotation(
            Vec3::new(-1.0, -1.0, 0.0),
            0.1,
            MarkStyle::new([1.0; 3], 1.0),
        );

        let mut layout = LabelLayout::default();
        layout.rebuild(&registry, &view);

        let centre = layout
            .position(LabelTarget::Measurement(MeasurementId(1)))
            .unwrap();
        let close = close_rect(centre).center();
        let hit = layout.hit_test(close).unwrap();
        assert!(hit.on_close);

        let panel = layout.position(LabelTarget::Annotation(annotation)).unwrap();
        let hit = layout.hit_test(close_rect(panel).center()).unwrap();
        assert_eq!(hit.target, LabelTarget::Annotation(annotation));
        assert!(!hit.on_close);

        assert!(layout.hit_test(Vec2::new(-500.0, -500.0)).is_none());
    }
}
