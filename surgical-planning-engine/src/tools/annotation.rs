use crate::tools::context::{ToolContext, ToolOutcome};
use crate::tools::labels::FloatingLabel;
use crate::tools::registry::{AnnotationId, ObjectId, ObjectRegistry};
use bevy::prelude::*;
use constants::render_settings::ANNOTATION_MARKER_RADIUS;
use serde::{Deserialize, Serialize};

/// Numbered note pinned to the surface by a marker sphere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub marker: ObjectId,
    pub colour: [f32; 3],
    #[serde(default)]
    pub note: String,
    pub label: FloatingLabel,
}

impl Annotation {
    pub fn new(id: AnnotationId, anchor: Vec3, marker: ObjectId, colour: [f32; 3]) -> Self {
        Self {
            id,
            marker,
            colour,
            note: String::new(),
            label: FloatingLabel::new(anchor),
        }
    }

    pub fn anchor(&self) -> Vec3 {
        self.label.anchor
    }

    pub fn title(&self) -> String {
        if self.note.is_empty() {
            self.id.to_string()
        } else {
            format!("{} {}", self.id, self.note)
        }
    }
}

pub fn place_annotation(
    registry: &mut ObjectRegistry,
    ctx: &ToolContext,
    point: Vec3,
) -> ToolOutcome {
    let id = registry.add_annotation(
        point,
        ctx.relative(ANNOTATION_MARKER_RADIUS),
        ctx.stroke_style(),
    );
    info!("Annotation {} placed", id);
    ToolOutcome::AnnotationCreated(id)
}
