use crate::engine::mesh::geometry::GeometryBuffers;
use crate::engine::mesh::patch::build_patch;
use crate::engine::mesh::tube::build_tube;
use crate::tools::annotation::Annotation;
use crate::tools::labels::{FloatingLabel, LabelTarget};
use crate::tools::measure::{Measurement, MeasurementKind};
use bevy::prelude::*;
use constants::render_settings::{TUBE_RADIAL_SEGMENTS, TUBE_SEGMENTS_PER_POINT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementId(pub u64);

/// Annotation numbers are shown to the user, so they start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u32);

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Colour and opacity captured when an object is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkStyle {
    pub colour: [f32; 3],
    pub opacity: f32,
}

impl MarkStyle {
    pub fn new(colour: [f32; 3], opacity: f32) -> Self {
        Self { colour, opacity }
    }

    pub fn to_color(&self) -> Color {
        let [r, g, b] = self.colour;
        Color::srgba(r, g, b, self.opacity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawnKind {
    Stroke,
    Marker,
    Fill,
}

/// Geometry of a drawn object, together with the buffers that were built from it.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawnGeometry {
    Stroke {
        path: Vec<Vec3>,
        radius: f32,
        buffers: GeometryBuffers,
    },
    Marker {
        centre: Vec3,
        radius: f32,
    },
    Fill {
        outline: Vec<Vec3>,
        normal: Vec3,
        buffers: GeometryBuffers,
    },
}

impl DrawnGeometry {
    /// Smooth tube through `path`. `None` when the path has no length.
    pub fn stroke(path: Vec<Vec3>, radius: f32) -> Option<Self> {
        let tubular_segments = path.len() * TUBE_SEGMENTS_PER_POINT;
        let buffers = build_tube(&path, radius, tubular_segments, TUBE_RADIAL_SEGMENTS);
        (!buffers.is_empty()).then_some(Self::Stroke {
            path,
            radius,
            buffers,
        })
    }

    pub fn marker(centre: Vec3, radius: f32) -> Self {
        Self::Marker { centre, radius }
    }

    /// Flat patch over a closed outline. `None` for fewer than three points.
    pub fn fill(outline: Vec<Vec3>, normal: Vec3) -> Option<Self> {
        let buffers = build_patch(&outline, normal);
        (!buffers.is_empty()).then_some(Self::Fill {
            outline,
            normal,
            buffers,
        })
    }

    pub fn kind(&self) -> DrawnKind {
        match self {
            Self::Stroke { .. } => DrawnKind::Stroke,
            Self::Marker { .. } => DrawnKind::Marker,
            Self::Fill { .. } => DrawnKind::Fill,
        }
    }

    /// Eraser test: any uploaded vertex, or the marker centre, within `radius`.
    pub fn is_near(&self, point: Vec3, radius: f32) -> bool {
        let radius_sq = radius * radius;
        match self {
            Self::Marker { centre, .. } => centre.distance_squared(point) <= radius_sq,
            Self::Stroke { buffers, .. } | Self::Fill { buffers, .. } => buffers
                .positions
                .iter()
                .any(|v| v.distance_squared(point) <= radius_sq),
        }
    }

    pub fn to_mesh(&self) -> Mesh {
        match self {
            Self::Marker { radius, .. } => Mesh::from(Sphere::new(*radius)),
            Self::Stroke { buffers, .. } | Self::Fill { buffers, .. } => buffers.to_mesh(),
        }
    }

    /// Placement of the render entity. Tube and patch buffers are already in world space.
    pub fn transform(&self) -> Transform {
        match self {
            Self::Marker { centre, .. } => Transform::from_translation(*centre),
            _ => Transform::IDENTITY,
        }
    }
}

/// What an object belongs to. Deleting an owned object deletes its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ObjectOwner {
    Measurement(MeasurementId),
    Annotation(AnnotationId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnObject {
    pub id: ObjectId,
    pub geometry: DrawnGeometry,
    pub style: MarkStyle,
    pub owner: Option<ObjectOwner>,
}

impl DrawnObject {
    pub fn kind(&self) -> DrawnKind {
        self.geometry.kind()
    }
}

/// Result of a deletion, listing every object that left the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Removal {
    Object(ObjectId),
    Measurement {
        id: MeasurementId,
        objects: Vec<ObjectId>,
    },
    Annotation {
        id: AnnotationId,
        marker: Option<ObjectId>,
    },
}

impl Removal {
    pub fn object_ids(&self) -> Vec<ObjectId> {
        match self {
            Self::Object(id) => vec![*id],
            Self::Measurement { objects, .. } => objects.clone(),
            Self::Annotation { marker, .. } => marker.iter().copied().collect(),
        }
    }
}

/// Every committed drawing, measurement and annotation, in creation order.
///
/// `objects` doubles as the undo stack. `scratch` holds the brush preview and
/// click markers: rendered like any other object but never undone or saved.
#[derive(Resource, Debug, Clone)]
pub struct ObjectRegistry {
    objects: Vec<DrawnObject>,
    scratch: Vec<DrawnObject>,
    measurements: Vec<Measurement>,
    annotations: Vec<Annotation>,
    next_object_id: u64,
    next_measurement_id: u64,
    next_annotation_id: u32,
    /// Bumped whenever the contents are replaced wholesale, since ids may repeat.
    generation: u64,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            scratch: Vec::new(),
            measurements: Vec::new(),
            annotations: Vec::new(),
            next_object_id: 1,
            next_measurement_id: 1,
            next_annotation_id: 1,
            generation: 0,
        }
    }
}

impl ObjectRegistry {
    /// Rebuild from saved parts; counters continue after the highest id.
    pub(crate) fn from_parts(
        objects: Vec<DrawnObject>,
        measurements: Vec<Measurement>,
        annotations: Vec<Annotation>,
    ) -> Self {
        let next_object_id = objects.iter().map(|o| o.id.0).max().unwrap_or(0) + 1;
        let next_measurement_id = measurements.iter().map(|m| m.id.0).max().unwrap_or(0) + 1;
        let next_annotation_id = annotations.iter().map(|a| a.id.0).max().unwrap_or(0) + 1;
        Self {
            objects,
            scratch: Vec::new(),
            measurements,
            annotations,
            next_object_id,
            next_measurement_id,
            next_annotation_id,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Take over the contents of `restored` as a new generation.
    pub fn replace_with(&mut self, restored: ObjectRegistry) {
        let generation = self.generation + 1;
        *self = restored;
        self.generation = generation;
    }

    fn allocate_object_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_object_id);
        self.next_object_id += 1;
        id
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.measurements.is_empty() && self.annotations.is_empty()
    }

    pub fn objects(&self) -> &[DrawnObject] {
        &self.objects
    }

    pub fn scratch_objects(&self) -> &[DrawnObject] {
        &self.scratch
    }

    /// Everything that should currently have a render entity.
    pub fn rendered_objects(&self) -> impl Iterator<Item = &DrawnObject> {
        self.objects.iter().chain(self.scratch.iter())
    }

    pub fn object(&self, id: ObjectId) -> Option<&DrawnObject> {
        self.rendered_objects().find(|o| o.id == id)
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn measurement(&self, id: MeasurementId) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.id == id)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn next_annotation_id(&self) -> AnnotationId {
        AnnotationId(self.next_annotation_id)
    }

    /// Append a committed object to the undo stack.
    pub fn commit(&mut self, geometry: DrawnGeometry, style: MarkStyle) -> ObjectId {
        let id = self.allocate_object_id();
        self.objects.push(DrawnObject {
            id,
            geometry,
            style,
            owner: None,
        });
        id
    }

    pub fn add_scratch(&mut self, geometry: DrawnGeometry, style: MarkStyle) -> ObjectId {
        let id = self.allocate_object_id();
        self.scratch.push(DrawnObject {
            id,
            geometry,
            style,
            owner: None,
        });
        id
    }

    pub fn remove_scratch(&mut self, id: ObjectId) -> bool {
        let before = self.scratch.len();
        self.scratch.retain(|o| o.id != id);
        before != self.scratch.len()
    }

    /// Move a scratch object onto the undo stack, keeping its id.
    pub fn promote_scratch(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.scratch.iter().position(|o| o.id == id) else {
            return false;
        };
        let object = self.scratch.remove(index);
        self.objects.push(object);
        true
    }

    pub fn clear_scratch(&mut self) {
        self.scratch.clear();
    }

    /// Register a measurement and claim its related objects.
    pub fn add_measurement(
        &mut self,
        kind: MeasurementKind,
        value: f32,
        anchors: Vec<Vec3>,
        label_anchor: Vec3,
        related: Vec<ObjectId>,
    ) -> MeasurementId {
        let id = MeasurementId(self.next_measurement_id);
        self.next_measurement_id += 1;

        for object in self.objects.iter_mut().filter(|o| related.contains(&o.id)) {
            object.owner = Some(ObjectOwner::Measurement(id));
        }
        self.measurements.push(Measurement::new(
            id,
            kind,
            value,
            anchors,
            FloatingLabel::new(label_anchor),
            related,
        ));
        id
    }

    /// Commit an annotation marker and its numbered label.
    pub fn add_annotation(&mut self, anchor: Vec3, radius: f32, style: MarkStyle) -> AnnotationId {
        let id = AnnotationId(self.next_annotation_id);
        self.next_annotation_id += 1;

        let marker = self.commit(DrawnGeometry::marker(anchor, radius), style);
        if let Some(object) = self.objects.last_mut() {
            object.owner = Some(ObjectOwner::Annotation(id));
        }
        self.annotations.push(Annotation::new(id, anchor, marker, style.colour));
        id
    }

    pub fn set_annotation_note(&mut self, id: AnnotationId, note: &str) -> bool {
        match self.annotations.iter_mut().find(|a| a.id == id) {
            Some(annotation) => {
                annotation.note = note.to_string();
                true
            }
            None => false,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = (LabelTarget, &FloatingLabel)> {
        let measurements = self
            .measurements
            .iter()
            .map(|m| (LabelTarget::Measurement(m.id), &m.label));
        let annotations = self
            .annotations
            .iter()
            .map(|a| (LabelTarget::Annotation(a.id), &a.label));
        measurements.chain(annotations)
    }

    pub fn label(&self, target: LabelTarget) -> Option<&FloatingLabel> {
        match target {
            LabelTarget::Measurement(id) => self.measurement(id).map(|m| &m.label),
            LabelTarget::Annotation(id) => self.annotation(id).map(|a| &a.label),
        }
    }

    pub fn label_mut(&mut self, target: LabelTarget) -> Option<&mut FloatingLabel> {
        match target {
            LabelTarget::Measurement(id) => self
                .measurements
                .iter_mut()
                .find(|m| m.id == id)
                .map(|m| &mut m.label),
            LabelTarget::Annotation(id) => self
                .annotations
                .iter_mut()
                .find(|a| a.id == id)
                .map(|a| &mut a.label),
        }
    }

    /// Delete one committed object, cascading to its owner.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<Removal> {
        let object = self.objects.iter().find(|o| o.id == id)?;
        match object.owner {
            Some(ObjectOwner::Measurement(owner)) => self.remove_measurement(owner),
            Some(ObjectOwner::Annotation(owner)) => self.remove_annotation(owner),
            None => {
                self.objects.retain(|o| o.id != id);
                Some(Removal::Object(id))
            }
        }
    }

    /// Delete a measurement with its label and every related object.
    pub fn remove_measurement(&mut self, id: MeasurementId) -> Option<Removal> {
        let index = self.measurements.iter().position(|m| m.id == id)?;
        let measurement = self.measurements.remove(index);

        let owned = Some(ObjectOwner::Measurement(id));
        let mut removed = Vec::new();
        self.objects.retain(|o| {
            let drop = o.owner == owned || measurement.related.contains(&o.id);
            if drop {
                removed.push(o.id);
            }
            !drop
        });
        Some(Removal::Measurement {
            id,
            objects: removed,
        })
    }

    /// Delete an annotation with its marker.
    pub fn remove_annotation(&mut self, id: AnnotationId) -> Option<Removal> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        let annotation = self.annotations.remove(index);

        let before = self.objects.len();
        self.objects.retain(|o| o.id != annotation.marker);
        let marker = (before != self.objects.len()).then_some(annotation.marker);
        Some(Removal::Annotation { id, marker })
    }

    /// Remove the most recently committed object. The annotation counter is
    /// left alone, so numbers are never reused until a full clear.
    pub fn undo(&mut self) -> Option<Removal> {
        let last = self.objects.last()?.id;
        self.remove_object(last)
    }

    /// Empty the registry and restart annotation numbering at 1.
    pub fn clear_all(&mut self) {
        while self.undo().is_some() {}
        self.objects.clear();
        self.scratch.clear();
        self.measurements.clear();
        self.annotations.clear();
        self.next_annotation_id = 1;
        self.generation += 1;
    }
}
