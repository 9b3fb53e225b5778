use crate::tools::annotation::Annotation;
use crate::tools::measure::{Measurement, MeasurementKind};
use crate::tools::registry::{
    AnnotationId, DrawnGeometry, DrawnKind, DrawnObject, MarkStyle, MeasurementId, ObjectId,
    ObjectOwner, ObjectRegistry,
};
use crate::tools::settings::SceneScale;
use crate::tools::tool_manager::InteractionSession;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub const PROJECT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported project version {found} (expected {expected})", expected = PROJECT_FORMAT_VERSION)]
    UnsupportedVersion { found: u32 },
    #[error("scale factor {0} must be positive")]
    InvalidScaleFactor(f32),
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u64 },
    #[error("object {0} has unusable {1} geometry")]
    InvalidGeometry(u64, &'static str),
    #[error("{owner} references missing object {object}")]
    MissingObject { owner: String, object: u64 },
    #[error("object {object} is owned by missing {owner}")]
    MissingOwner { object: u64, owner: String },
}

/// One drawn object as stored on disk. Render buffers are rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub kind: DrawnKind,
    /// Stroke path, marker centre, or fill outline.
    pub points: Vec<Vec3>,
    #[serde(default)]
    pub radius: f32,
    #[serde(default)]
    pub normal: Option<Vec3>,
    pub colour: [f32; 3],
    pub opacity: f32,
    #[serde(default)]
    pub owner: Option<ObjectOwner>,
}

impl ObjectRecord {
    fn capture(object: &DrawnObject) -> Self {
        let (points, radius, normal) = match &object.geometry {
            DrawnGeometry::Stroke { path, radius, .. } => (path.clone(), *radius, None),
            DrawnGeometry::Marker { centre, radius } => (vec![*centre], *radius, None),
            DrawnGeometry::Fill {
                outline, normal, ..
            } => (outline.clone(), 0.0, Some(*normal)),
        };
        Self {
            id: object.id,
            kind: object.kind(),
            points,
            radius,
            normal,
            colour: object.style.colour,
            opacity: object.style.opacity,
            owner: object.owner,
        }
    }

    fn rebuild(&self) -> Result<DrawnObject, ProjectError> {
        let invalid = || ProjectError::InvalidGeometry(self.id.0, kind_name(self.kind));
        let geometry = match self.kind {
            DrawnKind::Stroke if self.radius > 0.0 => {
                DrawnGeometry::stroke(self.points.clone(), self.radius)
            }
            DrawnKind::Marker if self.radius > 0.0 && self.points.len() == 1 => {
                Some(DrawnGeometry::marker(self.points[0], self.radius))
            }
            DrawnKind::Fill => self
                .normal
                .and_then(|normal| DrawnGeometry::fill(self.points.clone(), normal)),
            _ => None,
        }
        .ok_or_else(invalid)?;

        Ok(DrawnObject {
            id: self.id,
            geometry,
            style: MarkStyle::new(self.colour, self.opacity.clamp(0.0, 1.0)),
            owner: self.owner,
        })
    }
}

fn kind_name(kind: DrawnKind) -> &'static str {
    match kind {
        DrawnKind::Stroke => "stroke",
        DrawnKind::Marker => "marker",
        DrawnKind::Fill => "fill",
    }
}

fn default_scale_factor() -> f32 {
    constants::tool_defaults::DEFAULT_SCALE_FACTOR
}

/// Saved planning session: drawings, measurements, annotations and calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub version: u32,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f32,
    pub objects: Vec<ObjectRecord>,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl ProjectSnapshot {
    /// Committed state only; previews and click markers are not saved.
    pub fn capture(registry: &ObjectRegistry, scale: &SceneScale) -> Self {
        Self {
            version: PROJECT_FORMAT_VERSION,
            scale_factor: scale.scale_factor(),
            objects: registry.objects().iter().map(ObjectRecord::capture).collect(),
            measurements: registry.measurements().to_vec(),
            annotations: registry.annotations().to_vec(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ProjectError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Validate everything and build a fresh registry. Nothing is applied on error.
    pub fn into_registry(self) -> Result<ObjectRegistry, ProjectError> {
        if self.version != PROJECT_FORMAT_VERSION {
            return Err(ProjectError::UnsupportedVersion {
                found: self.version,
            });
        }
        if !(self.scale_factor.is_finite() && self.scale_factor > 0.0) {
            return Err(ProjectError::InvalidScaleFactor(self.scale_factor));
        }

        let mut object_ids = HashSet::new();
        let mut objects = Vec::with_capacity(self.objects.len());
        for record in &self.objects {
            if !object_ids.insert(record.id) {
                return Err(ProjectError::DuplicateId {
                    kind: "object",
                    id: record.id.0,
                });
            }
            objects.push(record.rebuild()?);
        }

        let mut measurement_ids: HashSet<MeasurementId> = HashSet::new();
        for measurement in &self.measurements {
            if !measurement_ids.insert(measurement.id) {
                return Err(ProjectError::DuplicateId {
                    kind: "measurement",
                    id: measurement.id.0,
                });
            }
            if let Some(missing) = measurement
                .related
                .iter()
                .find(|id| !object_ids.contains(id))
            {
                return Err(ProjectError::MissingObject {
                    owner: format!("measurement {}", measurement.id.0),
                    object: missing.0,
                });
            }
        }

        let mut annotation_ids: HashSet<AnnotationId> = HashSet::new();
        for annotation in &self.annotations {
            if !annotation_ids.insert(annotation.id) {
                return Err(ProjectError::DuplicateId {
                    kind: "annotation",
                    id: u64::from(annotation.id.0),
                });
            }
            if !object_ids.contains(&annotation.marker) {
                return Err(ProjectError::MissingObject {
                    owner: format!("annotation {}", annotation.id),
                    object: annotation.marker.0,
                });
            }
        }

        for object in &objects {
            let dangling = match object.owner {
                Some(ObjectOwner::Measurement(id)) if !measurement_ids.contains(&id) => {
                    Some(format!("measurement {}", id.0))
                }
                Some(ObjectOwner::Annotation(id)) if !annotation_ids.contains(&id) => {
                    Some(format!("annotation {}", id))
                }
                _ => None,
            };
            if let Some(owner) = dangling {
                return Err(ProjectError::MissingOwner {
                    object: object.id.0,
                    owner,
                });
            }
        }

        Ok(ObjectRegistry::from_parts(
            objects,
            self.measurements,
            self.annotations,
        ))
    }
}

impl ObjectRegistry {
    /// Replace the whole registry with a saved project and drop the gesture
    /// in progress. On error the registry, session and scale are untouched.
    pub fn restore(
        &mut self,
        snapshot: ProjectSnapshot,
        scale: &mut SceneScale,
        session: &mut InteractionSession,
    ) -> Result<(), ProjectError> {
        let scale_factor = snapshot.scale_factor;
        let restored = snapshot.into_registry()?;
        scale
            .set_scale_factor(scale_factor)
            .map_err(|_| ProjectError::InvalidScaleFactor(scale_factor))?;
        session.discard(self);
        self.replace_with(restored);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementEntry {
    pub id: MeasurementId,
    pub kind: MeasurementKind,
    pub value: f32,
    pub unit: &'static str,
    pub text: String,
    pub anchors: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationEntry {
    pub id: AnnotationId,
    pub title: String,
    pub note: String,
    pub anchor: Vec3,
}

/// Read-only listing for report export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    pub scale_factor: f32,
    pub measurements: Vec<MeasurementEntry>,
    pub annotations: Vec<AnnotationEntry>,
}

impl PlanReport {
    pub fn collect(registry: &ObjectRegistry, scale: &SceneScale) -> Self {
        let measurements = registry
            .measurements()
            .iter()
            .map(|m| MeasurementEntry {
                id: m.id,
                kind: m.kind,
                value: m.value,
                unit: m.unit.symbol(),
                text: m.display_value(),
                anchors: m.anchors.clone(),
            })
            .collect();
        let annotations = registry
            .annotations()
            .iter()
            .map(|a| AnnotationEntry {
                id: a.id,
                title: a.title(),
                note: a.note.clone(),
                anchor: a.anchor(),
            })
            .collect();
        Self {
            scale_factor: scale.scale_factor(),
            measurements,
            annotations,
        }
    }
}
