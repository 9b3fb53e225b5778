use crate::tools::registry::{DrawnKind, DrawnObject, ObjectId, ObjectRegistry};
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

/// Render entity of a registry object.
#[derive(Component, Debug)]
pub struct DrawnObjectEntity(pub ObjectId);

#[derive(Resource, Default, Debug)]
pub struct RenderedObjects {
    entities: HashMap<ObjectId, Entity>,
    /// Registry generation the entities were built from.
    generation: u64,
}

impl RenderedObjects {
    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

pub fn material_for(object: &DrawnObject) -> StandardMaterial {
    let style = object.style;
    let alpha_mode = if style.opacity < 1.0 {
        AlphaMode::Blend
    } else {
        AlphaMode::Opaque
    };
    match object.kind() {
        DrawnKind::Fill => StandardMaterial {
            base_color: style.to_color(),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            double_sided: true,
            cull_mode: None,
            depth_bias: 1.0,
            ..default()
        },
        DrawnKind::Marker => StandardMaterial {
            base_color: style.to_color(),
            alpha_mode,
            unlit: true,
            ..default()
        },
        DrawnKind::Stroke => StandardMaterial {
            base_color: style.to_color(),
            alpha_mode,
            perceptual_roughness: 0.6,
            ..default()
        },
    }
}

/// Spawn entities for new registry objects and dispose of removed ones.
pub fn sync_drawn_objects(
    mut commands: Commands,
    registry: Res<ObjectRegistry>,
    mut rendered: ResMut<RenderedObjects>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    handles: Query<(&Mesh3d, &MeshMaterial3d<StandardMaterial>), With<DrawnObjectEntity>>,
) {
    if !registry.is_changed() {
        return;
    }

    // A replaced registry may reuse ids for different geometry, so nothing carries over.
    let replaced = rendered.generation != registry.generation();
    rendered.generation = registry.generation();
    let live: HashSet<ObjectId> = if replaced {
        HashSet::new()
    } else {
        registry.rendered_objects().map(|o| o.id).collect()
    };
    let mut disposed = 0;
    rendered.entities.retain(|id, entity| {
        if live.contains(id) {
            return true;
        }
        if let Ok((mesh, material)) = handles.get(*entity) {
            meshes.remove(&mesh.0);
            materials.remove(&material.0);
        }
        commands.entity(*entity).despawn();
        disposed += 1;
        false
    });

    let mut spawned = 0;
    for object in registry.rendered_objects() {
        if rendered.entities.contains_key(&object.id) {
            continue;
        }
        let entity = commands
            .spawn((
                Mesh3d(meshes.add(object.geometry.to_mesh())),
                MeshMaterial3d(materials.add(material_for(object))),
                object.geometry.transform(),
                DrawnObjectEntity(object.id),
            ))
            .id();
        rendered.entities.insert(object.id, entity);
        spawned += 1;
    }

    if spawned + disposed > 0 {
        debug!(
            "Drawn objects: +{} -{} ({} live)",
            spawned,
            disposed,
            rendered.len()
        );
    }
}
