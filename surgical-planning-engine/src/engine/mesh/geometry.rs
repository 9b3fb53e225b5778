use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;

/// CPU-side triangle buffers for a drawn object.
///
/// The registry keeps these so the eraser can test proximity against the
/// exact vertices that were uploaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffers {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl GeometryBuffers {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Upload into a render mesh. Main world usage is kept so the mesh can be
    /// read back if the object is rebuilt.
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        let positions: Vec<[f32; 3]> = self.positions.iter().map(|p| p.to_array()).collect();
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        if self.normals.len() == self.positions.len() {
            let normals: Vec<[f32; 3]> = self.normals.iter().map(|n| n.to_array()).collect();
            mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        }
        mesh.insert_indices(Indices::U32(self.indices.clone()));
        mesh
    }
}
