//! Procedural primitives for debug markers and test scenes.

pub mod primitives;

pub use primitives::{generate_cube, generate_plane, generate_sphere};

use crate::gfx::scene::mesh::MeshSource;

#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    pub vertices: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flattens into mesh streams; vertex colors are left to the material.
    pub fn into_mesh_source(self) -> MeshSource {
        MeshSource {
            positions: self.vertices.into_iter().flatten().collect(),
            normals: Some(self.normals.into_iter().flatten().collect()),
            colors: None,
            uvs: Some(self.tex_coords.into_iter().flatten().collect()),
            indices: self.indices,
        }
    }
}
