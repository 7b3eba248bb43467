//! Immutable geometry plus the material it is drawn with.

use std::cell::OnceCell;
use std::rc::Rc;

use wgpu::util::DeviceExt;

use crate::error::{StageError, StageResult};
use crate::gfx::rendering::frame::PassState;
use crate::gfx::resources::bind_group_layouts::SceneLayouts;
use crate::gfx::resources::material::SharedMaterial;

/// Resident geometry buffers, uploaded once.
pub struct MeshBuffers {
    pub positions: wgpu::Buffer,
    pub colors: wgpu::Buffer,
    pub normals: wgpu::Buffer,
    pub uvs: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    pub index_count: u32,
}

pub struct MeshData {
    pub name: String,
    positions: Vec<f32>,
    normals: Vec<f32>,
    colors: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u16>,
    material: SharedMaterial,
    gpu: OnceCell<MeshBuffers>,
}

/// Raw arrays as they come out of a loader or generator. Missing streams are
/// derived: normals from faces, colors from the material, uvs as zero.
#[derive(Debug, Clone, Default)]
pub struct MeshSource {
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    pub colors: Option<Vec<f32>>,
    pub uvs: Option<Vec<f32>>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(
        name: impl Into<String>,
        source: MeshSource,
        material: SharedMaterial,
    ) -> StageResult<Self> {
        let name = name.into();
        let invalid = |reason: String| StageError::InvalidMesh(format!("{name}: {reason}"));

        if source.positions.is_empty() || source.positions.len() % 3 != 0 {
            return Err(invalid(format!(
                "{} position floats is not a whole number of vertices",
                source.positions.len()
            )));
        }
        let vertex_count = source.positions.len() / 3;
        if vertex_count > u16::MAX as usize + 1 {
            return Err(invalid(format!(
                "{vertex_count} vertices exceed 16-bit indexing"
            )));
        }
        if source.indices.is_empty() {
            return Err(invalid("no triangles to draw".to_string()));
        }
        if source.indices.len() % 3 != 0 {
            return Err(invalid(format!(
                "{} indices is not a whole number of triangles",
                source.indices.len()
            )));
        }
        if let Some(bad) = source.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(invalid(format!(
                "index {bad} out of range for {vertex_count} vertices"
            )));
        }

        let check_len = |stream: &str, data: &Option<Vec<f32>>, width: usize| match data {
            Some(values) if values.len() != vertex_count * width => Err(invalid(format!(
                "{stream} has {} floats, expected {}",
                values.len(),
                vertex_count * width
            ))),
            _ => Ok(()),
        };
        check_len("normals", &source.normals, 3)?;
        check_len("colors", &source.colors, 3)?;
        check_len("uvs", &source.uvs, 2)?;

        let indices: Vec<u16> = source.indices.iter().map(|&i| i as u16).collect();
        let normals = source
            .normals
            .unwrap_or_else(|| compute_vertex_normals(&source.positions, &indices));
        let colors = source.colors.unwrap_or_else(|| {
            let [r, g, b, _] = material.borrow().default_color;
            [r, g, b].repeat(vertex_count)
        });
        let uvs = source.uvs.unwrap_or_else(|| vec![0.0; vertex_count * 2]);

        Ok(Self {
            name,
            positions: source.positions,
            normals,
            colors,
            uvs,
            indices,
            material,
            gpu: OnceCell::new(),
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn uvs(&self) -> &[f32] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.get().is_some()
    }

    /// Uploads the geometry on first call and prepares the material's
    /// resident uniforms.
    pub fn initialize(
        &self,
        device: &wgpu::Device,
        layouts: &SceneLayouts,
        frames_in_flight: usize,
    ) -> StageResult<()> {
        self.upload(device);
        self.material
            .borrow_mut()
            .initialize_bind_group(device, layouts, frames_in_flight)
    }

    pub fn upload(&self, device: &wgpu::Device) -> &MeshBuffers {
        self.gpu.get_or_init(|| {
            log::debug!(
                "uploading mesh '{}' ({} vertices, {} indices)",
                self.name,
                self.vertex_count(),
                self.indices.len()
            );
            let vertex_buffer = |label: &str, data: &[f32]| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} {label}", self.name)),
                    contents: bytemuck::cast_slice(data),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            };
            MeshBuffers {
                positions: vertex_buffer("positions", &self.positions),
                colors: vertex_buffer("colors", &self.colors),
                normals: vertex_buffer("normals", &self.normals),
                uvs: vertex_buffer("uvs", &self.uvs),
                indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} indices", self.name)),
                    contents: bytemuck::cast_slice(&self.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: self.indices.len() as u32,
            }
        })
    }

    /// Geometry is resident already; only the material stages per frame.
    pub fn build_buffers(&self, device: &wgpu::Device, frame: u64) -> StageResult<()> {
        self.material.borrow_mut().build_buffers(device, frame)
    }

    pub fn encode_commands(&self, encoder: &mut wgpu::CommandEncoder, frame: u64) -> StageResult<()> {
        self.material.borrow_mut().encode_commands(encoder, frame)
    }

    /// Binds the material's pipeline and groups.
    pub fn bind_material(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        state: &mut PassState<'_>,
    ) -> StageResult<()> {
        let material = self.material.borrow();
        let pipeline = material
            .pipeline()
            .ok_or_else(|| StageError::MissingPipeline(material.name.clone()))?;
        state.set_pipeline(pass, pipeline);
        material.set_bind_groups(pass, state)
    }

    /// Binds the four vertex streams and the index stream, then draws.
    pub fn draw_geometry(&self, pass: &mut wgpu::RenderPass<'_>) -> StageResult<()> {
        let buffers = self.gpu.get().ok_or(StageError::NotInitialized)?;
        pass.set_vertex_buffer(0, buffers.positions.slice(..));
        pass.set_vertex_buffer(1, buffers.colors.slice(..));
        pass.set_vertex_buffer(2, buffers.normals.slice(..));
        pass.set_vertex_buffer(3, buffers.uvs.slice(..));
        pass.set_index_buffer(buffers.indices.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..buffers.index_count, 0, 0..1);
        Ok(())
    }
}

/// Area-weighted per-vertex normals from triangle faces.
pub fn compute_vertex_normals(positions: &[f32], indices: &[u16]) -> Vec<f32> {
    let mut normals = vec![0.0f32; positions.len()];
    let vertex = |i: usize| [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let (v0, v1, v2) = (vertex(i0), vertex(i1), vertex(i2));
        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let face = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        for index in [i0, i1, i2] {
            for axis in 0..3 {
                normals[index * 3 + axis] += face[axis];
            }
        }
    }

    for normal in normals.chunks_exact_mut(3) {
        let length = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        if length > 0.0 {
            normal.iter_mut().for_each(|n| *n /= length);
        }
    }
    normals
}

pub type SharedMesh = Rc<MeshData>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::resources::material::Material;
    use approx::assert_abs_diff_eq;

    fn triangle() -> MeshSource {
        MeshSource {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn missing_streams_are_filled() {
        let material = Material::unlit("flat")
            .with_default_color([0.2, 0.4, 0.6, 1.0])
            .into_shared();
        let mesh = MeshData::new("tri", triangle(), material).unwrap();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.colors(), &[0.2f32, 0.4, 0.6, 0.2, 0.4, 0.6, 0.2, 0.4, 0.6]);
        assert_eq!(mesh.uvs(), &[0.0f32; 6]);
        for normal in mesh.normals().chunks(3) {
            assert_abs_diff_eq!(normal[2], 1.0, epsilon = 1e-6);
        }
        assert_eq!(mesh.indices(), &[0u16, 1, 2]);
        assert!(!mesh.is_uploaded());
    }

    #[test]
    fn meshes_share_one_material() {
        let material = Material::phong("shared", [1.0, 1.0, 1.0]).into_shared();
        let a = MeshData::new("a", triangle(), Rc::clone(&material)).unwrap();
        let b = MeshData::new("b", triangle(), Rc::clone(&material)).unwrap();
        assert!(Rc::ptr_eq(a.material(), b.material()));
        assert_eq!(Rc::strong_count(&material), 3);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut source = triangle();
        source.indices = vec![0, 1, 3];
        let err = MeshData::new("bad", source, Material::unlit("m").into_shared());
        assert!(matches!(err, Err(StageError::InvalidMesh(_))));
    }

    #[test]
    fn faceless_mesh_is_rejected() {
        let source = MeshSource {
            positions: vec![0.0; 9],
            indices: vec![],
            ..Default::default()
        };
        let err = MeshData::new("points", source, Material::unlit("m").into_shared());
        assert!(matches!(err, Err(StageError::InvalidMesh(reason)) if reason.contains("points")));
    }

    #[test]
    fn stream_lengths_are_checked() {
        let mut source = triangle();
        source.uvs = Some(vec![0.0; 4]);
        assert!(MeshData::new("bad uv", source, Material::unlit("m").into_shared()).is_err());

        let mut source = triangle();
        source.positions.pop();
        assert!(MeshData::new("ragged", source, Material::unlit("m").into_shared()).is_err());
    }

    #[test]
    fn vertex_limit_follows_u16_indices() {
        let source = MeshSource {
            positions: vec![0.0; 3 * (u16::MAX as usize + 2)],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        assert!(MeshData::new("huge", source, Material::unlit("m").into_shared()).is_err());
    }

    #[test]
    fn shared_vertices_average_their_faces() {
        // two triangles folded along the x axis
        let positions = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, //
        ];
        let normals = compute_vertex_normals(&positions, &[0, 1, 2, 0, 3, 1]);
        // vertex 2 only touches the +z face
        assert_abs_diff_eq!(normals[8], 1.0, epsilon = 1e-6);
        // vertex 0 sits on both faces
        let n0 = &normals[0..3];
        assert_abs_diff_eq!(n0[1], n0[2], epsilon = 1e-6);
        assert_abs_diff_eq!(
            (n0[0] * n0[0] + n0[1] * n0[1] + n0[2] * n0[2]).sqrt(),
            1.0,
            epsilon = 1e-6
        );
    }
}
