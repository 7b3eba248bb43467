//! A drawable scene node: meshes, one transform, and its normal matrix.

use std::rc::Rc;

use cgmath::{Matrix, Matrix4, SquareMatrix};

use super::mesh::SharedMesh;
use crate::error::{StageError, StageResult};
use crate::gfx::camera::camera_utils::{convert_matrix4_to_array, MatrixUniform};
use crate::gfx::rendering::frame::PassState;
use crate::gfx::resources::bind_group_layouts::{SceneLayouts, TRANSFORM_GROUP};
use crate::gfx::resources::material::SharedMaterial;
use crate::gfx::transform::Transform;
use crate::wgpu_utils::{BindGroupBuilder, StagedUniform};

/// Stage-assigned handle, stable for the prop's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropId(pub(crate) u64);

struct PropGpu {
    model: StagedUniform<MatrixUniform>,
    normal: StagedUniform<MatrixUniform>,
    bind_group: wgpu::BindGroup,
}

pub struct Prop {
    pub name: String,
    pub transform: Transform,
    id: Option<PropId>,
    meshes: Vec<SharedMesh>,
    normal_matrix: Matrix4<f32>,
    gpu: Option<PropGpu>,
}

impl Prop {
    pub fn new(name: impl Into<String>, meshes: Vec<SharedMesh>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            id: None,
            meshes,
            normal_matrix: Matrix4::identity(),
            gpu: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn id(&self) -> Option<PropId> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: PropId) {
        self.id = Some(id);
    }

    pub fn meshes(&self) -> &[SharedMesh] {
        &self.meshes
    }

    /// Distinct materials across the prop's meshes, in mesh order.
    pub fn materials(&self) -> Vec<SharedMaterial> {
        let mut materials: Vec<SharedMaterial> = Vec::new();
        for mesh in &self.meshes {
            if !materials.iter().any(|m| Rc::ptr_eq(m, mesh.material())) {
                materials.push(Rc::clone(mesh.material()));
            }
        }
        materials
    }

    /// Normal matrix from the last `build_normal_matrix`/`build_buffers`.
    pub fn normal_matrix(&self) -> Matrix4<f32> {
        self.normal_matrix
    }

    /// Inverse-transpose of the current transform.
    pub fn build_normal_matrix(&mut self) -> StageResult<Matrix4<f32>> {
        let inverse = self
            .transform
            .matrix
            .invert()
            .ok_or_else(|| StageError::NonInvertibleTransform {
                prop: self.name.clone(),
            })?;
        self.normal_matrix = inverse.transpose();
        Ok(self.normal_matrix)
    }

    /// Retints every mesh material. Returns how many materials took the color.
    pub fn change_color(&self, color: [f32; 3]) -> usize {
        let mut changed = 0;
        for material in self.materials() {
            let mut material = material.borrow_mut();
            if material.set_color(color) {
                changed += 1;
            } else {
                log::warn!(
                    "prop '{}': material '{}' has no color uniform",
                    self.name,
                    material.name
                );
            }
        }
        changed
    }

    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Uploads mesh geometry, prepares materials and creates the transform
    /// group (model 0, normal 1). Later calls are no-ops.
    pub fn initialize(
        &mut self,
        device: &wgpu::Device,
        layouts: &SceneLayouts,
        frames_in_flight: usize,
    ) -> StageResult<()> {
        if self.gpu.is_some() {
            return Ok(());
        }
        for mesh in &self.meshes {
            mesh.initialize(device, layouts, frames_in_flight)?;
        }

        let model = StagedUniform::new(device, &format!("{} model", self.name), frames_in_flight);
        let normal = StagedUniform::new(device, &format!("{} normal", self.name), frames_in_flight);
        let bind_group = BindGroupBuilder::new(&layouts.transform)
            .resource(model.binding_resource())
            .resource(normal.binding_resource())
            .create(device, &format!("{} transform group", self.name));

        self.gpu = Some(PropGpu {
            model,
            normal,
            bind_group,
        });
        Ok(())
    }

    /// Stages the transform and normal matrices, then each mesh material.
    pub fn build_buffers(&mut self, device: &wgpu::Device, frame: u64) -> StageResult<()> {
        let normal = convert_matrix4_to_array(self.build_normal_matrix()?);
        let model = self.transform.to_cols_array();

        let gpu = self.gpu.as_mut().ok_or(StageError::NotInitialized)?;
        gpu.model.stage(device, &model);
        gpu.normal.stage(device, &normal);

        for mesh in &self.meshes {
            mesh.build_buffers(device, frame)?;
        }
        Ok(())
    }

    pub fn encode_commands(&mut self, encoder: &mut wgpu::CommandEncoder, frame: u64) -> StageResult<()> {
        let gpu = self.gpu.as_mut().ok_or(StageError::NotInitialized)?;
        gpu.model.encode(encoder);
        gpu.normal.encode(encoder);

        for mesh in &self.meshes {
            mesh.encode_commands(encoder, frame)?;
        }
        Ok(())
    }

    pub fn reclaim(&mut self) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.model.reclaim();
            gpu.normal.reclaim();
        }
        for material in self.materials() {
            material.borrow_mut().reclaim();
        }
    }

    /// One indexed draw per mesh: pipeline, material groups, transform
    /// group, vertex and index streams.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, state: &mut PassState<'_>) -> StageResult<()> {
        let gpu = self.gpu.as_ref().ok_or(StageError::NotInitialized)?;
        for mesh in &self.meshes {
            mesh.bind_material(pass, state)?;
            pass.set_bind_group(TRANSFORM_GROUP, &gpu.bind_group, &[]);
            mesh.draw_geometry(pass)?;
        }
        if let Some(id) = self.id {
            state.record_draw(id, self.meshes.len());
        }
        Ok(())
    }
}
