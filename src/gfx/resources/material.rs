//! Materials as a tagged shading model over a fixed set of uniforms.
//!
//! Every material may carry a diffuse texture (slot 2). Lit models add one
//! group at slot 3 whose uniforms come from [`SHADING_TABLE`]. The shape of a
//! material (model plus textured flag) is fixed at construction and must
//! match the pipeline it is paired with.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::bind_group_layouts::{SceneLayouts, MODEL_GROUP, TEXTURE_GROUP};
use super::texture_resource::TextureResource;
use crate::error::{StageError, StageResult};
use crate::gfx::rendering::frame::PassState;
use crate::gfx::rendering::pipeline_manager::ShaderPipeline;
use crate::wgpu_utils::{BindGroupBuilder, StagedBuffer};

/// Materials are shared between meshes, never cloned per mesh.
pub type SharedMaterial = Rc<RefCell<Material>>;

/// Lighting model a material is shaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingModel {
    Unlit,
    Phong,
    Pbr,
}

/// One uniform buffer in a shading model's group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformField {
    Color,
    Roughness,
    Metallic,
}

impl UniformField {
    pub const fn size(self) -> u64 {
        match self {
            UniformField::Color => 12,
            UniformField::Roughness | UniformField::Metallic => 4,
        }
    }
}

/// Row of the dispatch table: which uniforms a model binds and whether its
/// shader reads the stage lights.
#[derive(Debug)]
pub struct ShadingLayout {
    pub model: ShadingModel,
    pub uniforms: &'static [UniformField],
    pub lit: bool,
}

pub static SHADING_TABLE: [ShadingLayout; 3] = [
    ShadingLayout {
        model: ShadingModel::Unlit,
        uniforms: &[],
        lit: false,
    },
    ShadingLayout {
        model: ShadingModel::Phong,
        uniforms: &[UniformField::Color],
        lit: true,
    },
    ShadingLayout {
        model: ShadingModel::Pbr,
        uniforms: &[
            UniformField::Color,
            UniformField::Roughness,
            UniformField::Metallic,
        ],
        lit: true,
    },
];

impl ShadingModel {
    pub fn layout(self) -> &'static ShadingLayout {
        match self {
            ShadingModel::Unlit => &SHADING_TABLE[0],
            ShadingModel::Phong => &SHADING_TABLE[1],
            ShadingModel::Pbr => &SHADING_TABLE[2],
        }
    }
}

/// Shading model plus texturing: together they select the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialShape {
    pub model: ShadingModel,
    pub textured: bool,
}

impl MaterialShape {
    pub const fn new(model: ShadingModel, textured: bool) -> Self {
        Self { model, textured }
    }

    /// Fails unless a pipeline built for `pipeline_shape` can draw this shape.
    pub fn check_pipeline(
        self,
        material: &str,
        pipeline: &str,
        pipeline_shape: MaterialShape,
    ) -> StageResult<()> {
        if self == pipeline_shape {
            Ok(())
        } else {
            Err(StageError::MaterialPipelineMismatch {
                material: material.to_owned(),
                pipeline: pipeline.to_owned(),
                material_shape: self,
                pipeline_shape,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shading {
    Unlit,
    Phong {
        color: [f32; 3],
    },
    Pbr {
        color: [f32; 3],
        roughness: f32,
        metallic: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldValue {
    Vec3([f32; 3]),
    Scalar(f32),
}

impl FieldValue {
    fn bytes(&self) -> &[u8] {
        match self {
            FieldValue::Vec3(v) => bytemuck::bytes_of(v),
            FieldValue::Scalar(s) => bytemuck::bytes_of(s),
        }
    }
}

impl Shading {
    pub fn model(&self) -> ShadingModel {
        match self {
            Shading::Unlit => ShadingModel::Unlit,
            Shading::Phong { .. } => ShadingModel::Phong,
            Shading::Pbr { .. } => ShadingModel::Pbr,
        }
    }

    fn field(&self, field: UniformField) -> Option<FieldValue> {
        match (self, field) {
            (Shading::Phong { color } | Shading::Pbr { color, .. }, UniformField::Color) => {
                Some(FieldValue::Vec3(*color))
            }
            (Shading::Pbr { roughness, .. }, UniformField::Roughness) => {
                Some(FieldValue::Scalar(*roughness))
            }
            (Shading::Pbr { metallic, .. }, UniformField::Metallic) => {
                Some(FieldValue::Scalar(*metallic))
            }
            _ => None,
        }
    }
}

struct MaterialGpu {
    texture_group: Option<wgpu::BindGroup>,
    uniforms: Vec<(UniformField, StagedBuffer)>,
    model_group: Option<wgpu::BindGroup>,
}

/// Surface description shared by meshes
///
/// The shading variant and `textured` flag are fixed at construction, so a
/// material can only ever be paired with pipelines of one shape. Uniform
/// values can change every frame.
pub struct Material {
    pub name: String,
    pub diffuse: Option<TextureResource>,
    /// Vertex color for meshes that carry none.
    pub default_color: [f32; 4],
    textured: bool,
    shading: Shading,
    pipeline: Option<Arc<ShaderPipeline>>,
    gpu: Option<MaterialGpu>,
    built_frame: Option<u64>,
    encoded_frame: Option<u64>,
}

impl Material {
    pub fn new(name: impl Into<String>, shading: Shading) -> Self {
        Self {
            name: name.into(),
            diffuse: None,
            default_color: [1.0, 1.0, 1.0, 1.0],
            textured: false,
            shading,
            pipeline: None,
            gpu: None,
            built_frame: None,
            encoded_frame: None,
        }
    }

    pub fn unlit(name: impl Into<String>) -> Self {
        Self::new(name, Shading::Unlit)
    }

    pub fn phong(name: impl Into<String>, color: [f32; 3]) -> Self {
        Self::new(name, Shading::Phong { color })
    }

    /// Creates a physically based material
    ///
    /// # Arguments
    /// * `name` - Name used for lookups and buffer labels
    /// * `color` - Linear RGB albedo
    /// * `roughness` - Microfacet roughness (0.0-1.0)
    /// * `metallic` - Metallic factor (0.0-1.0)
    pub fn pbr(name: impl Into<String>, color: [f32; 3], roughness: f32, metallic: f32) -> Self {
        Self::new(
            name,
            Shading::Pbr {
                color,
                roughness: roughness.clamp(0.0, 1.0),
                metallic: metallic.clamp(0.0, 1.0),
            },
        )
    }

    /// Attaches a diffuse texture and marks the material textured.
    pub fn with_texture(mut self, texture: TextureResource) -> Self {
        self.diffuse = Some(texture);
        self.textured = true;
        self
    }

    /// Declares the material textured; the texture must be supplied before
    /// `initialize_bind_group`.
    pub fn with_textured(mut self, textured: bool) -> Self {
        self.textured = textured;
        self
    }

    pub fn with_default_color(mut self, color: [f32; 4]) -> Self {
        self.default_color = color;
        self
    }

    pub fn into_shared(self) -> SharedMaterial {
        Rc::new(RefCell::new(self))
    }

    pub fn shape(&self) -> MaterialShape {
        MaterialShape::new(self.shading.model(), self.textured)
    }

    pub fn shading(&self) -> &Shading {
        &self.shading
    }

    pub fn is_textured(&self) -> bool {
        self.textured
    }

    /// Base color, `None` for unlit materials.
    pub fn color(&self) -> Option<[f32; 3]> {
        match self.shading {
            Shading::Unlit => None,
            Shading::Phong { color } | Shading::Pbr { color, .. } => Some(color),
        }
    }

    /// Returns false for models without a color uniform.
    pub fn set_color(&mut self, new_color: [f32; 3]) -> bool {
        match &mut self.shading {
            Shading::Unlit => false,
            Shading::Phong { color } | Shading::Pbr { color, .. } => {
                *color = new_color;
                true
            }
        }
    }

    pub fn set_roughness(&mut self, value: f32) -> bool {
        match &mut self.shading {
            Shading::Pbr { roughness, .. } => {
                *roughness = value.clamp(0.0, 1.0);
                true
            }
            _ => false,
        }
    }

    pub fn set_metallic(&mut self, value: f32) -> bool {
        match &mut self.shading {
            Shading::Pbr { metallic, .. } => {
                *metallic = value.clamp(0.0, 1.0);
                true
            }
            _ => false,
        }
    }

    /// Pairs the material with the pipeline it will be drawn with
    ///
    /// # Arguments
    /// * `pipeline` - Must have been built for this material's shape
    ///
    /// # Returns
    /// `MaterialPipelineMismatch` if the shapes differ; the previous pairing
    /// is kept in that case
    pub fn assign_pipeline(&mut self, pipeline: &Arc<ShaderPipeline>) -> StageResult<()> {
        self.shape()
            .check_pipeline(&self.name, &pipeline.label, pipeline.shape)?;
        log::debug!("material '{}' paired with '{}'", self.name, pipeline.label);
        self.pipeline = Some(Arc::clone(pipeline));
        Ok(())
    }

    pub fn pipeline(&self) -> Option<&Arc<ShaderPipeline>> {
        self.pipeline.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Creates the resident uniforms and bind groups. Later calls are no-ops.
    pub fn initialize_bind_group(
        &mut self,
        device: &wgpu::Device,
        layouts: &SceneLayouts,
        frames_in_flight: usize,
    ) -> StageResult<()> {
        if self.gpu.is_some() {
            return Ok(());
        }

        let texture_group = if self.textured {
            let texture = self
                .diffuse
                .as_ref()
                .ok_or_else(|| StageError::MissingTexture(self.name.clone()))?;
            Some(
                BindGroupBuilder::new(&layouts.texture)
                    .texture(&texture.view)
                    .sampler(&texture.sampler)
                    .create(device, &format!("{} texture group", self.name)),
            )
        } else {
            None
        };

        let model = self.shading.model();
        let uniforms: Vec<(UniformField, StagedBuffer)> = model
            .layout()
            .uniforms
            .iter()
            .map(|&field| {
                let label = format!("{} {:?}", self.name, field);
                (field, StagedBuffer::new(device, &label, field.size(), frames_in_flight))
            })
            .collect();

        let model_group = layouts.for_model(model).map(|layout| {
            uniforms
                .iter()
                .fold(BindGroupBuilder::new(layout), |builder, (_, buffer)| {
                    builder.buffer(buffer.resident())
                })
                .create(device, &format!("{} {:?} group", self.name, model))
        });

        self.gpu = Some(MaterialGpu {
            texture_group,
            uniforms,
            model_group,
        });
        Ok(())
    }

    /// Stages the current uniform values, at most once per frame.
    pub fn build_buffers(&mut self, device: &wgpu::Device, frame: u64) -> StageResult<()> {
        if self.built_frame == Some(frame) {
            return Ok(());
        }
        let gpu = self.gpu.as_mut().ok_or(StageError::NotInitialized)?;
        for (field, buffer) in gpu.uniforms.iter_mut() {
            if let Some(value) = self.shading.field(*field) {
                buffer.stage(device, value.bytes());
            }
        }
        self.built_frame = Some(frame);
        Ok(())
    }

    /// Records the staging copies, at most once per frame.
    pub fn encode_commands(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        frame: u64,
    ) -> StageResult<()> {
        if self.encoded_frame == Some(frame) {
            return Ok(());
        }
        let gpu = self.gpu.as_mut().ok_or(StageError::NotInitialized)?;
        for (_, buffer) in gpu.uniforms.iter_mut() {
            buffer.encode(encoder);
        }
        self.encoded_frame = Some(frame);
        Ok(())
    }

    /// Returns spent staging buffers to the ring after submit.
    pub fn reclaim(&mut self) {
        if let Some(gpu) = self.gpu.as_mut() {
            for (_, buffer) in gpu.uniforms.iter_mut() {
                buffer.reclaim();
            }
        }
    }

    /// Binds the texture group (slot 2) and then the model group (slot 3).
    /// Lit materials without a texture get the stage lights back on slot 2
    /// if an earlier textured draw replaced them.
    pub fn set_bind_groups(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        state: &mut PassState<'_>,
    ) -> StageResult<()> {
        let gpu = self.gpu.as_ref().ok_or(StageError::NotInitialized)?;

        match &gpu.texture_group {
            Some(group) => {
                pass.set_bind_group(TEXTURE_GROUP, group, &[]);
                state.slot_two_replaced();
            }
            None if self.shading.model().layout().lit => state.ensure_lights(pass),
            None => {}
        }

        if let Some(group) = &gpu.model_group {
            pass.set_bind_group(MODEL_GROUP, group, &[]);
        }
        Ok(())
    }
}
