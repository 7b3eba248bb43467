//! The bind-group layouts every stage pipeline is assembled from.
//!
//! Slot 0 camera, 1 prop transform, 2 lights or diffuse texture,
//! 3 shading-model uniforms.

use super::material::{ShadingModel, UniformField};
use crate::gfx::lighting::{LightArray, LightRecord};
use crate::wgpu_utils::{binding_types, BindGroupLayoutBuilder, BindGroupLayoutWithDesc};

pub const CAMERA_GROUP: u32 = 0;
pub const TRANSFORM_GROUP: u32 = 1;
pub const LIGHTS_GROUP: u32 = 2;
pub const TEXTURE_GROUP: u32 = 2;
pub const MODEL_GROUP: u32 = 3;

const MATRIX_SIZE: u64 = 64;

pub struct SceneLayouts {
    /// view, projection, eye position
    pub camera: BindGroupLayoutWithDesc,
    /// model matrix, normal matrix
    pub transform: BindGroupLayoutWithDesc,
    /// diffuse texture, sampler
    pub texture: BindGroupLayoutWithDesc,
    /// sun record, light array
    pub lights: BindGroupLayoutWithDesc,
    pub phong: BindGroupLayoutWithDesc,
    pub pbr: BindGroupLayoutWithDesc,
}

impl SceneLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let camera = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform_sized(MATRIX_SIZE))
            .next_binding_rendering(binding_types::uniform_sized(MATRIX_SIZE))
            .next_binding_rendering(binding_types::uniform_sized(12))
            .create(device, "camera layout");

        let transform = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform_sized(MATRIX_SIZE))
            .next_binding_vertex(binding_types::uniform_sized(MATRIX_SIZE))
            .create(device, "transform layout");

        let texture = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "texture layout");

        let lights = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform_sized(LightRecord::SIZE as u64))
            .next_binding_fragment(binding_types::uniform_sized(LightArray::SIZE as u64))
            .create(device, "multi light layout");

        Self {
            camera,
            transform,
            texture,
            lights,
            phong: Self::model_layout(device, ShadingModel::Phong),
            pbr: Self::model_layout(device, ShadingModel::Pbr),
        }
    }

    fn model_layout(device: &wgpu::Device, model: ShadingModel) -> BindGroupLayoutWithDesc {
        model
            .layout()
            .uniforms
            .iter()
            .fold(BindGroupLayoutBuilder::new(), |builder, field: &UniformField| {
                builder.next_binding_fragment(binding_types::uniform_sized(field.size()))
            })
            .create(device, &format!("{model:?} layout"))
    }

    /// Layout of the slot-3 group for `model`, if it has one.
    pub fn for_model(&self, model: ShadingModel) -> Option<&BindGroupLayoutWithDesc> {
        match model {
            ShadingModel::Unlit => None,
            ShadingModel::Phong => Some(&self.phong),
            ShadingModel::Pbr => Some(&self.pbr),
        }
    }
}
