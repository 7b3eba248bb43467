//! Materials, textures and the bind-group layouts they are drawn through.

pub mod bind_group_layouts;
pub mod material;
pub mod texture_resource;

pub use bind_group_layouts::SceneLayouts;
pub use material::{Material, MaterialShape, Shading, ShadingModel, SharedMaterial};
pub use texture_resource::TextureResource;
