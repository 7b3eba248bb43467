//! # Prismatic Prelude
//!
//! Common types for building and rendering a stage.
//!
//! ```rust
//! use prismatic::prelude::*;
//!
//! let mut stage = Stage::new(StageConfig::default().with_light_seed(1)).unwrap();
//! let material = stage.add_material(Material::phong("white", colors::WHITE)).unwrap();
//! let mesh = MeshData::new("cube", generate_cube().into_mesh_source(), material).unwrap();
//! stage.add_prop(Prop::new("cube", vec![std::rc::Rc::new(mesh)])).unwrap();
//! ```

pub use crate::config::{CameraConfig, RenderConfig, StageConfig, SunConfig};
pub use crate::error::{StageError, StageResult};

pub use crate::gfx::camera::{Camera, FlyCameraController, InputState};
pub use crate::gfx::geometry::{generate_cube, generate_plane, generate_sphere, GeometryData};
pub use crate::gfx::lighting::{colors, Light, LightType, MAX_LIGHTS};
pub use crate::gfx::rendering::{PassReport, RenderEngine};
pub use crate::gfx::resources::{Material, Shading, TextureResource};
pub use crate::gfx::scene::{LightHandle, MeshData, MeshSource, Prop, PropId, Stage, StageLoader};
pub use crate::gfx::transform::Transform;

pub use cgmath::{Deg, InnerSpace, Quaternion, Rotation3, Vector3, Zero};
