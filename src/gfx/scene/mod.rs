//! # Scene Module
//!
//! Geometry, props and the stage that draws them.
//!
//! - [`MeshData`] - immutable vertex streams plus a shared material
//! - [`Prop`] - a transform over one or more meshes
//! - [`Stage`] - props, lights and camera, and the per-frame protocol
//! - [`StageLoader`] - OBJ import into a stage

pub mod loader;
pub mod mesh;
pub mod prop;
pub mod stage;
pub mod vertex;

pub use loader::{LoadSummary, StageLoader};
pub use mesh::{MeshData, MeshSource, SharedMesh};
pub use prop::{Prop, PropId};
pub use stage::{LightHandle, Stage, StageStatistics};
