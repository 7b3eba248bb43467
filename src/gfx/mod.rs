//! # Graphics Module
//!
//! Scene graph, materials and the rendering that consumes them.
//!
//! - **Transforms and camera** ([`transform`], [`camera`]) - affine math and
//!   the free-fly camera
//! - **Lighting** ([`lighting`]) - the sun, point lights and their packed records
//! - **Resources** ([`resources`]) - materials, textures and bind-group layouts
//! - **Scene** ([`scene`]) - meshes, props and the [`Stage`] that owns them
//! - **Rendering** ([`rendering`]) - pipelines, frame ordering and the engine
//!
//! ```no_run
//! use prismatic::gfx::{RenderEngine, Stage};
//! use prismatic::{RenderConfig, StageConfig};
//!
//! # fn main() -> prismatic::StageResult<()> {
//! let mut engine = pollster::block_on(RenderEngine::new_headless(640, 480, RenderConfig::default()))?;
//! let mut stage = Stage::new(StageConfig::default())?;
//! engine.attach_stage(&mut stage)?;
//! let report = engine.render_frame(&mut stage)?;
//! # let _ = report;
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod geometry;
pub mod lighting;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod transform;

pub use camera::Camera;
pub use rendering::RenderEngine;
pub use scene::Stage;
pub use transform::Transform;
