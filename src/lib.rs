//! Prismatic scene renderer
//!
//! A stage of lit, textured props drawn with wgpu. Each frame stages the
//! CPU-side transforms, camera and lights into GPU-resident uniforms before
//! any draw reads them.

pub mod config;
pub mod error;
pub mod gfx;
pub mod prelude;
pub mod wgpu_utils;

pub use config::{CameraConfig, RenderConfig, StageConfig, SunConfig};
pub use error::{StageError, StageResult};
pub use gfx::rendering::RenderEngine;
pub use gfx::scene::Stage;
