//! Pipelines, frame ordering and the render engine.

pub mod frame;
pub mod pipeline_manager;
pub mod render_engine;

pub use frame::{FramePhase, FrameSequence, PassReport, PassState};
pub use pipeline_manager::{LayoutSlot, PipelineConfig, PipelineLibrary, ShaderPipeline};
pub use render_engine::RenderEngine;
