//! Small wgpu helpers: binding builders and staged uniform buffers.

pub mod binding_builder;
pub mod binding_types;
pub mod staged_buffer;

pub use binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc};
pub use staged_buffer::{StagedBuffer, StagedUniform, DEFAULT_FRAMES_IN_FLIGHT};
