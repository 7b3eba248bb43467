//! Error type shared by the stage, its resources and the render engine.

use thiserror::Error;

use crate::gfx::resources::material::MaterialShape;

pub type StageResult<T> = Result<T, StageError>;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("no compatible graphics adapter: {0}")]
    AdapterUnavailable(String),

    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("surface creation failed: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("device ran out of memory while {during}")]
    OutOfMemory { during: String },

    #[error("material '{material}' is {material_shape:?} but pipeline '{pipeline}' expects {pipeline_shape:?}")]
    MaterialPipelineMismatch {
        material: String,
        pipeline: String,
        material_shape: MaterialShape,
        pipeline_shape: MaterialShape,
    },

    #[error("no pipeline can draw material '{material}' ({shape:?})")]
    NoPipelineForShape { material: String, shape: MaterialShape },

    #[error("pipeline '{label}' failed to build: {message}")]
    PipelineCreation { label: String, message: String },

    #[error("no light at index {0}")]
    UnknownLight(usize),

    #[error("material '{0}' has no pipeline assigned")]
    MissingPipeline(String),

    #[error("material '{0}' is textured but has no diffuse texture")]
    MissingTexture(String),

    #[error("light slot {index} is outside the light array (capacity {capacity})")]
    LightCapacityExceeded { index: usize, capacity: usize },

    #[error("transform of prop '{prop}' is not invertible")]
    NonInvertibleTransform { prop: String },

    #[error("invalid texture data: {0}")]
    InvalidTexture(String),

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("frame step out of order: expected {expected}, got {found}")]
    FrameOrder {
        expected: &'static str,
        found: &'static str,
    },

    #[error("stage has no GPU resources; call initialize first")]
    NotInitialized,
}
