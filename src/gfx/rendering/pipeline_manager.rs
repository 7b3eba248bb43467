//! Render pipelines keyed by the material shape they can draw.
//!
//! Each pipeline is described by a [`PipelineConfig`] naming its shader and
//! the scene layouts it binds, in slot order. The library compiles the
//! built-in set up front and hands out shared [`ShaderPipeline`]s that
//! materials hold on to.

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::*;

use crate::error::{StageError, StageResult};
use crate::gfx::resources::bind_group_layouts::SceneLayouts;
use crate::gfx::resources::material::{Material, MaterialShape, ShadingModel};
use crate::gfx::scene::vertex::vertex_streams;

/// Scene layout occupying one bind-group slot of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSlot {
    Camera,
    Transform,
    Texture,
    Lights,
    Phong,
    Pbr,
}

impl LayoutSlot {
    fn layout(self, layouts: &SceneLayouts) -> &BindGroupLayout {
        match self {
            LayoutSlot::Camera => &layouts.camera.layout,
            LayoutSlot::Transform => &layouts.transform.layout,
            LayoutSlot::Texture => &layouts.texture.layout,
            LayoutSlot::Lights => &layouts.lights.layout,
            LayoutSlot::Phong => &layouts.phong.layout,
            LayoutSlot::Pbr => &layouts.pbr.layout,
        }
    }
}

/// A compiled pipeline together with the only material shape it accepts.
#[derive(Debug)]
pub struct ShaderPipeline {
    pub label: String,
    pub shape: MaterialShape,
    pub pipeline: RenderPipeline,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub shape: MaterialShape,
    pub slots: Vec<LayoutSlot>,
    pub cull_mode: Option<Face>,
    pub front_face: FrontFace,
    pub depth_compare: CompareFunction,
}

impl PipelineConfig {
    pub fn new(label: &str, shape: MaterialShape) -> Self {
        Self {
            label: label.to_owned(),
            shader: label.to_owned(),
            shape,
            slots: vec![LayoutSlot::Camera, LayoutSlot::Transform],
            cull_mode: None,
            front_face: FrontFace::Cw,
            depth_compare: CompareFunction::Less,
        }
    }

    pub fn with_shader(mut self, shader: &str) -> Self {
        self.shader = shader.to_owned();
        self
    }

    /// Appends a slot after camera and transform.
    pub fn with_slot(mut self, slot: LayoutSlot) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_front_face(mut self, front_face: FrontFace) -> Self {
        self.front_face = front_face;
        self
    }
}

pub const UNLIT_SHADER: &str = include_str!("../shaders/unlit.wgsl");
pub const UNLIT_TEXTURED_SHADER: &str = include_str!("../shaders/unlit_textured.wgsl");
pub const PHONG_SHADER: &str = include_str!("../shaders/phong_multi_light.wgsl");
pub const PBR_SHADER: &str = include_str!("../shaders/pbr_multi_light.wgsl");

/// Built-in shaders by name.
pub fn builtin_shaders() -> [(&'static str, &'static str); 4] {
    [
        ("unlit", UNLIT_SHADER),
        ("unlit_textured", UNLIT_TEXTURED_SHADER),
        ("phong_multi_light", PHONG_SHADER),
        ("pbr_multi_light", PBR_SHADER),
    ]
}

/// One pipeline per drawable shape. Lit textured materials have none.
pub fn builtin_configs() -> Vec<PipelineConfig> {
    vec![
        PipelineConfig::new("unlit", MaterialShape::new(ShadingModel::Unlit, false)),
        PipelineConfig::new("unlit_textured", MaterialShape::new(ShadingModel::Unlit, true))
            .with_slot(LayoutSlot::Texture),
        PipelineConfig::new("phong_multi_light", MaterialShape::new(ShadingModel::Phong, false))
            .with_slot(LayoutSlot::Lights)
            .with_slot(LayoutSlot::Phong),
        PipelineConfig::new("pbr_multi_light", MaterialShape::new(ShadingModel::Pbr, false))
            .with_slot(LayoutSlot::Lights)
            .with_slot(LayoutSlot::Pbr),
    ]
}

pub struct PipelineLibrary {
    device: Arc<Device>,
    layouts: Arc<SceneLayouts>,
    color_format: TextureFormat,
    depth_format: TextureFormat,
    shader_modules: HashMap<String, ShaderModule>,
    pipelines: HashMap<MaterialShape, Arc<ShaderPipeline>>,
}

impl PipelineLibrary {
    /// Creates the scene layouts and compiles every built-in pipeline.
    pub fn new(
        device: Arc<Device>,
        color_format: TextureFormat,
        depth_format: TextureFormat,
    ) -> StageResult<Self> {
        let layouts = Arc::new(SceneLayouts::new(&device));
        let mut library = Self {
            device,
            layouts,
            color_format,
            depth_format,
            shader_modules: HashMap::new(),
            pipelines: HashMap::new(),
        };

        for (name, source) in builtin_shaders() {
            library.load_shader(name, source);
        }
        for config in builtin_configs() {
            library.register(config)?;
        }
        log::info!("pipeline library ready with {} pipelines", library.pipelines.len());
        Ok(library)
    }

    pub fn layouts(&self) -> &Arc<SceneLayouts> {
        &self.layouts
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn load_shader(&mut self, name: &str, source: &str) {
        let module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        self.shader_modules.insert(name.to_owned(), module);
    }

    /// Compiles `config` and makes it the pipeline for its shape.
    pub fn register(&mut self, config: PipelineConfig) -> StageResult<Arc<ShaderPipeline>> {
        self.device.push_error_scope(ErrorFilter::Validation);
        let pipeline = self.create_pipeline_from_config(&config);
        let validation = pollster::block_on(self.device.pop_error_scope());

        let pipeline = pipeline?;
        if let Some(error) = validation {
            return Err(StageError::PipelineCreation {
                label: config.label,
                message: error.to_string(),
            });
        }

        log::debug!("pipeline '{}' built for {:?}", config.label, config.shape);
        let pipeline = Arc::new(ShaderPipeline {
            label: config.label,
            shape: config.shape,
            pipeline,
        });
        self.pipelines.insert(pipeline.shape, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    pub fn pipeline_for(&self, shape: MaterialShape) -> Option<&Arc<ShaderPipeline>> {
        self.pipelines.get(&shape)
    }

    /// Pairs `material` with the pipeline for its shape.
    pub fn assign(&self, material: &mut Material) -> StageResult<()> {
        let shape = material.shape();
        let pipeline = self
            .pipeline_for(shape)
            .ok_or_else(|| StageError::NoPipelineForShape {
                material: material.name.clone(),
                shape,
            })?;
        material.assign_pipeline(pipeline)
    }

    fn create_pipeline_from_config(&self, config: &PipelineConfig) -> StageResult<RenderPipeline> {
        let shader = self
            .shader_modules
            .get(&config.shader)
            .ok_or_else(|| StageError::PipelineCreation {
                label: config.label.clone(),
                message: format!("shader '{}' not loaded", config.shader),
            })?;

        let bind_group_layouts: Vec<&BindGroupLayout> = config
            .slots
            .iter()
            .map(|slot| slot.layout(&self.layouts))
            .collect();
        let pipeline_layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(&format!("{} layout", config.label)),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let streams = vertex_streams();
        Ok(self.device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(&config.label),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &streams,
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: self.color_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: config.front_face,
                cull_mode: config.cull_mode,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(DepthStencilState {
                format: self.depth_format,
                depth_write_enabled: true,
                depth_compare: config.depth_compare,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        }))
    }
}
