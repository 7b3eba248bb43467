//! Device acquisition and the per-frame command session.
//!
//! The engine owns the wgpu device, the render target (a window surface or
//! an offscreen texture) with its depth buffer, and the pipeline library.
//! [`RenderEngine::render_frame`] runs one stage frame end to end.

use std::sync::Arc;

use wgpu::TextureFormat;

use super::frame::PassReport;
use super::pipeline_manager::PipelineLibrary;
use crate::config::RenderConfig;
use crate::error::{StageError, StageResult};
use crate::gfx::resources::texture_resource::TextureResource;
use crate::gfx::scene::stage::Stage;

enum RenderTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

pub struct RenderEngine {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    target: RenderTarget,
    format: TextureFormat,
    width: u32,
    height: u32,
    depth_texture: TextureResource,
    pipelines: Arc<PipelineLibrary>,
    config: RenderConfig,
}

impl RenderEngine {
    /// Creates an engine presenting to `window`.
    ///
    /// Fails without side effects when no adapter or device is available or
    /// the surface cannot be created.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        config: RenderConfig,
    ) -> StageResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| StageError::AdapterUnavailable(err.to_string()))?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&capabilities.formats).ok_or_else(|| {
            StageError::AdapterUnavailable("surface reports no texture formats".to_string())
        })?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: config.present_mode,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let target = RenderTarget::Surface {
            surface,
            config: surface_config,
        };
        Self::assemble(device, queue, target, format, width, height, config)
    }

    /// Creates an engine rendering into an offscreen color texture.
    pub async fn new_headless(width: u32, height: u32, config: RenderConfig) -> StageResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| StageError::AdapterUnavailable(err.to_string()))?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let format = config.headless_format;
        let (texture, view) = offscreen_target(&device, width, height, format);
        let target = RenderTarget::Offscreen { texture, view };
        Self::assemble(device, queue, target, format, width, height, config)
    }

    async fn request_device(adapter: &wgpu::Adapter) -> StageResult<(wgpu::Device, wgpu::Queue)> {
        let info = adapter.get_info();
        log::info!("using adapter '{}' ({:?})", info.name, info.backend);
        Ok(adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("prismatic device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?)
    }

    fn assemble(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: RenderTarget,
        format: TextureFormat,
        width: u32,
        height: u32,
        config: RenderConfig,
    ) -> StageResult<Self> {
        let device = Arc::new(device);
        let depth_texture = TextureResource::create_depth_texture(
            &device,
            width,
            height,
            config.depth_format,
            "depth texture",
        );
        let pipelines = Arc::new(PipelineLibrary::new(
            Arc::clone(&device),
            format,
            config.depth_format,
        )?);

        Ok(Self {
            device,
            queue: Arc::new(queue),
            target,
            format,
            width: width.max(1),
            height: height.max(1),
            depth_texture,
            pipelines,
            config,
        })
    }

    /// Gives `stage` a camera for the current viewport and its GPU resources.
    pub fn attach_stage(&self, stage: &mut Stage) -> StageResult<()> {
        stage.create_perspective_camera(self.width, self.height);
        stage.initialize(Arc::clone(&self.device), Arc::clone(&self.pipelines))
    }

    /// Resizes the target and depth buffer. Zero sizes are ignored. The
    /// stage camera is updated separately with `Camera::set_viewport`.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;

        match &mut self.target {
            RenderTarget::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            RenderTarget::Offscreen { texture, view } => {
                let (new_texture, new_view) = offscreen_target(&self.device, width, height, self.format);
                *texture = new_texture;
                *view = new_view;
            }
        }
        self.depth_texture = TextureResource::create_depth_texture(
            &self.device,
            width,
            height,
            self.config.depth_format,
            "depth texture",
        );
    }

    /// Builds, encodes, draws and submits one frame of `stage`, then hands
    /// its staging buffers back for reuse.
    pub fn render_frame(&mut self, stage: &mut Stage) -> StageResult<PassReport> {
        let (surface_texture, color_view) = match &self.target {
            RenderTarget::Surface { surface, .. } => {
                let texture = surface.get_current_texture()?;
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                (Some(texture), view)
            }
            RenderTarget::Offscreen { view, .. } => (None, view.clone()),
        };

        stage.build_all_buffers()?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        stage.encode_commands(&mut encoder)?;

        let report = {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("stage pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.config.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            stage.render_pass(&mut pass)?
        };

        self.queue.submit(std::iter::once(encoder.finish()));
        stage.finish_frame()?;

        if let Some(texture) = surface_texture {
            texture.present();
        }
        if let Err(err) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll after frame failed: {err}");
        }
        Ok(report)
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn pipelines(&self) -> &Arc<PipelineLibrary> {
        &self.pipelines
    }

    pub fn color_format(&self) -> TextureFormat {
        self.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Offscreen color texture, `None` when presenting to a surface.
    pub fn offscreen_texture(&self) -> Option<&wgpu::Texture> {
        match &self.target {
            RenderTarget::Offscreen { texture, .. } => Some(texture),
            RenderTarget::Surface { .. } => None,
        }
    }
}

fn offscreen_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    format: TextureFormat,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen color"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// Prefers a linear format; falls back to whatever the surface lists first.
pub fn choose_surface_format(formats: &[TextureFormat]) -> Option<TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|format| !format.is_srgb())
        .or_else(|| formats.first().copied())
}
