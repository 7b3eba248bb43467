//! Free-fly perspective camera driven by yaw and pitch.

use cgmath::{perspective, Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Vector3};

use super::camera_utils::{convert_matrix4_to_array, MatrixUniform, OPENGL_TO_WGPU_MATRIX};
use crate::config::CameraConfig;
use crate::error::{StageError, StageResult};
use crate::gfx::transform::Transform;
use crate::wgpu_utils::{BindGroupBuilder, BindGroupLayoutWithDesc, StagedUniform};

/// Pitch limit in degrees; keeps the forward vector off the world-up axis.
pub const PITCH_LIMIT: f32 = 89.0;

const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

struct CameraGpu {
    view: StagedUniform<MatrixUniform>,
    projection: StagedUniform<MatrixUniform>,
    position: StagedUniform<[f32; 3]>,
    bind_group: wgpu::BindGroup,
}

/// The transform holds the authoritative position; `view` and `projection`
/// are rebuilt from it every frame.
pub struct Camera {
    pub transform: Transform,
    yaw: Deg<f32>,
    pitch: Deg<f32>,
    pub fov: Deg<f32>,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    forward: Vector3<f32>,
    right: Vector3<f32>,
    up: Vector3<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    gpu: Option<CameraGpu>,
}

impl Camera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            transform: Transform::from_translation(config.position.to_vec()),
            yaw: config.yaw,
            pitch: Deg(config.pitch.0.clamp(-PITCH_LIMIT, PITCH_LIMIT)),
            fov: config.fov,
            aspect,
            near: config.near,
            far: config.far,
            forward: -Vector3::unit_z(),
            right: Vector3::unit_x(),
            up: WORLD_UP,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            gpu: None,
        };
        camera.update_basis();
        camera
    }

    /// Camera whose aspect ratio matches a `width` x `height` viewport.
    ///
    /// A zero dimension (a minimized window) is treated as one pixel.
    pub fn for_viewport(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self::new(config, viewport_aspect(width, height))
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = viewport_aspect(width, height);
    }

    pub fn yaw(&self) -> Deg<f32> {
        self.yaw
    }

    pub fn pitch(&self) -> Deg<f32> {
        self.pitch
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.get_position()
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    fn update_basis(&mut self) {
        let (sin_yaw, cos_yaw) = cgmath::Rad::from(self.yaw).0.sin_cos();
        let (sin_pitch, cos_pitch) = cgmath::Rad::from(self.pitch).0.sin_cos();
        self.forward = Vector3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize();
        self.right = self.forward.cross(WORLD_UP).normalize();
        self.up = self.right.cross(self.forward).normalize();
    }

    pub fn build_view(&mut self) {
        self.update_basis();
        let eye = Point3::from_vec(self.position());
        self.view = Matrix4::look_at_rh(eye, eye + self.forward, WORLD_UP);
    }

    pub fn build_perspective(&mut self) {
        self.projection =
            OPENGL_TO_WGPU_MATRIX * perspective(self.fov, self.aspect, self.near, self.far);
    }

    /// Adds to pitch and yaw (degrees). Pitch saturates at the limit; yaw is free.
    pub fn pitch_and_yaw(&mut self, d_pitch: f32, d_yaw: f32) {
        self.pitch = Deg((self.pitch.0 + d_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT));
        self.yaw = Deg(self.yaw.0 + d_yaw);
        self.update_basis();
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.transform.translate(offset);
    }

    pub fn move_forward(&mut self, amount: f32) {
        self.translate(self.forward * amount);
    }

    pub fn move_right(&mut self, amount: f32) {
        self.translate(self.right * amount);
    }

    /// Allocates the resident view/projection/position buffers and the
    /// camera bind group (view 0, projection 1, position 2).
    pub fn initialize_bind_group(
        &mut self,
        device: &wgpu::Device,
        layout: &BindGroupLayoutWithDesc,
        frames_in_flight: usize,
    ) {
        let view = StagedUniform::new(device, "camera view", frames_in_flight);
        let projection = StagedUniform::new(device, "camera projection", frames_in_flight);
        let position = StagedUniform::new(device, "camera position", frames_in_flight);
        let bind_group = BindGroupBuilder::new(layout)
            .resource(view.binding_resource())
            .resource(projection.binding_resource())
            .resource(position.binding_resource())
            .create(device, "camera bind group");

        self.gpu = Some(CameraGpu {
            view,
            projection,
            position,
            bind_group,
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Rebuilds view and projection and stages them with the position.
    pub fn build_buffers(&mut self, device: &wgpu::Device) -> StageResult<()> {
        self.build_view();
        self.build_perspective();
        let view = convert_matrix4_to_array(self.view);
        let projection = convert_matrix4_to_array(self.projection);
        let position: [f32; 3] = self.position().into();

        let gpu = self.gpu.as_mut().ok_or(StageError::NotInitialized)?;
        gpu.view.stage(device, &view);
        gpu.projection.stage(device, &projection);
        gpu.position.stage(device, &position);
        Ok(())
    }

    pub fn encode_commands(&mut self, encoder: &mut wgpu::CommandEncoder) -> StageResult<()> {
        let gpu = self.gpu.as_mut().ok_or(StageError::NotInitialized)?;
        gpu.view.encode(encoder);
        gpu.projection.encode(encoder);
        gpu.position.encode(encoder);
        Ok(())
    }

    pub fn reclaim(&mut self) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.view.reclaim();
            gpu.projection.reclaim();
            gpu.position.reclaim();
        }
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu.as_ref().map(|gpu| &gpu.bind_group)
    }
}

fn viewport_aspect(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}
