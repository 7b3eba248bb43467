//! Construction-time settings for the stage and the render engine.

use cgmath::{Deg, Point3};

use crate::gfx::lighting::{colors, MAX_LIGHTS};
use crate::wgpu_utils::DEFAULT_FRAMES_IN_FLIGHT;

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub position: Point3<f32>,
    pub yaw: Deg<f32>,
    pub pitch: Deg<f32>,
    pub fov: Deg<f32>,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 3.0, 10.0),
            // facing -z, toward the origin
            yaw: Deg(-90.0),
            pitch: Deg(0.0),
            fov: Deg(45.0),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraConfig {
    pub fn with_position(mut self, position: Point3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, yaw: Deg<f32>, pitch: Deg<f32>) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    pub fn with_fov(mut self, fov: Deg<f32>) -> Self {
        self.fov = fov;
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }
}

/// The single directional light every stage carries.
#[derive(Debug, Clone, PartialEq)]
pub struct SunConfig {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 10.0, 0.0],
            color: colors::NOONSUN,
            ambient: 0.1,
            diffuse: 0.4,
            specular: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    pub camera: CameraConfig,
    pub sun: SunConfig,
    /// Point lights scattered at construction, at most `MAX_LIGHTS`.
    pub random_lights: usize,
    /// Fixed seed for the scatter; `None` draws from the thread rng.
    pub light_seed: Option<u64>,
    pub frames_in_flight: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            sun: SunConfig::default(),
            random_lights: MAX_LIGHTS,
            light_seed: None,
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
        }
    }
}

impl StageConfig {
    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_sun(mut self, sun: SunConfig) -> Self {
        self.sun = sun;
        self
    }

    pub fn with_random_lights(mut self, count: usize) -> Self {
        self.random_lights = count.min(MAX_LIGHTS);
        self
    }

    pub fn with_light_seed(mut self, seed: u64) -> Self {
        self.light_seed = Some(seed);
        self
    }

    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub clear_color: wgpu::Color,
    pub depth_format: wgpu::TextureFormat,
    pub present_mode: wgpu::PresentMode,
    pub power_preference: wgpu::PowerPreference,
    /// Color format used when rendering without a surface.
    pub headless_format: wgpu::TextureFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.2,
                b: 0.3,
                a: 1.0,
            },
            depth_format: wgpu::TextureFormat::Depth24PlusStencil8,
            present_mode: wgpu::PresentMode::Fifo,
            power_preference: wgpu::PowerPreference::default(),
            headless_format: wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

impl RenderConfig {
    pub fn with_clear_color(mut self, clear_color: wgpu::Color) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_present_mode(mut self, present_mode: wgpu::PresentMode) -> Self {
        self.present_mode = present_mode;
        self
    }

    pub fn with_power_preference(mut self, power_preference: wgpu::PowerPreference) -> Self {
        self.power_preference = power_preference;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_defaults_fill_the_light_array() {
        let config = StageConfig::default();
        assert_eq!(config.random_lights, MAX_LIGHTS);
        assert_eq!(config.camera.position, Point3::new(0.0, 3.0, 10.0));
        assert_eq!(config.sun.color, colors::NOONSUN);
    }

    #[test]
    fn builder_clamps_light_count_and_frames() {
        let config = StageConfig::default()
            .with_random_lights(40)
            .with_frames_in_flight(0)
            .with_light_seed(7);
        assert_eq!(config.random_lights, MAX_LIGHTS);
        assert_eq!(config.frames_in_flight, 1);
        assert_eq!(config.light_seed, Some(7));
    }
}
