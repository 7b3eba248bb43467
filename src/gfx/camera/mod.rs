//! The stage camera, its controller and matrix helpers.

pub mod camera;
pub mod camera_controller;
pub mod camera_utils;

pub use camera::Camera;
pub use camera_controller::{FlyCameraController, InputState};
pub use camera_utils::OPENGL_TO_WGPU_MATRIX;
