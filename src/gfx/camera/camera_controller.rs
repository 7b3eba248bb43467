//! Keyboard and mouse state mapped onto free-fly camera motion.

use cgmath::{Vector3, Zero};

use super::camera::Camera;

/// Key and mouse state for one frame, filled in by whatever owns the window.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    /// Relative mouse motion in pixels, screen y pointing down.
    pub mouse_delta: (f32, f32),
    pub mouse_captured: bool,
    pub sun_north: bool,
    pub sun_south: bool,
    pub sun_east: bool,
    pub sun_west: bool,
}

pub struct FlyCameraController {
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    pub sun_speed: f32,
}

impl Default for FlyCameraController {
    fn default() -> Self {
        Self {
            move_speed: 1.0,
            mouse_sensitivity: 0.1,
            sun_speed: 1.0,
        }
    }
}

impl FlyCameraController {
    pub fn new(move_speed: f32, mouse_sensitivity: f32) -> Self {
        Self {
            move_speed,
            mouse_sensitivity,
            ..Default::default()
        }
    }

    /// Mouse turns the camera while captured; WASD moves along its view axes.
    pub fn update_camera(&self, input: &InputState, camera: &mut Camera, delta_time: f32) {
        if input.mouse_captured {
            let (dx, dy) = input.mouse_delta;
            camera.pitch_and_yaw(-dy * self.mouse_sensitivity, dx * self.mouse_sensitivity);
        }

        let step = self.move_speed * delta_time;
        if input.forward {
            camera.move_forward(step);
        }
        if input.backward {
            camera.move_forward(-step);
        }
        if input.left {
            camera.move_right(-step);
        }
        if input.right {
            camera.move_right(step);
        }
    }

    /// World-space offset for the sun from the arrow keys.
    pub fn sun_offset(&self, input: &InputState, delta_time: f32) -> Vector3<f32> {
        let step = self.sun_speed * delta_time;
        let mut offset = Vector3::zero();
        if input.sun_north {
            offset.z += step;
        }
        if input.sun_south {
            offset.z -= step;
        }
        if input.sun_east {
            offset.x += step;
        }
        if input.sun_west {
            offset.x -= step;
        }
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mouse_is_ignored_until_captured() {
        let controller = FlyCameraController::default();
        let mut camera = Camera::new(&CameraConfig::default(), 1.0);
        let yaw = camera.yaw();
        let input = InputState {
            mouse_delta: (40.0, 0.0),
            ..Default::default()
        };
        controller.update_camera(&input, &mut camera, 0.016);
        assert_eq!(camera.yaw(), yaw);

        let input = InputState {
            mouse_captured: true,
            ..input
        };
        controller.update_camera(&input, &mut camera, 0.016);
        assert_abs_diff_eq!(camera.yaw().0, yaw.0 + 4.0, epsilon = 1e-5);
    }

    #[test]
    fn moving_mouse_up_pitches_up() {
        let controller = FlyCameraController::default();
        let mut camera = Camera::new(&CameraConfig::default(), 1.0);
        let input = InputState {
            mouse_delta: (0.0, -50.0),
            mouse_captured: true,
            ..Default::default()
        };
        controller.update_camera(&input, &mut camera, 0.016);
        assert_abs_diff_eq!(camera.pitch().0, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn opposite_keys_cancel() {
        let controller = FlyCameraController::new(3.0, 0.1);
        let mut camera = Camera::new(&CameraConfig::default(), 1.0);
        let start = camera.position();
        let input = InputState {
            forward: true,
            backward: true,
            left: true,
            right: true,
            ..Default::default()
        };
        controller.update_camera(&input, &mut camera, 0.5);
        let moved = camera.position() - start;
        assert_abs_diff_eq!(moved.x, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(moved.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn sun_offset_scales_with_time() {
        let controller = FlyCameraController::default();
        let input = InputState {
            sun_north: true,
            sun_west: true,
            ..Default::default()
        };
        let offset = controller.sun_offset(&input, 0.25);
        assert_eq!(offset, Vector3::new(-0.25, 0.0, 0.25));
    }
}
