//! Matrix helpers shared by the camera and its tests.

use cgmath::Matrix4;

/// Remaps OpenGL clip depth [-1, 1] to wgpu's [0, 1]. Column-major.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// 64-byte column-major view/projection payload.
pub type MatrixUniform = [[f32; 4]; 4];

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> MatrixUniform {
    matrix4.into()
}
