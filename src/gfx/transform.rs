//! Affine pose shared by props, lights and the camera.

use cgmath::{Deg, InnerSpace, Matrix4, One, Quaternion, SquareMatrix, Vector3};

/// 4x4 affine matrix built as translation * rotation * scale.
///
/// `translate`, `rotate` and `scale` post-multiply, so each step is relative
/// to the current orientation rather than the world axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub matrix: Matrix4<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }
}

impl Transform {
    pub fn new(rotation: Quaternion<f32>, translation: Vector3<f32>, scale: Vector3<f32>) -> Self {
        let t = Matrix4::from_translation(translation);
        let r = Matrix4::from(rotation);
        let s = Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z);
        Self { matrix: t * r * s }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self::new(
            Quaternion::one(),
            translation,
            Vector3::new(1.0, 1.0, 1.0),
        )
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.matrix = self.matrix * Matrix4::from_translation(offset);
    }

    /// Rotates by `degrees` around `axis` (normalized here).
    pub fn rotate(&mut self, degrees: f32, axis: Vector3<f32>) {
        if axis.magnitude2() == 0.0 {
            return;
        }
        self.matrix = self.matrix * Matrix4::from_axis_angle(axis.normalize(), Deg(degrees));
    }

    pub fn scale(&mut self, factors: Vector3<f32>) {
        self.matrix = self.matrix * Matrix4::from_nonuniform_scale(factors.x, factors.y, factors.z);
    }

    pub fn get_position(&self) -> Vector3<f32> {
        self.matrix.w.truncate()
    }

    /// Column-major float layout for uniform upload.
    pub fn to_cols_array(&self) -> [[f32; 4]; 4] {
        self.matrix.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cgmath::Rotation3;

    fn assert_vec_eq(actual: Vector3<f32>, expected: Vector3<f32>) {
        assert_abs_diff_eq!(actual.x, expected.x, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.y, expected.y, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn rotation_keeps_translation() {
        let mut transform = Transform::default();
        transform.translate(Vector3::new(1.0, 2.0, 3.0));
        transform.rotate(90.0, Vector3::unit_y());
        assert_vec_eq(transform.get_position(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn translation_follows_current_orientation() {
        let mut transform = Transform::default();
        transform.translate(Vector3::new(1.0, 0.0, 0.0));
        transform.rotate(90.0, Vector3::unit_y());
        transform.translate(Vector3::new(1.0, 0.0, 0.0));
        // local +x is world -z after a quarter turn about y
        assert_vec_eq(transform.get_position(), Vector3::new(1.0, 0.0, -1.0));

        transform.rotate(90.0, Vector3::unit_y());
        transform.translate(Vector3::new(0.0, 2.0, 1.0));
        // after a half turn local +z is world -z
        assert_vec_eq(transform.get_position(), Vector3::new(1.0, 2.0, -2.0));
    }

    #[test]
    fn scale_does_not_move_origin_but_scales_later_steps() {
        let mut transform = Transform::from_translation(Vector3::new(0.0, 1.0, 0.0));
        transform.scale(Vector3::new(2.0, 2.0, 2.0));
        assert_vec_eq(transform.get_position(), Vector3::new(0.0, 1.0, 0.0));
        transform.translate(Vector3::new(1.0, 0.0, 0.0));
        assert_vec_eq(transform.get_position(), Vector3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn construction_composes_trs() {
        let rotation = Quaternion::from_angle_z(Deg(90.0));
        let transform = Transform::new(
            rotation,
            Vector3::new(5.0, 0.0, 0.0),
            Vector3::new(2.0, 1.0, 1.0),
        );
        assert_vec_eq(transform.get_position(), Vector3::new(5.0, 0.0, 0.0));
        // local x is scaled by 2 then rotated onto world y
        let x_axis = transform.matrix.x.truncate();
        assert_vec_eq(x_axis, Vector3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn zero_axis_rotation_is_ignored() {
        let mut transform = Transform::from_translation(Vector3::new(1.0, 1.0, 1.0));
        let before = transform;
        transform.rotate(45.0, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(transform, before);
    }

    #[test]
    fn cols_array_is_column_major() {
        let transform = Transform::from_translation(Vector3::new(4.0, 5.0, 6.0));
        let cols = transform.to_cols_array();
        assert_eq!(cols[3], [4.0, 5.0, 6.0, 1.0]);
        assert_eq!(cols[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
