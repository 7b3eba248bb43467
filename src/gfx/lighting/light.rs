//! Point lights and the 48-byte records the lighting shaders read.

use bytemuck::{Pod, Zeroable};
use cgmath::Vector3;

use super::colors;
use crate::gfx::scene::prop::PropId;
use crate::gfx::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Sun = 1,
    Point = 2,
}

/// Shader-side light: three 16-byte rows, pads always zero.
///
/// `[pos.xyz, pad, color.rgb, pad, ambient, diffuse, specular, pad]`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    pub position: [f32; 3],
    _pad0: f32,
    pub color: [f32; 3],
    _pad1: f32,
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    _pad2: f32,
}

impl LightRecord {
    pub const SIZE: usize = std::mem::size_of::<LightRecord>();

    pub fn new(
        position: [f32; 3],
        color: [f32; 3],
        ambient: f32,
        diffuse: f32,
        specular: f32,
    ) -> Self {
        Self {
            position,
            _pad0: 0.0,
            color,
            _pad1: 0.0,
            ambient,
            diffuse,
            specular,
            _pad2: 0.0,
        }
    }

    pub fn as_floats(&self) -> [f32; 12] {
        bytemuck::cast(*self)
    }
}

/// A point light or the stage's sun. Only the transform's translation is used.
#[derive(Debug, Clone)]
pub struct Light {
    pub name: String,
    pub transform: Transform,
    pub color: [f32; 3],
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub light_type: LightType,
    /// Marker prop kept in sync through `Stage::move_light`.
    pub debug_prop: Option<PropId>,
    record: LightRecord,
}

impl Light {
    pub fn new(name: impl Into<String>, light_type: LightType, position: Vector3<f32>) -> Self {
        let mut light = Self {
            name: name.into(),
            transform: Transform::from_translation(position),
            color: colors::WHITE,
            ambient: 0.1,
            diffuse: 1.0,
            specular: 1.0,
            light_type,
            debug_prop: None,
            record: LightRecord::zeroed(),
        };
        light.build_light_struct();
        light
    }

    pub fn point(name: impl Into<String>, position: Vector3<f32>) -> Self {
        Self::new(name, LightType::Point, position)
    }

    pub fn sun(name: impl Into<String>, position: Vector3<f32>) -> Self {
        Self::new(name, LightType::Sun, position)
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn with_strengths(mut self, ambient: f32, diffuse: f32, specular: f32) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.get_position()
    }

    /// Moves the light only. Linked debug props follow via `Stage::move_light`.
    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.transform.translate(offset);
    }

    /// Packs the live transform, color and strengths.
    pub fn build_light_struct(&mut self) -> LightRecord {
        self.record = LightRecord::new(
            self.position().into(),
            self.color,
            self.ambient,
            self.diffuse,
            self.specular,
        );
        self.record
    }

    /// Record from the most recent `build_light_struct`.
    pub fn record(&self) -> &LightRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_forty_eight_bytes() {
        assert_eq!(LightRecord::SIZE, 48);
        assert_eq!(std::mem::align_of::<LightRecord>(), 4);
    }

    #[test]
    fn packed_fields_sit_at_contract_offsets() {
        let mut light = Light::point("key", Vector3::new(1.5, -2.25, 3.0))
            .with_color(colors::CANDLE)
            .with_strengths(0.05, 0.8, 1.0);
        let record = light.build_light_struct();
        let bytes = bytemuck::bytes_of(&record);
        let read = |offset: usize| f32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap());

        assert_eq!(read(0).to_bits(), 1.5f32.to_bits());
        assert_eq!(read(4).to_bits(), (-2.25f32).to_bits());
        assert_eq!(read(8).to_bits(), 3.0f32.to_bits());
        assert_eq!(read(12), 0.0);
        assert_eq!(read(16).to_bits(), colors::CANDLE[0].to_bits());
        assert_eq!(read(20).to_bits(), colors::CANDLE[1].to_bits());
        assert_eq!(read(24).to_bits(), colors::CANDLE[2].to_bits());
        assert_eq!(read(28), 0.0);
        assert_eq!(read(32).to_bits(), 0.05f32.to_bits());
        assert_eq!(read(36).to_bits(), 0.8f32.to_bits());
        assert_eq!(read(40).to_bits(), 1.0f32.to_bits());
        assert_eq!(read(44), 0.0);
    }

    #[test]
    fn unpacking_reproduces_record() {
        let record = LightRecord::new([0.1, 0.2, 0.3], colors::TUNGSTEN, 0.1, 0.4, 0.5);
        let bytes = bytemuck::bytes_of(&record).to_vec();
        let back: LightRecord = bytemuck::pod_read_unaligned(&bytes);
        assert_eq!(back, record);
        assert_eq!(record.as_floats()[4..7], colors::TUNGSTEN);
    }

    #[test]
    fn record_tracks_translation_after_rebuild() {
        let mut light = Light::sun("sun", Vector3::new(0.0, 10.0, 0.0));
        light.translate(Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(light.record().position, [0.0, 10.0, 0.0]);
        light.build_light_struct();
        assert_eq!(light.record().position, [1.0, 10.0, 0.0]);
    }

    #[test]
    fn defaults_follow_point_light_strengths() {
        let light = Light::point("p", Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(light.light_type, LightType::Point);
        assert_eq!((light.ambient, light.diffuse, light.specular), (0.1, 1.0, 1.0));
        assert!(light.debug_prop.is_none());
    }
}
