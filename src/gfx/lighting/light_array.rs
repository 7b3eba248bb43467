//! Fixed-capacity block of light records uploaded as one uniform.

use bytemuck::{Pod, Zeroable};

use super::light::LightRecord;
use crate::error::{StageError, StageResult};

pub const MAX_LIGHTS: usize = 16;

/// Fixed block of `MAX_LIGHTS` records uploaded as one uniform. Slots that
/// were never set stay zeroed.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightArray {
    records: [LightRecord; MAX_LIGHTS],
}

impl Default for LightArray {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl LightArray {
    pub const SIZE: usize = std::mem::size_of::<LightArray>();

    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> usize {
        MAX_LIGHTS
    }

    pub fn set(&mut self, index: usize, record: LightRecord) -> StageResult<()> {
        let slot = self
            .records
            .get_mut(index)
            .ok_or(StageError::LightCapacityExceeded {
                index,
                capacity: MAX_LIGHTS,
            })?;
        *slot = record;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&LightRecord> {
        self.records.get(index)
    }

    pub fn clear(&mut self) {
        self.records = [LightRecord::zeroed(); MAX_LIGHTS];
    }

    pub fn records(&self) -> &[LightRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(i: usize) -> LightRecord {
        let f = i as f32 + 1.0;
        LightRecord::new([f, f, f], [1.0, 1.0, 1.0], 0.05, 0.8, 1.0)
    }

    #[test]
    fn array_is_sixteen_records() {
        assert_eq!(LightArray::SIZE, 16 * 48);
    }

    #[test]
    fn full_array_has_no_gaps() {
        let mut lights = LightArray::new();
        for i in 0..MAX_LIGHTS {
            lights.set(i, record(i)).unwrap();
        }
        assert!(lights
            .records()
            .iter()
            .all(|r| *r != LightRecord::zeroed()));
        let floats: &[f32] = bytemuck::cast_slice(lights.records());
        assert_eq!(floats[15 * 12], 16.0);
    }

    #[test]
    fn trailing_slots_stay_zero() {
        let mut lights = LightArray::new();
        for i in 0..5 {
            lights.set(i, record(i)).unwrap();
        }
        assert!(lights.records()[5..]
            .iter()
            .all(|r| *r == LightRecord::zeroed()));
        let bytes = bytemuck::bytes_of(&lights);
        assert!(bytes[5 * LightRecord::SIZE..].iter().all(|b| *b == 0));
    }

    #[test]
    fn overflow_is_rejected() {
        let mut lights = LightArray::new();
        let err = lights.set(MAX_LIGHTS, record(0)).unwrap_err();
        assert!(matches!(
            err,
            StageError::LightCapacityExceeded {
                index: 16,
                capacity: 16
            }
        ));
    }

    #[test]
    fn clear_zeroes_everything() {
        let mut lights = LightArray::new();
        lights.set(3, record(3)).unwrap();
        lights.clear();
        assert!(bytemuck::bytes_of(&lights).iter().all(|b| *b == 0));
    }
}
