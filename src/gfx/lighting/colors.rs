//! Linear RGB presets for common light sources.

pub const WHITE: [f32; 3] = [1.0, 1.0, 1.0];
pub const BLACK: [f32; 3] = [0.0, 0.0, 0.0];
pub const RED: [f32; 3] = [1.0, 0.0, 0.0];
pub const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
pub const BLUE: [f32; 3] = [0.0, 0.0, 1.0];

pub const CANDLE: [f32; 3] = [1.0, 0.576, 0.16];
pub const TUNGSTEN: [f32; 3] = [1.0, 0.839, 0.6673];
pub const HALOGEN: [f32; 3] = [1.0, 0.945, 0.878];
pub const NOONSUN: [f32; 3] = [1.0, 1.0, 0.984];
pub const OVERCASTSUN: [f32; 3] = [0.788, 0.886, 1.0];
pub const CLEARSKY: [f32; 3] = [0.25, 0.611, 1.0];
