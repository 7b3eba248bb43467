//! Point lights, the sun, and the packed records the shaders read.

pub mod colors;
pub mod light;
pub mod light_array;

pub use light::{Light, LightRecord, LightType};
pub use light_array::{LightArray, MAX_LIGHTS};
