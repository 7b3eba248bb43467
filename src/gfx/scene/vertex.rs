//! Vertex stream layouts.
//!
//! Geometry is stored as four separate buffers rather than one interleaved
//! vertex, matching the shader locations below.

pub const POSITION_LOCATION: u32 = 0;
pub const COLOR_LOCATION: u32 = 1;
pub const NORMAL_LOCATION: u32 = 2;
pub const UV_LOCATION: u32 = 3;

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![POSITION_LOCATION => Float32x3];
const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![COLOR_LOCATION => Float32x3];
const NORMAL_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![NORMAL_LOCATION => Float32x3];
const UV_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![UV_LOCATION => Float32x2];

const VEC3_STRIDE: wgpu::BufferAddress = std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress;
const VEC2_STRIDE: wgpu::BufferAddress = std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress;

/// Layouts in slot order: position, color, normal, uv.
pub fn vertex_streams() -> [wgpu::VertexBufferLayout<'static>; 4] {
    [
        stream(VEC3_STRIDE, &POSITION_ATTRIBUTES),
        stream(VEC3_STRIDE, &COLOR_ATTRIBUTES),
        stream(VEC3_STRIDE, &NORMAL_ATTRIBUTES),
        stream(VEC2_STRIDE, &UV_ATTRIBUTES),
    ]
}

fn stream(
    array_stride: wgpu::BufferAddress,
    attributes: &'static [wgpu::VertexAttribute],
) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_in_location_order() {
        let streams = vertex_streams();
        let locations: Vec<u32> = streams
            .iter()
            .map(|s| s.attributes[0].shader_location)
            .collect();
        assert_eq!(locations, vec![0, 1, 2, 3]);
        assert_eq!(streams[3].array_stride, 8);
        assert_eq!(streams[3].attributes[0].format, wgpu::VertexFormat::Float32x2);
    }
}
