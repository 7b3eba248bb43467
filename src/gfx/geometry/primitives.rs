//! Unit-sized shapes centered on the origin, y up, with normals and uvs.

use std::f32::consts::PI;

use super::GeometryData;

/// Outward normal, then the two in-face axes spanning it.
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
];

/// Cube spanning -0.5..0.5 with four vertices per face.
pub fn generate_cube() -> GeometryData {
    let mut data = GeometryData::default();
    for (normal, u_axis, v_axis) in CUBE_FACES {
        let base = data.vertices.len() as u32;
        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            let position = std::array::from_fn(|i| {
                0.5 * normal[i] + (u - 0.5) * u_axis[i] + (v - 0.5) * v_axis[i]
            });
            data.vertices.push(position);
            data.normals.push(normal);
            data.tex_coords.push([u, 1.0 - v]);
        }
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    data
}

/// UV sphere of radius 1.
pub fn generate_sphere(longitude_segments: u32, latitude_segments: u32) -> GeometryData {
    let mut data = GeometryData::default();
    let longs = longitude_segments.max(3);
    let lats = latitude_segments.max(2);

    for lat in 0..=lats {
        let (sin_theta, cos_theta) = (lat as f32 * PI / lats as f32).sin_cos();
        for long in 0..=longs {
            let (sin_phi, cos_phi) = (long as f32 * 2.0 * PI / longs as f32).sin_cos();
            let point = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            data.vertices.push(point);
            data.normals.push(point);
            data.tex_coords
                .push([long as f32 / longs as f32, lat as f32 / lats as f32]);
        }
    }

    let row = longs + 1;
    for lat in 0..lats {
        for long in 0..longs {
            let a = lat * row + long;
            let b = a + row;
            data.indices.extend_from_slice(&[a, b, a + 1, b, b + 1, a + 1]);
        }
    }
    data
}

/// Flat grid on the xz plane facing +y.
pub fn generate_plane(width: f32, depth: f32, width_segments: u32, depth_segments: u32) -> GeometryData {
    let mut data = GeometryData::default();
    let cols = width_segments.max(1);
    let rows = depth_segments.max(1);

    for row in 0..=rows {
        let v = row as f32 / rows as f32;
        for col in 0..=cols {
            let u = col as f32 / cols as f32;
            data.vertices
                .push([(u - 0.5) * width, 0.0, (v - 0.5) * depth]);
            data.normals.push([0.0, 1.0, 0.0]);
            data.tex_coords.push([u, v]);
        }
    }

    let stride = cols + 1;
    for row in 0..rows {
        for col in 0..cols {
            let a = row * stride + col;
            let b = a + stride;
            data.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    data
}
