//! Vertex format and static geometry for the two instanced draws.
//!
//! Both draws share one vertex type: a position and a face normal. The cube
//! mesh is instanced once per voxel slot, the quad mesh once per app slot;
//! everything per-instance rides in the mirror records instead.

/// One vertex of the shared cube or quad geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Offset from the instance position, world units
    position: [f32; 3],
    /// Outward face normal
    normal: [f32; 3],
}

impl Vertex {
    /// Vertex buffer layout: position at location 0, normal at location 1.
    /// The instance mirror occupies locations 2 and 3.
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Index list for the cube mesh, six faces of two triangles each.
pub const CUBE_INDICES: [u32; 36] = [
    0, 1, 2, 2, 1, 3, // -x
    4, 5, 6, 6, 5, 7, // +x
    8, 9, 10, 10, 9, 11, // -y
    12, 13, 14, 14, 13, 15, // +y
    16, 17, 18, 18, 17, 19, // -z
    20, 21, 22, 22, 21, 23, // +z
];

/// Cube mesh with `edge`-length sides, min corner at the instance position.
///
/// Four vertices per face so every face carries a flat normal. Winding is
/// counterclockwise seen from outside, matching the pipeline's back-face
/// culling.
pub fn cube_vertices(edge: f32) -> [Vertex; 24] {
    let e = edge;
    let v = |position: [f32; 3], normal: [f32; 3]| Vertex { position, normal };
    [
        // -x face
        v([0.0, 0.0, 0.0], [-1.0, 0.0, 0.0]),
        v([0.0, 0.0, e], [-1.0, 0.0, 0.0]),
        v([0.0, e, 0.0], [-1.0, 0.0, 0.0]),
        v([0.0, e, e], [-1.0, 0.0, 0.0]),
        // +x face
        v([e, 0.0, e], [1.0, 0.0, 0.0]),
        v([e, 0.0, 0.0], [1.0, 0.0, 0.0]),
        v([e, e, e], [1.0, 0.0, 0.0]),
        v([e, e, 0.0], [1.0, 0.0, 0.0]),
        // -y face
        v([0.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        v([e, 0.0, 0.0], [0.0, -1.0, 0.0]),
        v([0.0, 0.0, e], [0.0, -1.0, 0.0]),
        v([e, 0.0, e], [0.0, -1.0, 0.0]),
        // +y face
        v([0.0, e, e], [0.0, 1.0, 0.0]),
        v([e, e, e], [0.0, 1.0, 0.0]),
        v([0.0, e, 0.0], [0.0, 1.0, 0.0]),
        v([e, e, 0.0], [0.0, 1.0, 0.0]),
        // -z face
        v([e, 0.0, 0.0], [0.0, 0.0, -1.0]),
        v([0.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        v([e, e, 0.0], [0.0, 0.0, -1.0]),
        v([0.0, e, 0.0], [0.0, 0.0, -1.0]),
        // +z face
        v([0.0, 0.0, e], [0.0, 0.0, 1.0]),
        v([e, 0.0, e], [0.0, 0.0, 1.0]),
        v([0.0, e, e], [0.0, 0.0, 1.0]),
        v([e, e, e], [0.0, 0.0, 1.0]),
    ]
}

/// Index list for the app quad, two triangles.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

/// App surface quad of `width` by `height`, centered on the instance
/// position and facing +z. Drawn without culling, so it reads from both
/// sides.
pub fn quad_vertices(width: f32, height: f32) -> [Vertex; 4] {
    let hw = width * 0.5;
    let hh = height * 0.5;
    let v = |position: [f32; 3]| Vertex {
        position,
        normal: [0.0, 0.0, 1.0],
    };
    [
        v([-hw, -hh, 0.0]),
        v([hw, -hh, 0.0]),
        v([-hw, hh, 0.0]),
        v([hw, hh, 0.0]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_indices_stay_within_the_vertex_count() {
        assert!(CUBE_INDICES.iter().all(|&i| (i as usize) < 24));
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < 4));
    }

    #[test]
    fn cube_vertices_span_the_edge_length() {
        let vertices = cube_vertices(0.1);
        for vertex in &vertices {
            for component in vertex.position {
                assert!((0.0..=0.1).contains(&component));
            }
        }
    }
}
