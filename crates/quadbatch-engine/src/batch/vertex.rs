use bytemuck::{Pod, Zeroable};

/// One sprite-quad corner as laid out in the vertex buffer.
///
/// `color` carries straight alpha; the fragment stage premultiplies.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x4
    ];

    /// Size of one vertex in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Vertex>() as u64;

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_tightly_packed() {
        assert_eq!(Vertex::SIZE, 36);
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 36);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20]);
    }

    #[test]
    fn casts_to_bytes() {
        let v = [Vertex::default(); 4];
        assert_eq!(bytemuck::cast_slice::<Vertex, u8>(&v).len(), 144);
    }
}
