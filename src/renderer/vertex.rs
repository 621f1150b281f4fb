// Vertex layout for batched quads

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

/// A single batched quad vertex: position, fill color, texture coordinates
///
/// Eight floats per vertex, interleaved to match the batch pipeline's
/// vertex layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: Vec2, color: Vec4, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
            uv: uv.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_eight_floats() {
        assert_eq!(std::mem::size_of::<Vertex>(), 8 * 4);
    }

    #[test]
    fn test_new_interleaves_fields() {
        let v = Vertex::new(
            Vec2::new(1.0, 2.0),
            Vec4::new(0.1, 0.2, 0.3, 0.4),
            Vec2::new(0.5, 0.75),
        );
        assert_eq!(v.position, [1.0, 2.0]);
        assert_eq!(v.color, [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(v.uv, [0.5, 0.75]);
    }
}
