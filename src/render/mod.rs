//! Render module for the tile's GPU pipeline
//!
//! Vertex formats, the constant full-viewport geometry, and the warp shader
//! uniforms shared between the mapper and the compositor.

mod compositor;

pub use compositor::FrameCompositor;

use crate::layout::Rotation;

/// Position vertex for the full-viewport quad
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
}

impl Vertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x2,
        }],
    };
}

/// Texture coordinates live in their own buffer so a layout change replaces
/// the whole buffer in one write, never individual floats.
pub const TEX_COORD_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: (std::mem::size_of::<f32>() * 2) as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32x2,
    }],
};

/// Full-viewport quad as a 4-vertex triangle strip, vertex order
/// [bottom-left, bottom-right, top-left, top-right]. This order dictates the
/// texture coordinate order produced by the mapper.
pub fn viewport_quad() -> [Vertex; 4] {
    [
        Vertex {
            position: [-1.0, -1.0],
        },
        Vertex {
            position: [1.0, -1.0],
        },
        Vertex {
            position: [-1.0, 1.0],
        },
        Vertex {
            position: [1.0, 1.0],
        },
    ]
}

/// Uniforms for the warp shader's rotation stage
///
/// Matrix columns first, then the rotation center, padded to 32 bytes for
/// uniform buffer layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WarpUniforms {
    /// Column 0 of the 2x2 rotation matrix
    pub matrix_col0: [f32; 2],
    /// Column 1 of the 2x2 rotation matrix
    pub matrix_col1: [f32; 2],
    /// Rotation center in source coordinates
    pub center: [f32; 2],
    pub _pad: [f32; 2],
}

impl Default for WarpUniforms {
    fn default() -> Self {
        Self::from(Rotation::IDENTITY)
    }
}

impl From<Rotation> for WarpUniforms {
    fn from(rotation: Rotation) -> Self {
        Self {
            matrix_col0: rotation.matrix[0],
            matrix_col1: rotation.matrix[1],
            center: rotation.center,
            _pad: [0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warp_uniforms_size_matches_shader_struct() {
        assert_eq!(std::mem::size_of::<WarpUniforms>(), 32);
    }

    #[test]
    fn test_default_uniforms_are_identity() {
        let u = WarpUniforms::default();
        assert_eq!(u.matrix_col0, [1.0, 0.0]);
        assert_eq!(u.matrix_col1, [0.0, 1.0]);
        assert_eq!(u.center, [0.0, 0.0]);
    }

    #[test]
    fn test_viewport_quad_order() {
        let quad = viewport_quad();
        assert_eq!(quad[0].position, [-1.0, -1.0]);
        assert_eq!(quad[1].position, [1.0, -1.0]);
        assert_eq!(quad[2].position, [-1.0, 1.0]);
        assert_eq!(quad[3].position, [1.0, 1.0]);
    }
}
