//! # Vertex Data Structures
//!
//! GPU-compatible vertex format used by the bundled Phong shaders.

use crate::gfx::geometry::{MeshBuffers, VertexLayout};

/// A vertex with position, normal and texture coordinates.
///
/// Laid out exactly like [`VertexLayout::POSITIONS_NORMALS_TEX_COORDS`], so a
/// mesh generated with that layout can be reinterpreted as `&[PhongVertex]`.
///
/// # Examples
///
/// ```no_run
/// use edu_phong::gfx::PhongVertex;
///
/// let vertex = PhongVertex {
///     position: [0.0, 1.0, 0.0],
///     normal: [0.0, 1.0, 0.0],
///     tex_coords: [0.5, 1.0],
/// };
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PhongVertex {
    /// Position [x, y, z]
    pub position: [f32; 3],
    /// Unit normal [nx, ny, nz]
    pub normal: [f32; 3],
    /// Texture coordinates [s, t]
    pub tex_coords: [f32; 2],
}

impl PhongVertex {
    /// Returns the vertex buffer layout for wgpu rendering.
    ///
    /// - Attribute 0: Position (Float32x3)
    /// - Attribute 1: Normal (Float32x3)
    /// - Attribute 2: Texture coordinates (Float32x2)
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<PhongVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }

    /// Views generated buffers as vertices, if they use the matching layout.
    pub fn from_buffers(buffers: &MeshBuffers) -> Option<&[PhongVertex]> {
        if buffers.layout != VertexLayout::POSITIONS_NORMALS_TEX_COORDS {
            return None;
        }
        bytemuck::try_cast_slice(&buffers.vertices).ok()
    }
}
