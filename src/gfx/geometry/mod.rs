//! # Procedural Geometry Generation
//!
//! Parametric meshes (spheres and cylinders) generated into caller-laid-out
//! vertex buffers plus `TriangleList` index buffers.
//!
//! ## Supported Primitives
//!
//! - **Sphere**: unit sphere split into slices and stacks
//! - **Cylinder**: radius 1, height 2, split into slices, stacks and rings
//!
//! ## Usage
//!
//! ```rust
//! use edu_phong::gfx::geometry::{MeshGenerator, Sphere, VertexLayout};
//!
//! let sphere = Sphere::new(12, 8);
//! let buffers = sphere.build(VertexLayout::POSITIONS_NORMALS_TEX_COORDS).unwrap();
//! assert_eq!(buffers.indices.len(), sphere.index_count());
//! ```
//!
//! Vertex offsets and strides are counted in `f32` elements, not bytes.

pub mod cylinder;
pub mod gpu_mesh;
pub mod sphere;

pub use cylinder::{Cylinder, CylinderResolution};
pub use gpu_mesh::{DrawMesh, GpuMesh, TransientIndices};
pub use sphere::{fan_to_triangle_list, Sphere, SphereResolution};

use std::fmt::Debug;
use std::ops::Range;

use thiserror::Error;

/// Largest slice/stack/ring count accepted by the generators.
pub const MAX_RESOLUTION: u32 = 255;

/// Errors raised while filling vertex and index buffers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("vertex stride must be positive")]
    ZeroStride,
    #[error("{field} at offset {offset} (width {width}) does not fit in stride {stride}")]
    FieldOutsideStride {
        field: &'static str,
        offset: usize,
        width: usize,
        stride: usize,
    },
    #[error("{buffer} buffer holds {actual} elements but {required} are needed")]
    BufferTooSmall {
        buffer: &'static str,
        required: usize,
        actual: usize,
    },
    #[error("{what} {index} is outside 0..{limit}")]
    OutOfRange {
        what: &'static str,
        index: u32,
        limit: u32,
    },
}

/// Where each vertex attribute lives inside one interleaved vertex.
///
/// `None` omits the attribute entirely; generators skip computing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    position: usize,
    normal: Option<usize>,
    tex_coords: Option<usize>,
    stride: usize,
}

impl VertexLayout {
    /// Positions only, tightly packed.
    pub const POSITIONS: Self = Self {
        position: 0,
        normal: None,
        tex_coords: None,
        stride: 3,
    };

    /// Positions followed by (s, t) texture coordinates.
    pub const POSITIONS_TEX_COORDS: Self = Self {
        position: 0,
        normal: None,
        tex_coords: Some(3),
        stride: 5,
    };

    /// Positions followed by normals.
    pub const POSITIONS_NORMALS: Self = Self {
        position: 0,
        normal: Some(3),
        tex_coords: None,
        stride: 6,
    };

    /// Positions, normals, then texture coordinates. Matches [`crate::gfx::PhongVertex`].
    pub const POSITIONS_NORMALS_TEX_COORDS: Self = Self {
        position: 0,
        normal: Some(3),
        tex_coords: Some(6),
        stride: 8,
    };

    /// Creates a custom layout, checking that every attribute fits in the stride.
    pub fn new(
        position: usize,
        normal: Option<usize>,
        tex_coords: Option<usize>,
        stride: usize,
    ) -> Result<Self, MeshError> {
        if stride == 0 {
            return Err(MeshError::ZeroStride);
        }
        let fits = |field: &'static str, offset: usize, width: usize| {
            if offset + width > stride {
                Err(MeshError::FieldOutsideStride {
                    field,
                    offset,
                    width,
                    stride,
                })
            } else {
                Ok(())
            }
        };
        fits("position", position, 3)?;
        if let Some(offset) = normal {
            fits("normal", offset, 3)?;
        }
        if let Some(offset) = tex_coords {
            fits("texture coordinates", offset, 2)?;
        }
        Ok(Self {
            position,
            normal,
            tex_coords,
            stride,
        })
    }

    pub fn position_offset(&self) -> usize {
        self.position
    }

    pub fn normal_offset(&self) -> Option<usize> {
        self.normal
    }

    pub fn tex_coords_offset(&self) -> Option<usize> {
        self.tex_coords
    }

    /// Stride in `f32` elements.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn has_normals(&self) -> bool {
        self.normal.is_some()
    }

    pub fn has_tex_coords(&self) -> bool {
        self.tex_coords.is_some()
    }

    /// Stride in bytes, as wgpu wants it.
    pub fn array_stride(&self) -> wgpu::BufferAddress {
        (self.stride * std::mem::size_of::<f32>()) as wgpu::BufferAddress
    }

    /// Vertex attributes for this layout.
    ///
    /// Shader locations are fixed: position 0, normal 1, texture coordinates 2.
    pub fn attributes(&self) -> Vec<wgpu::VertexAttribute> {
        let float_offset =
            |offset: usize| (offset * std::mem::size_of::<f32>()) as wgpu::BufferAddress;
        let mut attributes = vec![wgpu::VertexAttribute {
            offset: float_offset(self.position),
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }];
        if let Some(offset) = self.normal {
            attributes.push(wgpu::VertexAttribute {
                offset: float_offset(offset),
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            });
        }
        if let Some(offset) = self.tex_coords {
            attributes.push(wgpu::VertexAttribute {
                offset: float_offset(offset),
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            });
        }
        attributes
    }

    /// Writes one vertex. Attributes absent from the layout are skipped.
    pub(crate) fn write_vertex(
        &self,
        vertices: &mut [f32],
        vertex: u32,
        position: [f32; 3],
        normal: [f32; 3],
        tex_coords: [f32; 2],
    ) {
        let base = vertex as usize * self.stride;
        debug_assert!(base + self.stride <= vertices.len());
        let at = base + self.position;
        vertices[at..at + 3].copy_from_slice(&position);
        if let Some(offset) = self.normal {
            let at = base + offset;
            vertices[at..at + 3].copy_from_slice(&normal);
        }
        if let Some(offset) = self.tex_coords {
            let at = base + offset;
            vertices[at..at + 2].copy_from_slice(&tex_coords);
        }
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::POSITIONS_NORMALS_TEX_COORDS
    }
}

/// Generated vertex and index data ready for GPU upload
#[derive(Debug, Clone)]
pub struct MeshBuffers {
    /// Interleaved vertex data, `layout.stride()` floats per vertex
    pub vertices: Vec<f32>,
    /// Triangle indices (counter-clockwise winding seen from outside)
    pub indices: Vec<u32>,
    /// Layout used to fill `vertices`
    pub layout: VertexLayout,
}

impl MeshBuffers {
    /// Get the number of vertices in this geometry
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.layout.stride()
    }

    /// Get the number of triangles in this geometry
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Position of vertex `vertex`.
    pub fn position(&self, vertex: usize) -> [f32; 3] {
        let at = vertex * self.layout.stride() + self.layout.position_offset();
        [self.vertices[at], self.vertices[at + 1], self.vertices[at + 2]]
    }

    /// Normal of vertex `vertex`, if the layout carries normals.
    pub fn normal(&self, vertex: usize) -> Option<[f32; 3]> {
        self.layout.normal_offset().map(|offset| {
            let at = vertex * self.layout.stride() + offset;
            [self.vertices[at], self.vertices[at + 1], self.vertices[at + 2]]
        })
    }

    /// Texture coordinates of vertex `vertex`, if the layout carries them.
    pub fn tex_coords(&self, vertex: usize) -> Option<[f32; 2]> {
        self.layout.tex_coords_offset().map(|offset| {
            let at = vertex * self.layout.stride() + offset;
            [self.vertices[at], self.vertices[at + 1]]
        })
    }
}

/// A parametric surface that can tessellate itself into caller-provided buffers.
pub trait MeshGenerator {
    /// Tessellation parameters; always stored clamped.
    type Resolution: Copy + PartialEq + Debug;

    fn resolution(&self) -> Self::Resolution;

    /// Changes the resolution. Returns `false` when the (clamped) resolution is
    /// already current, in which case nothing needs regenerating.
    fn remesh(&mut self, resolution: Self::Resolution) -> bool;

    /// Number of vertices written by [`MeshGenerator::fill_buffers`].
    fn vertex_count(&self, with_tex_coords: bool) -> usize;

    /// Number of indices written by [`MeshGenerator::fill_buffers`].
    fn index_count(&self) -> usize;

    /// Fills `vertices` and `indices`, which must be at least
    /// `vertex_count * stride` and `index_count` long.
    fn fill_buffers(
        &self,
        layout: &VertexLayout,
        vertices: &mut [f32],
        indices: &mut [u32],
    ) -> Result<(), MeshError>;

    /// Allocates exactly-sized buffers and fills them.
    fn build(&self, layout: VertexLayout) -> Result<MeshBuffers, MeshError> {
        let vertex_count = self.vertex_count(layout.has_tex_coords());
        let mut vertices = vec![0.0; vertex_count * layout.stride()];
        let mut indices = vec![0; self.index_count()];
        self.fill_buffers(&layout, &mut vertices, &mut indices)?;
        Ok(MeshBuffers {
            vertices,
            indices,
            layout,
        })
    }
}

/// Checks caller buffers against the counts a generator will write.
pub(crate) fn check_buffer_sizes(
    layout: &VertexLayout,
    vertex_count: usize,
    index_count: usize,
    vertices: &[f32],
    indices: &[u32],
) -> Result<(), MeshError> {
    let required = vertex_count * layout.stride();
    if vertices.len() < required {
        return Err(MeshError::BufferTooSmall {
            buffer: "vertex",
            required,
            actual: vertices.len(),
        });
    }
    if indices.len() < index_count {
        return Err(MeshError::BufferTooSmall {
            buffer: "index",
            required: index_count,
            actual: indices.len(),
        });
    }
    Ok(())
}

/// Clamps one resolution parameter, logging when the request was out of range.
pub(crate) fn clamp_resolution(what: &str, requested: u32, min: u32) -> u32 {
    let clamped = requested.clamp(min, MAX_RESOLUTION);
    if clamped != requested {
        log::warn!(
            "{} count {} outside {}..={}, clamping to {}",
            what,
            requested,
            min,
            MAX_RESOLUTION,
            clamped
        );
    }
    clamped
}

/// CPU-side cache of a generator's buffers.
///
/// Buffers are built on first use and dropped whenever [`Tessellation::remesh`]
/// actually changes the resolution.
#[derive(Debug)]
pub struct Tessellation<G: MeshGenerator> {
    generator: G,
    layout: VertexLayout,
    cached: Option<MeshBuffers>,
}

impl<G: MeshGenerator> Tessellation<G> {
    pub fn new(generator: G, layout: VertexLayout) -> Self {
        Self {
            generator,
            layout,
            cached: None,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    /// Re-meshes the generator; only a real change marks the buffers stale.
    pub fn remesh(&mut self, resolution: G::Resolution) -> bool {
        let changed = self.generator.remesh(resolution);
        if changed {
            self.cached = None;
        }
        changed
    }

    /// True when the next [`Tessellation::buffers`] call has to regenerate.
    pub fn is_stale(&self) -> bool {
        self.cached.is_none()
    }

    /// Returns the buffers, regenerating them first if stale.
    pub fn buffers(&mut self) -> Result<&MeshBuffers, MeshError> {
        let buffers = match self.cached.take() {
            Some(buffers) => buffers,
            None => self.generator.build(self.layout)?,
        };
        Ok(&*self.cached.insert(buffers))
    }
}

/// Sub-range of an index buffer, in indices.
pub type IndexRange = Range<u32>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_presets_fit() {
        for layout in [
            VertexLayout::POSITIONS,
            VertexLayout::POSITIONS_TEX_COORDS,
            VertexLayout::POSITIONS_NORMALS,
            VertexLayout::POSITIONS_NORMALS_TEX_COORDS,
        ] {
            let rebuilt = VertexLayout::new(
                layout.position_offset(),
                layout.normal_offset(),
                layout.tex_coords_offset(),
                layout.stride(),
            );
            assert_eq!(rebuilt, Ok(layout));
        }
    }

    #[test]
    fn test_layout_rejects_bad_offsets() {
        assert_eq!(VertexLayout::new(0, None, None, 0), Err(MeshError::ZeroStride));
        assert!(matches!(
            VertexLayout::new(0, Some(3), None, 5),
            Err(MeshError::FieldOutsideStride { field: "normal", .. })
        ));
        assert!(matches!(
            VertexLayout::new(0, None, Some(4), 5),
            Err(MeshError::FieldOutsideStride { .. })
        ));
    }

    #[test]
    fn test_layout_attributes() {
        let attributes = VertexLayout::POSITIONS_NORMALS_TEX_COORDS.attributes();
        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes[1].offset, 12);
        assert_eq!(attributes[2].offset, 24);
        assert_eq!(attributes[2].shader_location, 2);
        assert_eq!(VertexLayout::POSITIONS_NORMALS_TEX_COORDS.array_stride(), 32);
        assert_eq!(VertexLayout::POSITIONS.attributes().len(), 1);
    }

    #[test]
    fn test_tessellation_stays_fresh_on_same_resolution() {
        let mut mesh = Tessellation::new(Sphere::new(8, 6), VertexLayout::POSITIONS);
        assert!(mesh.is_stale());
        mesh.buffers().unwrap();
        assert!(!mesh.is_stale());

        let current = mesh.generator().resolution();
        assert!(!mesh.remesh(current));
        assert!(!mesh.is_stale());

        assert!(mesh.remesh(SphereResolution::new(9, 6)));
        assert!(mesh.is_stale());
        let count = mesh.buffers().unwrap().indices.len();
        assert_eq!(count, 6 * 9 * 5);
    }

    #[test]
    fn test_cylinder_tessellation_clamped_request_is_noop() {
        let mut mesh = Tessellation::new(Cylinder::new(3, 1, 1), VertexLayout::POSITIONS);
        mesh.buffers().unwrap();
        // Clamps back to the current 3/1/1.
        assert!(!mesh.remesh(CylinderResolution::new(0, 0, 0)));
        assert!(!mesh.is_stale());
    }

    #[test]
    fn test_build_rejects_short_buffers() {
        let sphere = Sphere::new(4, 4);
        let mut vertices = vec![0.0; 3];
        let mut indices = vec![0; sphere.index_count()];
        let err = sphere
            .fill_buffers(&VertexLayout::POSITIONS, &mut vertices, &mut indices)
            .unwrap_err();
        assert!(matches!(err, MeshError::BufferTooSmall { buffer: "vertex", .. }));
    }
}
