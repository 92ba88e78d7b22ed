use std::ops::Range;

use log::debug;
use wgpu::util::DeviceExt;
use wgpu::Device;

use super::{IndexRange, MeshError, MeshGenerator, Tessellation, VertexLayout};

/// A generator whose buffers live on the GPU.
///
/// Buffers are created by [`GpuMesh::prepare`] and dropped again when a remesh
/// changes the resolution, so a stale mesh is simply one without buffers.
pub struct GpuMesh<G: MeshGenerator> {
    tessellation: Tessellation<G>,
    label: String,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    index_count: u32,
}

impl<G: MeshGenerator> GpuMesh<G> {
    pub fn new(generator: G, layout: VertexLayout, label: impl Into<String>) -> Self {
        Self {
            tessellation: Tessellation::new(generator, layout),
            label: label.into(),
            vertex_buffer: None,
            index_buffer: None,
            index_count: 0,
        }
    }

    pub fn generator(&self) -> &G {
        self.tessellation.generator()
    }

    pub fn layout(&self) -> VertexLayout {
        self.tessellation.layout()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Vertex buffer layout matching the mesh's [`VertexLayout`].
    pub fn vertex_buffer_layout<'a>(
        &self,
        attributes: &'a [wgpu::VertexAttribute],
    ) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: self.layout().array_stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }

    /// Changes the resolution. GPU buffers are released only if it changed.
    pub fn remesh(&mut self, resolution: G::Resolution) -> bool {
        let changed = self.tessellation.remesh(resolution);
        if changed {
            self.vertex_buffer = None;
            self.index_buffer = None;
            self.index_count = 0;
        }
        changed
    }

    /// True until the next [`GpuMesh::prepare`].
    pub fn is_stale(&self) -> bool {
        self.vertex_buffer.is_none() || self.index_buffer.is_none()
    }

    /// Uploads the current tessellation if the GPU copy is missing or stale.
    pub fn prepare(&mut self, device: &Device) -> Result<(), MeshError> {
        if !self.is_stale() {
            return Ok(());
        }
        let buffers = self.tessellation.buffers()?;
        debug!(
            "Uploading mesh '{}': {} vertices, {} triangles",
            self.label,
            buffers.vertex_count(),
            buffers.triangle_count()
        );

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", self.label)),
            contents: buffers.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", self.label)),
            contents: buffers.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });

        self.index_count = buffers.indices.len() as u32;
        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
        Ok(())
    }

    pub fn vertex_buffer(&self) -> Option<&wgpu::Buffer> {
        self.vertex_buffer.as_ref()
    }

    pub fn index_buffer(&self) -> Option<&wgpu::Buffer> {
        self.index_buffer.as_ref()
    }

    /// Indices in the uploaded index buffer; zero while stale.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// A short-lived index buffer for views computed on demand, such as a sphere
/// stack strip or a pole fan. Drawn against a [`GpuMesh`]'s vertex buffer.
pub struct TransientIndices {
    buffer: wgpu::Buffer,
    count: u32,
}

impl TransientIndices {
    pub fn upload(device: &Device, label: &str, indices: &[u32]) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            buffer,
            count: indices.len() as u32,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

pub trait DrawMesh<'a> {
    fn draw_mesh<G: MeshGenerator>(&mut self, mesh: &'a GpuMesh<G>);
    fn draw_mesh_range<G: MeshGenerator>(&mut self, mesh: &'a GpuMesh<G>, range: IndexRange);
    fn draw_mesh_instanced<G: MeshGenerator>(
        &mut self,
        mesh: &'a GpuMesh<G>,
        range: IndexRange,
        instances: Range<u32>,
    );
    fn draw_mesh_transient<G: MeshGenerator>(
        &mut self,
        mesh: &'a GpuMesh<G>,
        indices: &'a TransientIndices,
    );
}

impl<'a, 'b> DrawMesh<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh<G: MeshGenerator>(&mut self, mesh: &'b GpuMesh<G>) {
        self.draw_mesh_instanced(mesh, 0..mesh.index_count, 0..1);
    }

    fn draw_mesh_range<G: MeshGenerator>(&mut self, mesh: &'b GpuMesh<G>, range: IndexRange) {
        self.draw_mesh_instanced(mesh, range, 0..1);
    }

    fn draw_mesh_instanced<G: MeshGenerator>(
        &mut self,
        mesh: &'b GpuMesh<G>,
        range: IndexRange,
        instances: Range<u32>,
    ) {
        // Skip drawing if not uploaded
        let (Some(vertex_buffer), Some(index_buffer)) = (&mesh.vertex_buffer, &mesh.index_buffer)
        else {
            return;
        };
        let end = range.end.min(mesh.index_count);
        self.set_vertex_buffer(0, vertex_buffer.slice(..));
        self.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(range.start.min(end)..end, 0, instances);
    }

    fn draw_mesh_transient<G: MeshGenerator>(
        &mut self,
        mesh: &'b GpuMesh<G>,
        indices: &'b TransientIndices,
    ) {
        let Some(vertex_buffer) = &mesh.vertex_buffer else {
            return;
        };
        self.set_vertex_buffer(0, vertex_buffer.slice(..));
        self.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..indices.count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::{Cylinder, CylinderResolution, Sphere, SphereResolution};

    #[test]
    fn test_new_mesh_is_stale_until_prepared() {
        let mesh = GpuMesh::new(Sphere::new(8, 8), VertexLayout::default(), "Sphere");
        assert!(mesh.is_stale());
        assert_eq!(mesh.index_count(), 0);
        assert!(mesh.vertex_buffer().is_none());
        assert_eq!(mesh.label(), "Sphere");
    }

    #[test]
    fn test_remesh_reports_change() {
        let mut mesh = GpuMesh::new(Cylinder::new(6, 1, 1), VertexLayout::POSITIONS, "Cylinder");
        assert!(!mesh.remesh(CylinderResolution::new(6, 1, 1)));
        assert!(mesh.remesh(CylinderResolution::new(6, 2, 1)));
        assert_eq!(mesh.generator().stacks(), 2);

        let mut sphere = GpuMesh::new(Sphere::default(), VertexLayout::POSITIONS, "Sphere");
        assert!(sphere.remesh(SphereResolution::new(12, 6)));
        assert_eq!(sphere.generator().slices(), 12);
    }

    #[test]
    fn test_vertex_buffer_layout_uses_mesh_stride() {
        let mesh = GpuMesh::new(Sphere::default(), VertexLayout::POSITIONS_TEX_COORDS, "Sphere");
        let attributes = mesh.layout().attributes();
        let layout = mesh.vertex_buffer_layout(&attributes);
        assert_eq!(layout.array_stride, 20);
        assert_eq!(layout.attributes.len(), 2);
    }
}
