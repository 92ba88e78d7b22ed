//! # Cylinder Tessellation
//!
//! Radius 1, height 2, axis along Y, centered at the origin. The vertex buffer
//! is three blocks laid end to end: top cap, bottom cap, side. Indices follow
//! the same order so each part can be drawn on its own.

use std::f32::consts::PI;

use super::{
    check_buffer_sizes, clamp_resolution, IndexRange, MeshError, MeshGenerator, VertexLayout,
};

/// Slice, stack and ring counts of a [`Cylinder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CylinderResolution {
    pub slices: u32,
    /// Subdivisions of the side along the axis
    pub stacks: u32,
    /// Concentric subdivisions of each cap
    pub rings: u32,
}

impl CylinderResolution {
    /// Builds a resolution clamped to slices in 3..=255, stacks and rings in 1..=255.
    pub fn new(slices: u32, stacks: u32, rings: u32) -> Self {
        Self {
            slices: clamp_resolution("cylinder slice", slices, 3),
            stacks: clamp_resolution("cylinder stack", stacks, 1),
            rings: clamp_resolution("cylinder ring", rings, 1),
        }
    }
}

impl Default for CylinderResolution {
    fn default() -> Self {
        Self::new(6, 1, 1)
    }
}

/// Capped cylinder generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cylinder {
    resolution: CylinderResolution,
}

impl Cylinder {
    pub fn new(slices: u32, stacks: u32, rings: u32) -> Self {
        Self {
            resolution: CylinderResolution::new(slices, stacks, rings),
        }
    }

    pub fn slices(&self) -> u32 {
        self.resolution.slices
    }

    pub fn stacks(&self) -> u32 {
        self.resolution.stacks
    }

    pub fn rings(&self) -> u32 {
        self.resolution.rings
    }

    /// Vertices in one cap: the center plus `rings` per slice.
    pub fn vertex_count_disk(&self) -> u32 {
        1 + self.rings() * self.slices()
    }

    pub fn vertex_count_side(&self, with_tex_coords: bool) -> u32 {
        let columns = if with_tex_coords {
            self.slices() + 1
        } else {
            self.slices()
        };
        (self.stacks() + 1) * columns
    }

    /// Indices in one cap: a center triangle plus `rings - 1` quads per slice.
    pub fn index_count_disk(&self) -> u32 {
        3 * (2 * self.rings() - 1) * self.slices()
    }

    pub fn index_count_side(&self) -> u32 {
        6 * self.stacks() * self.slices()
    }

    pub fn top_vertex_range(&self) -> IndexRange {
        0..self.vertex_count_disk()
    }

    pub fn bottom_vertex_range(&self) -> IndexRange {
        let disk = self.vertex_count_disk();
        disk..2 * disk
    }

    pub fn side_vertex_range(&self, with_tex_coords: bool) -> IndexRange {
        let start = 2 * self.vertex_count_disk();
        start..start + self.vertex_count_side(with_tex_coords)
    }

    /// Range of the index buffer drawing the top cap.
    pub fn top_index_range(&self) -> IndexRange {
        0..self.index_count_disk()
    }

    /// Range of the index buffer drawing the bottom cap.
    pub fn bottom_index_range(&self) -> IndexRange {
        let disk = self.index_count_disk();
        disk..2 * disk
    }

    /// Range of the index buffer drawing the side.
    pub fn side_index_range(&self) -> IndexRange {
        let start = 2 * self.index_count_disk();
        start..start + self.index_count_side()
    }

    /// Cap vertex of slice `i` on ring `j` (1..=rings), relative to the cap block.
    fn cap_vertex(&self, i: u32, j: u32) -> u32 {
        i * self.rings() + j
    }

    fn side_vertex(&self, i: u32, j: u32) -> u32 {
        2 * self.vertex_count_disk() + i * (self.stacks() + 1) + j
    }

    fn write_caps(&self, layout: &VertexLayout, vertices: &mut [f32]) {
        let bottom = self.vertex_count_disk();
        layout.write_vertex(vertices, 0, [0.0, 1.0, 0.0], [0.0, 1.0, 0.0], [0.5, 0.5]);
        layout.write_vertex(vertices, bottom, [0.0, -1.0, 0.0], [0.0, -1.0, 0.0], [0.5, 0.5]);

        let slices = self.slices();
        let rings = self.rings();
        for i in 0..slices {
            let theta = i as f32 * 2.0 * PI / slices as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            for j in 1..=rings {
                let radius = j as f32 / rings as f32;
                let x = -sin_theta * radius;
                let z = -cos_theta * radius;
                let s = 0.5 * (x + 1.0);
                let t = 0.5 * (1.0 - z);
                let vertex = self.cap_vertex(i, j);
                layout.write_vertex(vertices, vertex, [x, 1.0, z], [0.0, 1.0, 0.0], [s, t]);
                layout.write_vertex(
                    vertices,
                    bottom + vertex,
                    [x, -1.0, z],
                    [0.0, -1.0, 0.0],
                    [1.0 - s, t],
                );
            }
        }
    }

    fn write_side(&self, layout: &VertexLayout, vertices: &mut [f32]) {
        let slices = self.slices();
        let stacks = self.stacks();
        let columns = if layout.has_tex_coords() {
            slices + 1
        } else {
            slices
        };
        for i in 0..columns {
            let theta = (i % slices) as f32 * 2.0 * PI / slices as f32;
            let x = -theta.sin();
            let z = -theta.cos();
            let s = i as f32 / slices as f32;
            for j in 0..=stacks {
                let t = j as f32 / stacks as f32;
                let y = -1.0 + 2.0 * t;
                layout.write_vertex(vertices, self.side_vertex(i, j), [x, y, z], [x, 0.0, z], [s, t]);
            }
        }
    }

    /// One cap's indices. The top winds counter-clockwise seen from +Y, the
    /// bottom from -Y.
    fn cap_indices(&self, base: u32, top: bool, indices: &mut Vec<u32>) {
        let slices = self.slices();
        for i in 0..slices {
            let here = base + self.cap_vertex(i, 1);
            let next = base + self.cap_vertex((i + 1) % slices, 1);
            if top {
                indices.extend_from_slice(&[base, here, next]);
            } else {
                indices.extend_from_slice(&[base, next, here]);
            }
            for j in 0..self.rings() - 1 {
                if top {
                    indices.extend_from_slice(&[
                        next + j,
                        here + j,
                        here + j + 1,
                        next + j,
                        here + j + 1,
                        next + j + 1,
                    ]);
                } else {
                    indices.extend_from_slice(&[
                        here + j,
                        next + j,
                        next + j + 1,
                        here + j,
                        next + j + 1,
                        here + j + 1,
                    ]);
                }
            }
        }
    }

    fn side_indices(&self, with_tex_coords: bool, indices: &mut Vec<u32>) {
        let slices = self.slices();
        for i in 0..slices {
            let next_column = if with_tex_coords { i + 1 } else { (i + 1) % slices };
            let here = self.side_vertex(i, 0);
            let next = self.side_vertex(next_column, 0);
            for j in 0..self.stacks() {
                indices.extend_from_slice(&[
                    next + j,
                    here + j + 1,
                    here + j,
                    next + j,
                    next + j + 1,
                    here + j + 1,
                ]);
            }
        }
    }
}

impl MeshGenerator for Cylinder {
    type Resolution = CylinderResolution;

    fn resolution(&self) -> CylinderResolution {
        self.resolution
    }

    fn remesh(&mut self, resolution: CylinderResolution) -> bool {
        let resolution =
            CylinderResolution::new(resolution.slices, resolution.stacks, resolution.rings);
        if resolution == self.resolution {
            return false;
        }
        self.resolution = resolution;
        true
    }

    fn vertex_count(&self, with_tex_coords: bool) -> usize {
        (2 * self.vertex_count_disk() + self.vertex_count_side(with_tex_coords)) as usize
    }

    fn index_count(&self) -> usize {
        (2 * self.index_count_disk() + self.index_count_side()) as usize
    }

    fn fill_buffers(
        &self,
        layout: &VertexLayout,
        vertices: &mut [f32],
        indices: &mut [u32],
    ) -> Result<(), MeshError> {
        let tex = layout.has_tex_coords();
        check_buffer_sizes(
            layout,
            self.vertex_count(tex),
            self.index_count(),
            vertices,
            indices,
        )?;
        self.write_caps(layout, vertices);
        self.write_side(layout, vertices);

        let mut emitted = Vec::with_capacity(self.index_count());
        self.cap_indices(0, true, &mut emitted);
        self.cap_indices(self.vertex_count_disk(), false, &mut emitted);
        self.side_indices(tex, &mut emitted);
        debug_assert_eq!(emitted.len(), self.index_count());
        indices[..emitted.len()].copy_from_slice(&emitted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    fn in_range(range: &IndexRange, index: u32) -> bool {
        range.start <= index && index < range.end
    }

    #[test]
    fn test_cylinder_counts() {
        let cylinder = Cylinder::new(8, 3, 2);
        assert_eq!(cylinder.vertex_count_disk(), 17);
        assert_eq!(cylinder.vertex_count(false), 2 * 17 + 4 * 8);
        assert_eq!(cylinder.vertex_count(true), 2 * 17 + 4 * 9);
        assert_eq!(cylinder.index_count_disk(), 3 * 3 * 8);
        assert_eq!(cylinder.index_count(), 2 * 72 + 6 * 3 * 8);
    }

    #[test]
    fn test_resolution_clamping() {
        assert_eq!(
            CylinderResolution::new(2, 0, 300),
            CylinderResolution { slices: 3, stacks: 1, rings: 255 }
        );
    }

    #[test]
    fn test_blocks_disjoint_and_indices_stay_in_their_block() {
        let mut rng = rand::rng();
        for _ in 0..25 {
            let cylinder = Cylinder::new(
                rng.random_range(3..30),
                rng.random_range(1..10),
                rng.random_range(1..10),
            );
            for layout in [VertexLayout::POSITIONS_NORMALS, VertexLayout::POSITIONS_NORMALS_TEX_COORDS] {
                let tex = layout.has_tex_coords();
                let buffers = cylinder.build(layout).unwrap();
                assert_eq!(buffers.indices.len(), cylinder.index_count());
                assert_eq!(buffers.vertex_count(), cylinder.vertex_count(tex));

                let top = cylinder.top_vertex_range();
                let bottom = cylinder.bottom_vertex_range();
                let side = cylinder.side_vertex_range(tex);
                assert_eq!(top.end, bottom.start);
                assert_eq!(bottom.end, side.start);
                assert_eq!(side.end as usize, cylinder.vertex_count(tex));

                let indices = &buffers.indices;
                let part = |range: IndexRange| &indices[range.start as usize..range.end as usize];
                assert!(part(cylinder.top_index_range()).iter().all(|&v| in_range(&top, v)));
                assert!(part(cylinder.bottom_index_range()).iter().all(|&v| in_range(&bottom, v)));
                assert!(part(cylinder.side_index_range()).iter().all(|&v| in_range(&side, v)));
                assert_eq!(cylinder.side_index_range().end as usize, indices.len());
            }
        }
    }

    #[test]
    fn test_geometry_on_surface() {
        let cylinder = Cylinder::new(12, 4, 3);
        let buffers = cylinder.build(VertexLayout::POSITIONS_NORMALS_TEX_COORDS).unwrap();
        for v in cylinder.side_vertex_range(true) {
            let p = buffers.position(v as usize);
            let n = buffers.normal(v as usize).unwrap();
            assert!((p[0] * p[0] + p[2] * p[2] - 1.0).abs() < 1e-5);
            assert!((-1.0..=1.0).contains(&p[1]));
            assert_eq!(n, [p[0], 0.0, p[2]]);
        }
        for v in cylinder.top_vertex_range() {
            assert_eq!(buffers.position(v as usize)[1], 1.0);
            assert_eq!(buffers.normal(v as usize), Some([0.0, 1.0, 0.0]));
        }
        for v in cylinder.bottom_vertex_range() {
            assert_eq!(buffers.position(v as usize)[1], -1.0);
        }
        // Slice 0 points down -Z.
        let rim = buffers.position(cylinder.cap_vertex(0, 3) as usize);
        assert!(rim[0].abs() < 1e-6 && (rim[2] + 1.0).abs() < 1e-6);
        assert_eq!(buffers.tex_coords(cylinder.cap_vertex(0, 3) as usize), Some([0.5, 1.0]));
    }

    #[test]
    fn test_seam_column_only_with_tex_coords() {
        let cylinder = Cylinder::new(5, 2, 1);
        let with = cylinder.build(VertexLayout::POSITIONS_TEX_COORDS).unwrap();
        let seam = cylinder.side_vertex(5, 1) as usize;
        let start = cylinder.side_vertex(0, 1) as usize;
        assert_eq!(with.tex_coords(seam).unwrap()[0], 1.0);
        assert_eq!(with.tex_coords(start).unwrap()[0], 0.0);
        assert!(sub(with.position(seam), with.position(start)).iter().all(|d| d.abs() < 1e-5));

        let without = cylinder.build(VertexLayout::POSITIONS).unwrap();
        let side = cylinder.side_vertex_range(false);
        assert!(without.indices.iter().all(|&v| v < side.end));
    }

    #[test]
    fn test_triangles_face_outward() {
        let cylinder = Cylinder::new(7, 3, 3);
        let buffers = cylinder.build(VertexLayout::POSITIONS).unwrap();
        let check = |range: IndexRange, outward: &dyn Fn([f32; 3]) -> [f32; 3]| {
            let part = &buffers.indices[range.start as usize..range.end as usize];
            for triangle in part.chunks(3) {
                let [a, b, c] = [0usize, 1, 2].map(|k| buffers.position(triangle[k] as usize));
                let normal = cross(sub(b, a), sub(c, a));
                let direction = outward(a);
                let dot: f32 = (0..3).map(|k| normal[k] * direction[k]).sum();
                assert!(dot > 0.0);
            }
        };
        check(cylinder.top_index_range(), &|_| [0.0, 1.0, 0.0]);
        check(cylinder.bottom_index_range(), &|_| [0.0, -1.0, 0.0]);
        check(cylinder.side_index_range(), &|p| [p[0], 0.0, p[2]]);
    }

    #[test]
    fn test_remesh_is_idempotent() {
        let mut cylinder = Cylinder::new(6, 2, 2);
        assert!(!cylinder.remesh(CylinderResolution { slices: 6, stacks: 2, rings: 2 }));
        assert!(cylinder.remesh(CylinderResolution::new(6, 2, 3)));
        assert_eq!(cylinder.rings(), 3);
    }
}
