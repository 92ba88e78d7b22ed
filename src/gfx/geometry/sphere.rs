//! # Sphere Tessellation
//!
//! A unit sphere centered at the origin, cut into `slices` vertical wedges and
//! `stacks` horizontal bands. Stack 0 is the south pole (y = -1) and stack
//! `stacks` the north pole (y = +1).
//!
//! Both poles are single shared vertices (numbers 0 and 1). When texture
//! coordinates are requested the slice column at azimuth 2π is emitted a second
//! time with s = 1, so the seam gets its own vertices.

use std::f32::consts::PI;

use super::{
    check_buffer_sizes, clamp_resolution, IndexRange, MeshError, MeshGenerator, VertexLayout,
};

/// Slice and stack counts of a [`Sphere`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SphereResolution {
    pub slices: u32,
    pub stacks: u32,
}

impl SphereResolution {
    /// Builds a resolution clamped to slices in 3..=255 and stacks in 3..=255.
    pub fn new(slices: u32, stacks: u32) -> Self {
        Self {
            slices: clamp_resolution("sphere slice", slices, 3),
            stacks: clamp_resolution("sphere stack", stacks, 3),
        }
    }
}

impl Default for SphereResolution {
    fn default() -> Self {
        Self::new(6, 6)
    }
}

/// Unit sphere generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sphere {
    resolution: SphereResolution,
}

impl Sphere {
    pub fn new(slices: u32, stacks: u32) -> Self {
        Self {
            resolution: SphereResolution::new(slices, stacks),
        }
    }

    pub fn slices(&self) -> u32 {
        self.resolution.slices
    }

    pub fn stacks(&self) -> u32 {
        self.resolution.stacks
    }

    pub fn vertex_count_tex_coords(&self) -> usize {
        ((self.slices() + 1) * (self.stacks() - 1) + 2) as usize
    }

    pub fn vertex_count_no_tex_coords(&self) -> usize {
        (self.slices() * (self.stacks() - 1) + 2) as usize
    }

    /// Indices in one slice of the main index buffer.
    pub fn elements_in_slice(&self) -> usize {
        (6 * (self.stacks() - 1)) as usize
    }

    /// Vertex number of slice `i` (0..=slices), stack `j` (0..=stacks).
    ///
    /// The flag is false for pole duplicates, i.e. the vertex is emitted by
    /// another slice. Every index written anywhere goes through this function.
    pub fn vertex_number(&self, i: u32, j: u32, with_tex_coords: bool) -> (u32, bool) {
        let stacks = self.stacks();
        if j == 0 {
            return (0, i == 0);
        }
        if j == stacks {
            return (1, i == 0);
        }
        let column = if with_tex_coords { i } else { i % self.slices() };
        ((stacks - 1) * column + j + 1, true)
    }

    fn vertex_index(&self, i: u32, j: u32, with_tex_coords: bool) -> u32 {
        self.vertex_number(i, j, with_tex_coords).0
    }

    /// Range of the main index buffer covering slice `i`.
    pub fn slice_index_range(&self, i: u32) -> Result<IndexRange, MeshError> {
        if i >= self.slices() {
            return Err(MeshError::OutOfRange {
                what: "slice",
                index: i,
                limit: self.slices(),
            });
        }
        let len = self.elements_in_slice() as u32;
        Ok(i * len..(i + 1) * len)
    }

    /// Stack `j` (0..stacks) as a `TriangleStrip` index list.
    ///
    /// The two polar stacks come out as strips with degenerate triangles.
    pub fn stack_strip_indices(
        &self,
        j: u32,
        with_tex_coords: bool,
    ) -> Result<Vec<u32>, MeshError> {
        if j >= self.stacks() {
            return Err(MeshError::OutOfRange {
                what: "stack",
                index: j,
                limit: self.stacks(),
            });
        }
        let mut strip = Vec::with_capacity(2 * (self.slices() as usize + 1));
        for i in 0..=self.slices() {
            strip.push(self.vertex_index(i, j + 1, with_tex_coords));
            strip.push(self.vertex_index(i, j, with_tex_coords));
        }
        Ok(strip)
    }

    /// The stack around the north pole as a triangle fan: the pole first,
    /// then the ring below it going around once (slices + 2 indices).
    pub fn north_pole_fan_indices(&self, with_tex_coords: bool) -> Vec<u32> {
        let ring = self.stacks() - 1;
        let mut fan = Vec::with_capacity(self.slices() as usize + 2);
        fan.push(self.vertex_index(0, self.stacks(), with_tex_coords));
        for i in 0..=self.slices() {
            fan.push(self.vertex_index(i, ring, with_tex_coords));
        }
        fan
    }
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            resolution: SphereResolution::default(),
        }
    }
}

impl MeshGenerator for Sphere {
    type Resolution = SphereResolution;

    fn resolution(&self) -> SphereResolution {
        self.resolution
    }

    fn remesh(&mut self, resolution: SphereResolution) -> bool {
        let resolution = SphereResolution::new(resolution.slices, resolution.stacks);
        if resolution == self.resolution {
            return false;
        }
        self.resolution = resolution;
        true
    }

    fn vertex_count(&self, with_tex_coords: bool) -> usize {
        if with_tex_coords {
            self.vertex_count_tex_coords()
        } else {
            self.vertex_count_no_tex_coords()
        }
    }

    fn index_count(&self) -> usize {
        (6 * self.slices() * (self.stacks() - 1)) as usize
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
        let slices = self.slices();
        let stacks = self.stacks();

        for i in 0..=slices {
            // theta runs from the -z axis, counterclockwise seen from above.
            let theta = (i % slices) as f32 * 2.0 * PI / slices as f32;
            let s = i as f32 / slices as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            for j in 0..=stacks {
                let (vertex, emit) = self.vertex_number(i, j, tex);
                if !emit {
                    continue;
                }
                let t = j as f32 / stacks as f32;
                let phi = t * PI;
                let cos_phi = phi.cos();
                let sin_phi = if j < stacks { phi.sin() } else { 0.0 };
                let position = [-sin_theta * sin_phi, -cos_phi, -cos_theta * sin_phi];
                let s = if j != 0 && j != stacks { s } else { 0.5 };
                layout.write_vertex(vertices, vertex, position, position, [s, t]);
            }
        }

        // Each slice is walked bottom to top, two triangles per step; the
        // first and last steps touch a pole and form its fan.
        let mut out = 0;
        for i in 0..slices {
            let mut left_old = self.vertex_index(i, 0, tex);
            let mut right_old = self.vertex_index(i + 1, 1, tex);
            for j in 0..stacks - 1 {
                let left_new = self.vertex_index(i, j + 1, tex);
                let right_new = self.vertex_index(i + 1, j + 2, tex);
                indices[out..out + 6].copy_from_slice(&[
                    left_old, right_old, left_new, left_new, right_old, right_new,
                ]);
                out += 6;
                left_old = left_new;
                right_old = right_new;
            }
        }
        debug_assert_eq!(out, self.index_count());
        Ok(())
    }
}

/// Expands a triangle fan into `TriangleList` indices.
///
/// wgpu has no fan topology, so fans produced by
/// [`Sphere::north_pole_fan_indices`] are drawn through this.
pub fn fan_to_triangle_list(fan: &[u32]) -> Vec<u32> {
    let Some((&center, rim)) = fan.split_first() else {
        return Vec::new();
    };
    rim.windows(2)
        .flat_map(|edge| [center, edge[0], edge[1]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    #[test]
    fn test_sphere_counts() {
        let sphere = Sphere::new(8, 6);
        assert_eq!(sphere.vertex_count(false), 8 * 5 + 2);
        assert_eq!(sphere.vertex_count(true), 9 * 5 + 2);
        assert_eq!(sphere.index_count(), 6 * 8 * 5);
        assert_eq!(sphere.elements_in_slice(), 30);
    }

    #[test]
    fn test_sphere_generation_matches_counts() {
        let mut rng = rand::rng();
        for _ in 0..25 {
            let sphere = Sphere::new(rng.random_range(3..40), rng.random_range(3..40));
            for layout in [VertexLayout::POSITIONS, VertexLayout::POSITIONS_NORMALS_TEX_COORDS] {
                let buffers = sphere.build(layout).unwrap();
                let vertex_count = sphere.vertex_count(layout.has_tex_coords());
                assert_eq!(buffers.indices.len(), sphere.index_count());
                assert_eq!(buffers.vertex_count(), vertex_count);
                assert!(buffers.indices.iter().all(|&index| (index as usize) < vertex_count));
            }
        }
    }

    #[test]
    fn test_poles_only_at_polar_stacks() {
        let sphere = Sphere::new(7, 5);
        for tex in [false, true] {
            for i in 0..=sphere.slices() {
                assert_eq!(sphere.vertex_number(i, 0, tex).0, 0);
                assert_eq!(sphere.vertex_number(i, 5, tex).0, 1);
                for j in 1..5 {
                    assert!(sphere.vertex_number(i, j, tex).0 >= 2);
                }
            }
            let layout = if tex {
                VertexLayout::POSITIONS_TEX_COORDS
            } else {
                VertexLayout::POSITIONS
            };
            let buffers = sphere.build(layout).unwrap();
            let south = buffers.indices.iter().filter(|&&index| index == 0).count();
            let north = buffers.indices.iter().filter(|&&index| index == 1).count();
            assert_eq!(south, 7);
            assert_eq!(north, 7);
        }
    }

    #[test]
    fn test_seam_column_duplicated_only_with_tex_coords() {
        let sphere = Sphere::new(6, 4);
        for j in 1..4 {
            assert_eq!(
                sphere.vertex_number(0, j, false).0,
                sphere.vertex_number(6, j, false).0
            );
            assert_ne!(
                sphere.vertex_number(0, j, true).0,
                sphere.vertex_number(6, j, true).0
            );
        }
        // Poles stay shared either way; only slice 0 emits them.
        assert_eq!(sphere.vertex_number(3, 0, true), (0, false));
        assert_eq!(sphere.vertex_number(0, 0, true), (0, true));
    }

    #[test]
    fn test_positions_on_unit_sphere_and_normals_match() {
        let sphere = Sphere::new(10, 7);
        let buffers = sphere.build(VertexLayout::POSITIONS_NORMALS_TEX_COORDS).unwrap();
        for vertex in 0..buffers.vertex_count() {
            let p = buffers.position(vertex);
            assert!((dot(p, p) - 1.0).abs() < 1e-5);
            assert_eq!(buffers.normal(vertex), Some(p));
        }
        assert_eq!(buffers.position(0), [0.0, -1.0, 0.0]);
        let north = buffers.position(1);
        assert!((north[1] - 1.0).abs() < 1e-6);
        assert_eq!(buffers.tex_coords(0), Some([0.5, 0.0]));
        assert_eq!(buffers.tex_coords(1), Some([0.5, 1.0]));

        let seam = sphere.vertex_number(10, 3, true).0 as usize;
        let start = sphere.vertex_number(0, 3, true).0 as usize;
        assert_eq!(buffers.tex_coords(seam).unwrap()[0], 1.0);
        assert_eq!(buffers.tex_coords(start).unwrap()[0], 0.0);
        let (a, b) = (buffers.position(seam), buffers.position(start));
        assert!(sub(a, b).iter().all(|d| d.abs() < 1e-5));
    }

    #[test]
    fn test_triangles_face_outward() {
        let sphere = Sphere::new(9, 6);
        let buffers = sphere.build(VertexLayout::POSITIONS).unwrap();
        for triangle in buffers.indices.chunks(3) {
            let [a, b, c] = [0usize, 1, 2].map(|k| buffers.position(triangle[k] as usize));
            let normal = cross(sub(b, a), sub(c, a));
            let centroid = [
                (a[0] + b[0] + c[0]) / 3.0,
                (a[1] + b[1] + c[1]) / 3.0,
                (a[2] + b[2] + c[2]) / 3.0,
            ];
            assert!(dot(normal, centroid) > 0.0);
        }
    }

    #[test]
    fn test_remesh_is_idempotent() {
        let mut sphere = Sphere::new(8, 8);
        assert!(!sphere.remesh(SphereResolution { slices: 8, stacks: 8 }));
        assert!(sphere.remesh(SphereResolution { slices: 1, stacks: 1000 }));
        assert_eq!(sphere.resolution(), SphereResolution { slices: 3, stacks: 255 });
        assert!(!sphere.remesh(SphereResolution { slices: 0, stacks: 255 }));
    }

    #[test]
    fn test_partial_views() {
        let sphere = Sphere::new(5, 4);
        assert_eq!(sphere.slice_index_range(0).unwrap(), 0..18);
        assert_eq!(sphere.slice_index_range(4).unwrap(), 72..90);
        assert!(sphere.slice_index_range(5).is_err());

        let strip = sphere.stack_strip_indices(1, false).unwrap();
        assert_eq!(strip.len(), 12);
        assert_eq!(strip[..2], strip[10..]);
        assert!(sphere.stack_strip_indices(4, false).is_err());
        let bottom = sphere.stack_strip_indices(0, true).unwrap();
        assert!(bottom.iter().skip(1).step_by(2).all(|&index| index == 0));

        let fan = sphere.north_pole_fan_indices(false);
        assert_eq!(fan.len(), 7);
        assert_eq!(fan[0], 1);
        assert_eq!(fan[1], fan[6]);
        let triangles = fan_to_triangle_list(&fan);
        assert_eq!(triangles.len(), 15);
        assert!(triangles.chunks(3).all(|t| t[0] == 1));
    }
}
