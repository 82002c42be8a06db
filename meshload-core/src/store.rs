//! Pooled mesh buffers shared by every loader
//!
//! A [`MeshStore`] keeps four independently sized buffers. Each buffer has a
//! logical length and a pool capacity; capacity only grows, and growing the
//! logical length default-fills only the slots that become newly visible.
use nalgebra::{Point3, Vector3};

use crate::error::{BufferKind, MeshError, MeshResult};

/// Color given to newly exposed color slots (light gray, opaque).
pub const DEFAULT_COLOR: [f32; 4] = [0.9, 0.9, 0.9, 1.0];

/// Value given to newly exposed index slots.
pub const UNSET_INDEX: i32 = -1;

/// Normal given to newly exposed normal slots.
pub fn default_normal() -> Vector3<f32> {
    Vector3::new(0.0, 0.0, 1.0)
}

/// Growable buffer with a logical length distinct from its pool size.
#[derive(Debug, Clone)]
pub(crate) struct Pool<T> {
    items: Vec<T>,
    len: usize,
    fill: T,
    kind: BufferKind,
}

impl<T: Clone> Pool<T> {
    fn new(fill: T, kind: BufferKind) -> Self {
        Self {
            items: Vec::new(),
            len: 0,
            fill,
            kind,
        }
    }

    fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Grow the pool to at least `capacity` slots. Never shrinks.
    fn reserve(&mut self, capacity: usize) -> MeshResult<()> {
        let current = self.items.len();
        if current >= capacity {
            return Ok(());
        }
        if self.items.try_reserve_exact(capacity - current).is_err() {
            self.items = Vec::new();
            self.len = 0;
            return Err(MeshError::AllocationFailure {
                buffer: self.kind,
                requested: capacity,
            });
        }
        self.items.resize(capacity, self.fill.clone());
        Ok(())
    }

    fn set_len(&mut self, len: usize) -> MeshResult<()> {
        self.reserve(len)?;
        if len > self.len {
            for slot in &mut self.items[self.len..len] {
                *slot = self.fill.clone();
            }
        }
        self.len = len;
        Ok(())
    }

    fn set(&mut self, index: usize, value: T) -> bool {
        if index >= self.len {
            return false;
        }
        self.items[index] = value;
        true
    }

    fn as_slice(&self) -> &[T] {
        &self.items[..self.len]
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items[..self.len]
    }
}

/// Axis-aligned bounding box of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// The box reported for a mesh without vertices.
    pub fn degenerate() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::new(1e-6, 1e-6, 1e-6),
        }
    }

    pub fn extents(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Copy with inverted axes swapped and axes thinner than `1e-4` padded
    /// by `1e-4` on both sides, suitable for framing a camera.
    pub fn display_safe(&self) -> Self {
        const PAD: f32 = 1e-4;
        let mut min = self.min;
        let mut max = self.max;
        for axis in 0..3 {
            if max[axis] < min[axis] {
                std::mem::swap(&mut min[axis], &mut max[axis]);
            }
            if max[axis] - min[axis] < PAD {
                min[axis] -= PAD;
                max[axis] += PAD;
            }
        }
        Self { min, max }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }
}

/// In-memory mesh: positions, normals, indices and colors plus a bounding box
///
/// Loaders write positions and normals in triangle order, three consecutive
/// slots per triangle. The meaning of the index buffer depends on the loader
/// (per-facet attribute for binary STL, unused for OBJ).
#[derive(Debug, Clone)]
pub struct MeshStore {
    vertices: Pool<Point3<f32>>,
    normals: Pool<Vector3<f32>>,
    indices: Pool<i32>,
    colors: Pool<[f32; 4]>,
    bbox: BoundingBox,
}

impl MeshStore {
    pub fn new() -> Self {
        Self {
            vertices: Pool::new(Point3::origin(), BufferKind::Vertices),
            normals: Pool::new(default_normal(), BufferKind::Normals),
            indices: Pool::new(UNSET_INDEX, BufferKind::Indices),
            colors: Pool::new(DEFAULT_COLOR, BufferKind::Colors),
            bbox: BoundingBox::default(),
        }
    }

    /// Build a triangle soup store from explicit triangles.
    pub fn from_triangles(triangles: &[[Point3<f32>; 3]]) -> MeshResult<Self> {
        let mut store = Self::new();
        store.set_vertex_count(triangles.len() * 3)?;
        for (slot, point) in store
            .vertices
            .as_mut_slice()
            .iter_mut()
            .zip(triangles.iter().flatten())
        {
            *slot = *point;
        }
        store.compute_bounding_box();
        Ok(store)
    }

    /// Grow pool capacities. `None` leaves that buffer untouched.
    ///
    /// Every requested buffer is attempted; the first failure is returned.
    pub fn reserve(
        &mut self,
        vertices: Option<usize>,
        normals: Option<usize>,
        indices: Option<usize>,
        colors: Option<usize>,
    ) -> MeshResult<()> {
        let results = [
            vertices.map_or(Ok(()), |n| self.vertices.reserve(n)),
            normals.map_or(Ok(()), |n| self.normals.reserve(n)),
            indices.map_or(Ok(()), |n| self.indices.reserve(n)),
            colors.map_or(Ok(()), |n| self.colors.reserve(n)),
        ];
        results.into_iter().collect()
    }

    pub fn set_vertex_count(&mut self, count: usize) -> MeshResult<()> {
        self.vertices.set_len(count)
    }

    pub fn set_normal_count(&mut self, count: usize) -> MeshResult<()> {
        self.normals.set_len(count)
    }

    pub fn set_index_count(&mut self, count: usize) -> MeshResult<()> {
        self.indices.set_len(count)
    }

    pub fn set_color_count(&mut self, count: usize) -> MeshResult<()> {
        self.colors.set_len(count)
    }

    /// Returns `false` when `index` is past the logical vertex count.
    pub fn set_vertex(&mut self, index: usize, position: Point3<f32>) -> bool {
        self.vertices.set(index, position)
    }

    pub fn set_normal(&mut self, index: usize, normal: Vector3<f32>) -> bool {
        self.normals.set(index, normal)
    }

    pub fn set_index(&mut self, index: usize, value: i32) -> bool {
        self.indices.set(index, value)
    }

    pub fn set_color(&mut self, index: usize, rgba: [f32; 4]) -> bool {
        self.colors.set(index, rgba)
    }

    /// Set the RGB channels of a color, keeping its alpha.
    pub fn set_color_rgb(&mut self, index: usize, rgb: [f32; 3]) -> bool {
        let Some(alpha) = self.colors.as_slice().get(index).map(|c| c[3]) else {
            return false;
        };
        self.colors.set(index, [rgb[0], rgb[1], rgb[2], alpha])
    }

    /// Recompute the bounding box from the current vertices.
    pub fn compute_bounding_box(&mut self) -> BoundingBox {
        let vertices = self.vertices.as_slice();
        self.bbox = match vertices.split_first() {
            None => BoundingBox::degenerate(),
            Some((first, rest)) => rest.iter().fold(
                BoundingBox {
                    min: *first,
                    max: *first,
                },
                |bbox, v| BoundingBox {
                    min: bbox.min.inf(v),
                    max: bbox.max.sup(v),
                },
            ),
        };
        self.bbox
    }

    /// Bounding box as of the last [`compute_bounding_box`](Self::compute_bounding_box).
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    pub fn vertices(&self) -> &[Point3<f32>] {
        self.vertices.as_slice()
    }

    pub fn normals(&self) -> &[Vector3<f32>] {
        self.normals.as_slice()
    }

    pub fn indices(&self) -> &[i32] {
        self.indices.as_slice()
    }

    pub fn colors(&self) -> &[[f32; 4]] {
        self.colors.as_slice()
    }

    pub(crate) fn normals_mut(&mut self) -> &mut [Vector3<f32>] {
        self.normals.as_mut_slice()
    }

    pub(crate) fn indices_mut(&mut self) -> &mut [i32] {
        self.indices.as_mut_slice()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len
    }

    pub fn normal_count(&self) -> usize {
        self.normals.len
    }

    pub fn index_count(&self) -> usize {
        self.indices.len
    }

    pub fn color_count(&self) -> usize {
        self.colors.len
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }

    pub fn normal_capacity(&self) -> usize {
        self.normals.capacity()
    }

    pub fn index_capacity(&self) -> usize {
        self.indices.capacity()
    }

    pub fn color_capacity(&self) -> usize {
        self.colors.capacity()
    }

    /// Number of whole triangles in the vertex buffer.
    pub fn triangle_count(&self) -> usize {
        self.vertices.len / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.len == 0
    }

    /// Vertex positions as a flat `xyz` array for the rendering layer.
    pub fn flat_vertices(&self) -> Vec<f32> {
        self.vertices().iter().flat_map(|p| [p.x, p.y, p.z]).collect()
    }

    pub fn flat_normals(&self) -> Vec<f32> {
        self.normals().iter().flat_map(|n| [n.x, n.y, n.z]).collect()
    }

    pub fn flat_colors(&self) -> Vec<f32> {
        self.colors().iter().flatten().copied().collect()
    }
}

impl Default for MeshStore {
    fn default() -> Self {
        Self::new()
    }
}
