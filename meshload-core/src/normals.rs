//! Face normal calculation and per-vertex normal smoothing
//!
//! Smoothing welds the normals of coincident corners. Corners are bucketed
//! by a hash of the raw bit patterns of their coordinates and only corners
//! with bitwise-identical positions are merged, so shared vertices must come
//! from the same source value (as they do after OBJ denormalization).
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::store::MeshStore;

/// Cosine of the largest angle between face normals that still get merged (about 45°).
pub const DEFAULT_TOLERANCE: f32 = 0.707;

/// Buckets in the position hash table (prime).
const HASH_TABLE_SIZE: u64 = 9967;
const HASH_MULTIPLIER: u64 = 283;

/// How normals are laid out in the normal buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalMode {
    /// One unnormalized normal per triangle.
    PerFace,
    /// One smoothed unit normal per triangle corner.
    #[default]
    PerVertex,
}

/// Tolerances outside `[0.01, 0.99]` fall back to [`DEFAULT_TOLERANCE`].
pub fn clamp_tolerance(tolerance: f32) -> f32 {
    if (0.01..=0.99).contains(&tolerance) {
        tolerance
    } else {
        DEFAULT_TOLERANCE
    }
}

/// Unnormalized normal `(v1 - v0) x (v2 - v1)`.
pub fn face_normal(v0: &Point3<f32>, v1: &Point3<f32>, v2: &Point3<f32>) -> Vector3<f32> {
    (v1 - v0).cross(&(v2 - v1))
}

/// One unnormalized normal per whole triangle of a triangle soup.
pub fn compute_face_normals(vertices: &[Point3<f32>]) -> Vec<Vector3<f32>> {
    vertices
        .chunks_exact(3)
        .map(|t| face_normal(&t[0], &t[1], &t[2]))
        .collect()
}

fn unit(v: Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(0.0).unwrap_or(v)
}

fn position_hash(p: &Point3<f32>) -> usize {
    let [x, y, z] = [p.x, p.y, p.z].map(|c| u64::from(c.to_bits()));
    let h = x
        .wrapping_mul(HASH_MULTIPLIER)
        .wrapping_add(y)
        .wrapping_mul(HASH_MULTIPLIER)
        .wrapping_add(z);
    (h % HASH_TABLE_SIZE) as usize
}

fn same_bits(a: &Point3<f32>, b: &Point3<f32>) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

/// Per-corner normals for a triangle soup, welded across coincident corners.
///
/// Every face normal is normalized and copied to its three corners. Within
/// each group of bitwise-equal positions, corners whose normal is within
/// `tolerance` (cosine) of the group representative share the unit sum of
/// their normals; the others keep their face normal.
pub fn smooth_normals(
    vertices: &[Point3<f32>],
    face_normals: &[Vector3<f32>],
    tolerance: f32,
) -> MeshResult<Vec<Vector3<f32>>> {
    let faces = vertices.len() / 3;
    if faces < 1 {
        return Err(MeshError::DegenerateInput(format!(
            "{} vertices cannot form a triangle",
            vertices.len()
        )));
    }
    if face_normals.len() < faces {
        return Err(MeshError::DegenerateInput(format!(
            "{} face normals for {} triangles",
            face_normals.len(),
            faces
        )));
    }
    let tolerance = clamp_tolerance(tolerance);
    let corners = &vertices[..faces * 3];

    let mut normals: Vec<Vector3<f32>> = face_normals[..faces]
        .iter()
        .flat_map(|n| [unit(*n); 3])
        .collect();

    let mut table: Vec<Vec<usize>> = vec![Vec::new(); HASH_TABLE_SIZE as usize];
    for (i, p) in corners.iter().enumerate() {
        table[position_hash(p)].push(i);
    }

    for mut bucket in table {
        // most recently inserted corner leads
        bucket.reverse();
        while let Some((&lead, rest)) = bucket.split_first() {
            let position = corners[lead];
            let lead_normal = normals[lead];
            let (group, mut others): (Vec<usize>, Vec<usize>) = rest.iter().partition(|&&i| {
                same_bits(&corners[i], &position) && normals[i].dot(&lead_normal) > tolerance
            });

            if !group.is_empty() {
                let sum = group.iter().fold(lead_normal, |acc, &i| acc + normals[i]);
                let welded = unit(sum);
                normals[lead] = welded;
                for &i in &group {
                    normals[i] = welded;
                }
            }

            others.reverse();
            bucket = others;
        }
    }

    Ok(normals)
}

/// Normals for a triangle soup in the requested layout.
pub fn compute_normals(
    vertices: &[Point3<f32>],
    mode: NormalMode,
    tolerance: f32,
) -> MeshResult<Vec<Vector3<f32>>> {
    let face_normals = compute_face_normals(vertices);
    match mode {
        NormalMode::PerFace if face_normals.is_empty() => Err(MeshError::DegenerateInput(
            format!("{} vertices cannot form a triangle", vertices.len()),
        )),
        NormalMode::PerFace => Ok(face_normals),
        NormalMode::PerVertex => smooth_normals(vertices, &face_normals, tolerance),
    }
}

impl MeshStore {
    /// Recompute the normal buffer from vertex winding.
    ///
    /// `PerFace` stores one unnormalized normal per triangle, `PerVertex`
    /// stores smoothed unit normals for every corner.
    pub fn generate_normals(&mut self, mode: NormalMode, tolerance: f32) -> MeshResult<()> {
        let normals = compute_normals(self.vertices(), mode, tolerance)?;
        self.set_normal_count(normals.len())?;
        self.normals_mut().copy_from_slice(&normals);
        debug!("Generated {} {:?} normals", normals.len(), mode);
        Ok(())
    }
}
