//! Wavefront OBJ reader
//!
//! Supports `v`, `vn`, `vt` and `f` records with `\` line continuation.
//! Faces with more than three corners are triangulated by ear clipping,
//! falling back to a fan from the first corner when clipping yields nothing.
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use nalgebra::{Point3, Vector2, Vector3};
use nom::{
    character::complete::{char, i64 as integer},
    combinator::opt,
    sequence::{preceded, tuple},
    IResult,
};
use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};
use crate::store::MeshStore;
use crate::tessellate::triangulate;
use crate::text::{floats_after, Lines};

/// One face corner: vertex, texcoord and normal references, resolved to
/// 0-based positions. `None` means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Corner {
    pub vertex: Option<usize>,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

/// Reference triples of one emitted triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjTriangle {
    pub vertices: [usize; 3],
    pub texcoords: [Option<usize>; 3],
    pub normals: [Option<usize>; 3],
}

impl ObjTriangle {
    /// Triangle from three corners, or `None` if any vertex reference is unset.
    fn from_corners(a: &Corner, b: &Corner, c: &Corner) -> Option<Self> {
        Some(Self {
            vertices: [a.vertex?, b.vertex?, c.vertex?],
            texcoords: [a.texcoord, b.texcoord, c.texcoord],
            normals: [a.normal, b.normal, c.normal],
        })
    }
}

/// Parsed contents of an OBJ file before it is flattened into a store.
#[derive(Debug, Clone, Default)]
pub struct ObjModel {
    pub positions: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub texcoords: Vec<Vector2<f32>>,
    pub triangles: Vec<ObjTriangle>,
}

/// Raw face reference `v[/vt][/vn]`, 0 where a component is absent.
fn face_ref(input: &str) -> IResult<&str, (i64, i64, i64)> {
    let (input, v) = integer(input)?;
    let (input, rest) = opt(preceded(
        char('/'),
        tuple((opt(integer), opt(preceded(char('/'), opt(integer))))),
    ))(input)?;
    let (vt, vn) = match rest {
        Some((vt, vn)) => (vt.unwrap_or(0), vn.flatten().unwrap_or(0)),
        None => (0, 0),
    };
    Ok((input, (v, vt, vn)))
}

/// Resolve a 1-based or negative (relative) OBJ index against a list length.
fn resolve(index: i64, len: usize) -> Option<usize> {
    let resolved = match index {
        0 => return None,
        i if i > 0 => i - 1,
        i => len as i64 + i,
    };
    usize::try_from(resolved).ok()
}

impl ObjModel {
    fn vertex_of(&self, corner: &Corner) -> Option<Point3<f32>> {
        corner.vertex.and_then(|v| self.positions.get(v)).copied()
    }

    fn corner(&self, token: &str) -> Corner {
        let Ok((_, (v, vt, vn))) = face_ref(token) else {
            return Corner::default();
        };
        Corner {
            vertex: resolve(v, self.positions.len()).filter(|&v| v < self.positions.len()),
            texcoord: resolve(vt, self.texcoords.len()),
            normal: resolve(vn, self.normals.len()),
        }
    }

    fn add_face(&mut self, corners: &[Corner]) {
        match corners.len() {
            0..=2 => {}
            3 => {
                if let Some(tri) = ObjTriangle::from_corners(&corners[0], &corners[1], &corners[2]) {
                    self.triangles.push(tri);
                }
            }
            _ => {
                let loop_points: Option<Vec<Point3<f32>>> =
                    corners.iter().map(|c| self.vertex_of(c)).collect();
                let tessellated = loop_points.map(|p| triangulate(&p)).unwrap_or_default();

                if tessellated.is_empty() {
                    warn!(
                        "Tessellation of a {}-corner face failed, using fan decomposition",
                        corners.len()
                    );
                    self.add_fan(corners);
                    return;
                }

                for [i, j, k] in tessellated {
                    match ObjTriangle::from_corners(&corners[i], &corners[j], &corners[k]) {
                        Some(tri) => self.triangles.push(tri),
                        None => break,
                    }
                }
            }
        }
    }

    /// Fan from the first corner: `(0,1,2)`, `(0,2,3)`, ... stopping at the
    /// first corner without a vertex.
    fn add_fan(&mut self, corners: &[Corner]) {
        let Some(mut tri) = ObjTriangle::from_corners(&corners[0], &corners[1], &corners[2]) else {
            return;
        };
        self.triangles.push(tri);
        for corner in &corners[3..] {
            let Some(vertex) = corner.vertex else {
                break;
            };
            tri.vertices = [tri.vertices[0], tri.vertices[2], vertex];
            tri.texcoords = [tri.texcoords[0], tri.texcoords[2], corner.texcoord];
            tri.normals = [tri.normals[0], tri.normals[2], corner.normal];
            self.triangles.push(tri);
        }
    }

    fn parse_line(&mut self, line: &str) {
        let mut fields = line.split_whitespace();
        let Some(keyword) = fields.next() else {
            return;
        };
        match keyword {
            "v" => {
                let [x, y, z] = xyz(&floats_after(line, 1));
                self.positions.push(Point3::new(x, y, z));
            }
            "vn" => {
                let [x, y, z] = xyz(&floats_after(line, 1));
                self.normals.push(Vector3::new(x, y, z));
            }
            "vt" => {
                let uv = floats_after(line, 1);
                let u = uv.first().copied().unwrap_or(0.0);
                let v = uv.get(1).copied().unwrap_or(0.0);
                self.texcoords.push(Vector2::new(u, v));
            }
            "f" => {
                let corners: Vec<Corner> = fields.map(|token| self.corner(token)).collect();
                self.add_face(&corners);
            }
            _ => {}
        }
    }
}

/// First three components, missing ones read as zero.
fn xyz(values: &[f32]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = *value;
    }
    out
}

/// Parse OBJ records from a reader.
pub fn parse_obj<R: BufRead>(reader: R) -> io::Result<ObjModel> {
    let mut model = ObjModel::default();
    let mut lines = Lines::new(reader);

    while let Some(line) = lines.next() {
        let mut line = line?;
        while line.ends_with('\\') {
            line.pop();
            line.push(' ');
            match lines.next() {
                Some(next) => line.push_str(&next?),
                None => break,
            }
        }
        model.parse_line(&line);
    }

    debug!(
        "OBJ: {} positions, {} normals, {} texcoords, {} triangles",
        model.positions.len(),
        model.normals.len(),
        model.texcoords.len(),
        model.triangles.len()
    );
    Ok(model)
}

/// Flatten a parsed model into triangle-soup buffers of `store`.
///
/// Normals are written only when the file had `vn` records; triangles
/// whose normal references do not all resolve keep the default normal.
pub fn fill_store(model: &ObjModel, store: &mut MeshStore) -> MeshResult<()> {
    let vertex_count = model.triangles.len() * 3;
    store.set_vertex_count(vertex_count)?;
    let has_normals = !model.normals.is_empty();
    if has_normals {
        store.set_normal_count(vertex_count)?;
    }

    for (t, tri) in model.triangles.iter().enumerate() {
        for (corner, &v) in tri.vertices.iter().enumerate() {
            if let Some(&position) = model.positions.get(v) {
                store.set_vertex(t * 3 + corner, position);
            }
        }

        if !has_normals {
            continue;
        }
        let normals: Option<Vec<Vector3<f32>>> = tri
            .normals
            .iter()
            .map(|n| n.and_then(|n| model.normals.get(n)).copied())
            .collect();
        if let Some(normals) = normals {
            for (corner, normal) in normals.into_iter().enumerate() {
                store.set_normal(t * 3 + corner, normal);
            }
        }
    }
    Ok(())
}

/// Load an OBJ file into `store`.
pub fn load_obj(store: &mut MeshStore, path: &Path) -> MeshResult<()> {
    let file = File::open(path).map_err(|e| MeshError::io(path, e))?;
    let model = parse_obj(BufReader::new(file)).map_err(|e| MeshError::io(path, e))?;
    fill_store(&model, store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ObjModel {
        parse_obj(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_face_ref_forms() {
        assert_eq!(face_ref("3").unwrap().1, (3, 0, 0));
        assert_eq!(face_ref("3/7").unwrap().1, (3, 7, 0));
        assert_eq!(face_ref("3//5").unwrap().1, (3, 0, 5));
        assert_eq!(face_ref("3/7/5").unwrap().1, (3, 7, 5));
        assert_eq!(face_ref("-1/-2/-3").unwrap().1, (-1, -2, -3));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve(1, 4), Some(0));
        assert_eq!(resolve(-1, 4), Some(3));
        assert_eq!(resolve(0, 4), None);
        assert_eq!(resolve(-5, 4), None);
    }

    #[test]
    fn test_triangle_with_normals() {
        let model = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvt 0.5 0.5\nf 1/1/1 2/1/1 3/1/1\n",
        );
        assert_eq!(model.triangles.len(), 1);
        let tri = model.triangles[0];
        assert_eq!(tri.vertices, [0, 1, 2]);
        assert_eq!(tri.texcoords, [Some(0); 3]);
        assert_eq!(tri.normals, [Some(0); 3]);
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let model = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\nv 5 5 5\n");
        assert_eq!(model.triangles[0].vertices, [0, 1, 2]);
    }

    #[test]
    fn test_quad_is_tessellated() {
        let model = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");
        let tris: Vec<[usize; 3]> = model.triangles.iter().map(|t| t.vertices).collect();
        assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_degenerate_polygon_falls_back_to_fan() {
        let model = parse("v 0 0 0\nv 1 0 0\nv 2 0 0\nv 3 0 0\nf 1//1 2 3 4\nvn 0 0 1\n");
        let tris: Vec<[usize; 3]> = model.triangles.iter().map(|t| t.vertices).collect();
        assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_unresolved_vertex_drops_triangle() {
        let model = parse("v 0 0 0\nv 1 0 0\nf 1 2 3\nf 1 2 0\n");
        assert!(model.triangles.is_empty());
    }

    #[test]
    fn test_line_continuation() {
        let model = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 \\\n2 3\n");
        assert_eq!(model.triangles.len(), 1);
    }

    #[test]
    fn test_short_vertex_reads_zero() {
        let model = parse("v 1 2\n");
        assert_eq!(model.positions[0], Point3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_unknown_keywords_ignored() {
        let model = parse("# comment\no cube\ng group\nusemtl red\nv 0 0 0\n");
        assert_eq!(model.positions.len(), 1);
        assert!(model.triangles.is_empty());
    }

    #[test]
    fn test_fill_store_denormalizes() {
        let model = parse(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\nf 1 3 4\n",
        );
        let mut store = MeshStore::new();
        fill_store(&model, &mut store).unwrap();

        assert_eq!(store.vertex_count(), 6);
        assert_eq!(store.normal_count(), 6);
        assert_eq!(store.vertices()[3], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(store.vertices()[5], Point3::new(0.0, 1.0, 0.0));
        assert_eq!(store.normals()[0], Vector3::new(0.0, 0.0, 1.0));
        // second face had no normal references
        assert_eq!(store.normals()[4], crate::store::default_normal());
    }
}
