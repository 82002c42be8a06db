//! Ear-clipping triangulation of planar polygon loops
use nalgebra::{Point3, Vector3};

/// Classification of a candidate ear `(i, j, k)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Corner {
    Convex,
    Concave,
    Degenerate,
}

/// Edge data of the candidate ear, reused by the containment test.
struct Ear {
    e0: Vector3<f32>,
    e1: Vector3<f32>,
    normal: Vector3<f32>,
    area2: f32,
}

impl Ear {
    fn new(pi: &Point3<f32>, pj: &Point3<f32>, pk: &Point3<f32>) -> Self {
        let e0 = pi - pk;
        let e1 = pj - pk;
        let normal = e0.cross(&e1);
        let area2 = normal.dot(&normal);
        Self {
            e0,
            e1,
            normal,
            area2,
        }
    }

    fn classify(&self, face_normal: &Vector3<f32>) -> Corner {
        if self.area2.abs() < f32::EPSILON {
            Corner::Degenerate
        } else if self.normal.dot(face_normal) < 0.0 {
            Corner::Concave
        } else {
            Corner::Convex
        }
    }

    /// Strict interior test against the triangle whose third corner is `pk`.
    fn contains(&self, point: &Point3<f32>, pk: &Point3<f32>) -> bool {
        let d = point - pk;
        let b0 = self.normal.dot(&d.cross(&self.e1));
        if b0 <= 0.0 {
            return false;
        }
        let b1 = self.normal.dot(&self.e0.cross(&d));
        if b1 <= 0.0 {
            return false;
        }
        self.area2 - b0 - b1 > 0.0
    }
}

/// Unit normal estimated from the fan of edges out of the first vertex,
/// keeping the candidate with the largest magnitude.
fn estimate_normal(points: &[Point3<f32>]) -> Vector3<f32> {
    let v01 = points[1] - points[0];
    let best = points[2..]
        .iter()
        .map(|p| v01.cross(&(p - points[0])))
        .fold(Vector3::zeros(), |best, candidate| {
            if best.norm_squared() < candidate.norm_squared() {
                candidate
            } else {
                best
            }
        });
    best.try_normalize(0.0).unwrap_or(best)
}

/// Triangulate a polygon loop by ear clipping.
///
/// Returns index triples into `points`. A triangle passes through as
/// `[0, 1, 2]`. Non-planar or self-intersecting loops may be triangulated
/// only partially, and an empty result means nothing could be clipped.
pub fn triangulate(points: &[Point3<f32>]) -> Vec<[usize; 3]> {
    let mut triangles = Vec::new();
    if points.len() < 3 {
        return triangles;
    }

    let face_normal = estimate_normal(points);
    let mut live: Vec<usize> = (0..points.len()).collect();
    let mut progressed = true;

    while live.len() >= 3 && progressed {
        progressed = false;
        let (mut i, mut j, mut k) = (0, 1, 2);
        while k < live.len() {
            let pk = &points[live[k]];
            let ear = Ear::new(&points[live[i]], &points[live[j]], pk);
            match ear.classify(&face_normal) {
                Corner::Convex => {
                    let blocked = live
                        .iter()
                        .enumerate()
                        .any(|(pos, &v)| (pos < i || pos > k) && ear.contains(&points[v], pk));
                    if blocked {
                        (i, j, k) = (j, k, k + 1);
                    } else {
                        triangles.push([live[i], live[j], live[k]]);
                        live.remove(j);
                        progressed = true;
                    }
                }
                Corner::Concave => {
                    (i, j, k) = (j, k, k + 1);
                }
                Corner::Degenerate => {
                    live.remove(j);
                    progressed = true;
                }
            }
        }
    }

    triangles
}
