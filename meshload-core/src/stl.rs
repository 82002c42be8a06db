//! STL file readers for binary and ASCII formats
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};
use crate::store::MeshStore;
use crate::text::{floats_after, Lines};

/// Size of the ignored binary header.
pub const HEADER_LEN: usize = 80;

/// Size of one binary facet record: normal, three vertices, attribute.
pub const RECORD_LEN: usize = 50;

/// Largest facet count accepted as plausible.
pub const MAX_FACETS: i32 = 500_000_000;

/// One STL facet with its 16-bit attribute (zero for ASCII files).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facet {
    pub normal: Vector3<f32>,
    pub vertices: [Point3<f32>; 3],
    pub attribute: u16,
}

impl Default for Facet {
    fn default() -> Self {
        Self {
            normal: Vector3::zeros(),
            vertices: [Point3::origin(); 3],
            attribute: 0,
        }
    }
}

/// Facets read from a binary file and the byte order they were stored in.
#[derive(Debug, Clone, Default)]
pub struct BinaryStl {
    pub facets: Vec<Facet>,
    pub swapped: bool,
}

fn plausible(count: i32) -> bool {
    (0..=MAX_FACETS).contains(&count)
}

/// Decode the facet count, byte-swapping it when the little-endian value is
/// implausible. Returns the count and whether the file needs swapping.
pub fn decode_facet_count(raw: [u8; 4]) -> Option<(usize, bool)> {
    let count = i32::from_le_bytes(raw);
    if plausible(count) {
        return Some((count as usize, false));
    }
    let swapped = count.swap_bytes();
    plausible(swapped).then_some((swapped as usize, true))
}

fn read_f32(bytes: &[u8], swapped: bool) -> f32 {
    let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if swapped {
        f32::from_be_bytes(raw)
    } else {
        f32::from_le_bytes(raw)
    }
}

fn read_vec3(bytes: &[u8], swapped: bool) -> [f32; 3] {
    [
        read_f32(&bytes[0..4], swapped),
        read_f32(&bytes[4..8], swapped),
        read_f32(&bytes[8..12], swapped),
    ]
}

fn decode_record(record: &[u8; RECORD_LEN], swapped: bool) -> Facet {
    let normal = read_vec3(&record[0..12], swapped);
    let mut vertices = [Point3::origin(); 3];
    for (i, vertex) in vertices.iter_mut().enumerate() {
        let offset = 12 + i * 12;
        let [x, y, z] = read_vec3(&record[offset..offset + 12], swapped);
        *vertex = Point3::new(x, y, z);
    }
    let attribute = [record[48], record[49]];
    Facet {
        normal: Vector3::new(normal[0], normal[1], normal[2]),
        vertices,
        attribute: if swapped {
            u16::from_be_bytes(attribute)
        } else {
            u16::from_le_bytes(attribute)
        },
    }
}

/// Read a binary STL stream.
///
/// A stream that ends in the middle of the facet records yields the facets
/// read so far. A missing header or facet count is an I/O error, an
/// implausible count in both byte orders is `None`.
pub fn parse_binary_stl<R: Read>(mut reader: R) -> io::Result<Option<BinaryStl>> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    let mut raw_count = [0u8; 4];
    reader.read_exact(&mut raw_count)?;

    let Some((count, swapped)) = decode_facet_count(raw_count) else {
        return Ok(None);
    };
    if swapped {
        warn!("Binary STL facet count is big-endian, byte-swapping all fields");
    }

    let mut facets = Vec::with_capacity(count.min(1 << 20));
    let mut record = [0u8; RECORD_LEN];
    for _ in 0..count {
        match reader.read_exact(&mut record) {
            Ok(()) => facets.push(decode_record(&record, swapped)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(
                    "Binary STL truncated: {} of {} facets present",
                    facets.len(),
                    count
                );
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(Some(BinaryStl { facets, swapped }))
}

/// Vertex cursor of the ASCII scanner. `Closed` ignores vertices until the
/// next `outer loop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Open(usize),
    Closed,
}

/// Read an ASCII STL stream.
///
/// Keywords match case-insensitively. Loops with more than three vertices
/// produce a fan anchored at the first vertex of the loop; malformed
/// coordinate lines are skipped.
pub fn parse_ascii_stl<R: BufRead>(reader: R) -> io::Result<Vec<Facet>> {
    let mut facets = Vec::new();
    let mut facet = Facet::default();
    let mut state = LoopState::Open(0);

    for line in Lines::new(reader) {
        let line = line?.to_lowercase();

        if line.contains("facet normal") {
            if let [x, y, z, ..] = floats_after(&line, 2)[..] {
                facet.normal = Vector3::new(x, y, z);
            }
            continue;
        }
        if line.contains("outer loop") {
            state = LoopState::Open(0);
            continue;
        }
        if line.contains("vertex") {
            let [x, y, z, ..] = floats_after(&line, 1)[..] else {
                continue;
            };
            let LoopState::Open(count) = state else {
                continue;
            };
            let point = Point3::new(x, y, z);
            match count {
                0 | 1 => facet.vertices[count] = point,
                2 => {
                    facet.vertices[2] = point;
                    facets.push(facet);
                }
                _ => {
                    facet.vertices[1] = facet.vertices[2];
                    facet.vertices[2] = point;
                    facets.push(facet);
                }
            }
            state = LoopState::Open(count + 1);
            continue;
        }
        if line.contains("endloop") {
            state = LoopState::Closed;
        }
    }

    debug!("ASCII STL: {} facets", facets.len());
    Ok(facets)
}

/// Write three vertices and three copies of the facet normal per facet.
/// With `attributes`, the index buffer receives one attribute per facet
/// when it can be allocated.
pub fn fill_store(facets: &[Facet], store: &mut MeshStore, attributes: bool) -> MeshResult<()> {
    let vertex_count = facets.len() * 3;
    store.set_vertex_count(vertex_count)?;
    store.set_normal_count(vertex_count)?;

    for (f, facet) in facets.iter().enumerate() {
        for (corner, vertex) in facet.vertices.iter().enumerate() {
            store.set_vertex(f * 3 + corner, *vertex);
            store.set_normal(f * 3 + corner, facet.normal);
        }
    }

    if attributes {
        match store.set_index_count(facets.len()) {
            Ok(()) => {
                for (slot, facet) in store.indices_mut().iter_mut().zip(facets) {
                    *slot = i32::from(facet.attribute);
                }
            }
            Err(e) => warn!("Skipping STL facet attributes: {}", e),
        }
    }
    Ok(())
}

/// Load an ASCII STL file into `store`.
pub fn load_ascii_stl(store: &mut MeshStore, path: &Path) -> MeshResult<()> {
    let file = File::open(path).map_err(|e| MeshError::io(path, e))?;
    let facets = parse_ascii_stl(BufReader::new(file)).map_err(|e| MeshError::io(path, e))?;
    fill_store(&facets, store, false)
}

/// Load a binary STL file into `store`.
pub fn load_binary_stl(store: &mut MeshStore, path: &Path) -> MeshResult<()> {
    let file = File::open(path).map_err(|e| MeshError::io(path, e))?;
    let stl = parse_binary_stl(BufReader::new(file))
        .map_err(|e| MeshError::io(path, e))?
        .ok_or_else(|| {
            MeshError::FormatError(format!(
                "implausible facet count in {} (in either byte order)",
                path.display()
            ))
        })?;
    debug!(
        "Binary STL: {} facets, byte-swapped: {}",
        stl.facets.len(),
        stl.swapped
    );
    fill_store(&stl.facets, store, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(count: [u8; 4], records: &[[u8; RECORD_LEN]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&count);
        for record in records {
            data.extend_from_slice(record);
        }
        data
    }

    fn record_le(values: [f32; 12], attribute: u16) -> [u8; RECORD_LEN] {
        let mut record = [0u8; RECORD_LEN];
        for (i, v) in values.iter().enumerate() {
            record[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        record[48..].copy_from_slice(&attribute.to_le_bytes());
        record
    }

    #[test]
    fn test_parse_binary_header() {
        let data = binary(0u32.to_le_bytes(), &[]);
        let stl = parse_binary_stl(&data[..]).unwrap().unwrap();
        assert!(stl.facets.is_empty());
        assert!(!stl.swapped);
    }

    #[test]
    fn test_parse_binary_facet() {
        let values = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let data = binary(1u32.to_le_bytes(), &[record_le(values, 7)]);
        let stl = parse_binary_stl(&data[..]).unwrap().unwrap();
        assert_eq!(stl.facets.len(), 1);
        let facet = stl.facets[0];
        assert_eq!(facet.normal, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(facet.vertices[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(facet.attribute, 7);
    }

    #[test]
    fn test_truncated_records_keep_complete_facets() {
        let values = [0.5; 12];
        let mut data = binary(3u32.to_le_bytes(), &[record_le(values, 0)]);
        data.extend_from_slice(&[0u8; 20]);
        let stl = parse_binary_stl(&data[..]).unwrap().unwrap();
        assert_eq!(stl.facets.len(), 1);
    }

    #[test]
    fn test_missing_count_is_error() {
        let data = vec![0u8; 82];
        assert!(parse_binary_stl(&data[..]).is_err());
    }

    #[test]
    fn test_facet_count_detection() {
        assert_eq!(decode_facet_count(12i32.to_le_bytes()), Some((12, false)));
        // 200 read little-endian is negative
        assert_eq!(decode_facet_count(200i32.to_be_bytes()), Some((200, true)));
        // 12 read little-endian is a plausible 201326592
        assert_eq!(
            decode_facet_count(12i32.to_be_bytes()),
            Some((0x0C00_0000, false))
        );
        assert_eq!(decode_facet_count((-1i32).to_le_bytes()), None);
        let (_, swapped) = decode_facet_count((MAX_FACETS + 1).to_le_bytes()).unwrap();
        assert!(swapped);
    }

    #[test]
    fn test_parse_ascii_facets() {
        let text = "solid test\n\
            facet normal 0 0 1\n\
            outer loop\n\
            vertex 0 0 0\n\
            vertex 1 0 0\n\
            vertex 0 1 0\n\
            endloop\n\
            endfacet\n\
            FACET NORMAL 0 0 -1\n\
            OUTER LOOP\n\
            VERTEX 0 0 1\n\
            VERTEX 0 1 1\n\
            VERTEX 1 0 1\n\
            ENDLOOP\n\
            ENDFACET\n\
            endsolid test\n";
        let facets = parse_ascii_stl(text.as_bytes()).unwrap();
        assert_eq!(facets.len(), 2);
        assert_eq!(facets[1].normal, Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(facets[1].vertices[2], Point3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_ascii_polygon_loop_is_fan_from_first_vertex() {
        let text = "solid quad\nfacet normal 0 0 1\nouter loop\n\
            vertex 0 0 0\nvertex 1 0 0\nvertex 1 1 0\nvertex 0 1 0\n\
            endloop\nendfacet\nendsolid\n";
        let facets = parse_ascii_stl(text.as_bytes()).unwrap();
        assert_eq!(facets.len(), 2);
        assert_eq!(facets[1].vertices[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(facets[1].vertices[1], Point3::new(1.0, 1.0, 0.0));
        assert_eq!(facets[1].vertices[2], Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_ascii_skips_malformed_and_closed_loop_vertices() {
        let text = "solid s\nfacet normal 0 0 1\nouter loop\n\
            vertex 0 0 0\nvertex 1 0\nvertex 1 0 0\nvertex 0 1 0\n\
            endloop\nvertex 9 9 9\nendfacet\nendsolid\n";
        let facets = parse_ascii_stl(text.as_bytes()).unwrap();
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[0].vertices[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_fill_store_with_attributes() {
        let facet = Facet {
            normal: Vector3::new(0.0, 1.0, 0.0),
            vertices: [Point3::origin(); 3],
            attribute: 0xABCD,
        };
        let mut store = MeshStore::new();
        fill_store(&[facet, facet], &mut store, true).unwrap();
        assert_eq!(store.vertex_count(), 6);
        assert_eq!(store.normals()[5], Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(store.indices(), &[0xABCD, 0xABCD]);
    }
}
