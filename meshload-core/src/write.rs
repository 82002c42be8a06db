//! Mesh writers for OBJ, ASCII STL and binary STL
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use nalgebra::Vector3;
use tracing::info;

use crate::error::{MeshError, MeshResult};
use crate::format::{has_stl_suffix, MeshFormat};
use crate::stl::HEADER_LEN;
use crate::store::{default_normal, MeshStore};

const BINARY_HEADER: &[u8] = b"created by meshload";

/// Output format for `path`: the token if given, then the suffix. Plain
/// `.stl` writes binary.
pub fn output_format(path: &Path, token: Option<&str>) -> MeshResult<MeshFormat> {
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        return token.parse();
    }
    if let Some(format) = MeshFormat::from_suffix(path) {
        return Ok(format);
    }
    if has_stl_suffix(path) {
        return Ok(MeshFormat::StlBinary);
    }
    Err(MeshError::FormatError(format!(
        "cannot determine output format of {}",
        path.display()
    )))
}

/// Normal written for facet `facet`.
///
/// A full per-vertex buffer gives the mean of the three corner normals, a
/// per-face buffer gives its entry, anything else `(0, 0, 1)`.
fn facet_normal(store: &MeshStore, facet: usize) -> Vector3<f32> {
    let normals = store.normals();
    let first = facet * 3;
    if normals.len() >= store.vertex_count() {
        if let Some(corners) = normals.get(first..first + 3) {
            return (corners[0] + corners[1] + corners[2]) / 3.0;
        }
    } else if normals.len() == store.triangle_count() {
        return normals[facet];
    }
    default_normal()
}

fn facet_attribute(store: &MeshStore, facet: usize) -> u16 {
    store
        .indices()
        .get(facet)
        .and_then(|&value| u16::try_from(value).ok())
        .unwrap_or(0)
}

pub fn write_ascii_stl<W: Write>(store: &MeshStore, mut writer: W) -> io::Result<()> {
    writeln!(writer, "solid ascii")?;
    for (f, triangle) in store.vertices().chunks_exact(3).enumerate() {
        let n = facet_normal(store, f);
        writeln!(writer, "facet normal {} {} {}", n.x, n.y, n.z)?;
        writeln!(writer, "outer loop")?;
        for v in triangle {
            writeln!(writer, "vertex {} {} {}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "endloop")?;
        writeln!(writer, "endfacet")?;
    }
    writeln!(writer, "endsolid")?;
    writer.flush()
}

pub fn write_binary_stl<W: Write>(store: &MeshStore, mut writer: W) -> io::Result<()> {
    let mut header = [0u8; HEADER_LEN];
    header[..BINARY_HEADER.len()].copy_from_slice(BINARY_HEADER);
    writer.write_all(&header)?;

    let count = u32::try_from(store.triangle_count())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many facets for STL"))?;
    writer.write_all(&count.to_le_bytes())?;

    for (f, triangle) in store.vertices().chunks_exact(3).enumerate() {
        let n = facet_normal(store, f);
        for value in n.iter().chain(triangle.iter().flat_map(|v| v.coords.iter())) {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.write_all(&facet_attribute(store, f).to_le_bytes())?;
    }
    writer.flush()
}

/// OBJ output with one `v` per vertex. Faces reference normals only when
/// the store has a normal for every vertex.
pub fn write_obj<W: Write>(store: &MeshStore, mut writer: W) -> io::Result<()> {
    let per_vertex = store.normal_count() >= store.vertex_count();

    for v in store.vertices() {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    if per_vertex {
        for n in store.normals() {
            writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
        }
    }
    for f in 0..store.triangle_count() {
        let [a, b, c] = [f * 3 + 1, f * 3 + 2, f * 3 + 3];
        if per_vertex {
            writeln!(writer, "f {a}//{a} {b}//{b} {c}//{c}")?;
        } else {
            writeln!(writer, "f {a} {b} {c}")?;
        }
    }
    writer.flush()
}

/// Save `store` to `path`. `format` is an optional `obj`/`sla`/`slb` token.
pub fn write_mesh(
    store: &MeshStore,
    path: impl AsRef<Path>,
    format: Option<&str>,
) -> MeshResult<MeshFormat> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(MeshError::InvalidArgument("empty path".to_string()));
    }
    if store.vertex_count() < 3 {
        return Err(MeshError::InvalidArgument(format!(
            "need at least 3 vertices to write, store has {}",
            store.vertex_count()
        )));
    }
    let format = output_format(path, format)?;

    let file = File::create(path).map_err(|e| MeshError::io(path, e))?;
    let writer = BufWriter::new(file);
    match format {
        MeshFormat::Obj => write_obj(store, writer),
        MeshFormat::StlAscii => write_ascii_stl(store, writer),
        MeshFormat::StlBinary => write_binary_stl(store, writer),
    }
    .map_err(|e| MeshError::io(path, e))?;

    info!(
        "Wrote {} triangles to {:?} ({})",
        store.triangle_count(),
        path,
        format
    );
    Ok(format)
}
