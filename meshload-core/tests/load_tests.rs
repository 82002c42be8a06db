use std::io::Write;

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};

use meshload_core::{
    load_mesh, write_mesh, LoadOptions, MeshError, MeshFormat, MeshStore, NormalPolicy,
};
use tempfile::NamedTempFile;

// ── Helper Functions ─────────────────────────────────────────────────────

fn fixture(suffix: &str, contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

fn positions(store: &MeshStore) -> Vec<[u32; 3]> {
    store
        .vertices()
        .iter()
        .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
        .collect()
}

fn sample_store() -> MeshStore {
    MeshStore::from_triangles(&[
        [
            Point3::new(0.1, -2.5, 3.75),
            Point3::new(10.0, 0.0, -0.001),
            Point3::new(-4.2, 7.0, 1.0e-4),
        ],
        [
            Point3::new(0.1, -2.5, 3.75),
            Point3::new(-4.2, 7.0, 1.0e-4),
            Point3::new(123.456, 0.5, 2.0),
        ],
    ])
    .unwrap()
}

// ── OBJ ──────────────────────────────────────────────────────────────────

#[test]
fn obj_quad_becomes_two_triangles() {
    let file = fixture(
        ".obj",
        b"# unit square\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
    );
    let (store, format) = load_mesh(file.path(), &LoadOptions::default()).unwrap();

    assert_eq!(format, MeshFormat::Obj);
    assert_eq!(store.triangle_count(), 2);
    assert_eq!(store.vertex_count(), 6);
    for corner in [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ] {
        assert!(store.vertices().contains(&corner), "missing {corner:?}");
    }

    // no vn records, so normals were generated for every vertex
    assert_eq!(store.normal_count(), 6);
    for n in store.normals() {
        assert_relative_eq!(*n, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    let bbox = store.bounding_box();
    assert_eq!(bbox.min, Point3::new(0.0, 0.0, 0.0));
    assert_eq!(bbox.max, Point3::new(1.0, 1.0, 0.0));
}

#[test]
fn obj_normal_policy() {
    let file = fixture(
        ".obj",
        b"v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1\n",
    );

    let (kept, _) = load_mesh(file.path(), &LoadOptions::default()).unwrap();
    assert_eq!(kept.normals(), &[Vector3::new(0.0, 0.0, -1.0); 3]);

    let always = LoadOptions {
        normals: NormalPolicy::Always,
        ..LoadOptions::default()
    };
    let (regenerated, _) = load_mesh(file.path(), &always).unwrap();
    for n in regenerated.normals() {
        assert_relative_eq!(*n, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    let never = LoadOptions {
        normals: NormalPolicy::Never,
        ..LoadOptions::default()
    };
    let bare = fixture(".obj", b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
    let (store, _) = load_mesh(bare.path(), &never).unwrap();
    assert_eq!(store.normal_count(), 0);
}

#[test]
fn empty_obj_has_degenerate_bbox() {
    let file = fixture(".obj", b"# nothing here\n");
    let (store, _) = load_mesh(file.path(), &LoadOptions::default()).unwrap();
    assert!(store.is_empty());
    let bbox = store.bounding_box();
    assert_eq!(bbox.min, Point3::new(0.0, 0.0, 0.0));
    assert_eq!(bbox.max, Point3::new(1e-6, 1e-6, 1e-6));
}

// ── STL ──────────────────────────────────────────────────────────────────

#[test]
fn big_endian_binary_stl_is_recovered() {
    let normal = [0.0f32, -1.0, 0.0];
    let vertices = [[1.5f32, -2.25, 0.003], [7.0, 8.125, -9.5], [0.0, 1.0e-7, 3.0e6]];

    // 32 facets: the count reads as 536870912 little-endian, above the limit
    let facets = 32;
    let mut data = vec![b' '; 80];
    data.extend_from_slice(&(facets as i32).to_be_bytes());
    for _ in 0..facets {
        for value in normal.iter().chain(vertices.iter().flatten()) {
            data.extend_from_slice(&value.to_be_bytes());
        }
        data.extend_from_slice(&0x0102u16.to_be_bytes());
    }
    let file = fixture(".slb", &data);

    let (store, format) = load_mesh(file.path(), &LoadOptions::default()).unwrap();
    assert_eq!(format, MeshFormat::StlBinary);
    assert_eq!(store.vertex_count(), facets * 3);
    for (loaded, expected) in store.vertices().iter().zip(vertices.iter().cycle()) {
        assert_eq!(loaded.x.to_bits(), expected[0].to_bits());
        assert_eq!(loaded.y.to_bits(), expected[1].to_bits());
        assert_eq!(loaded.z.to_bits(), expected[2].to_bits());
    }
    assert!(store.normals().iter().all(|n| *n == Vector3::new(0.0, -1.0, 0.0)));
    assert_eq!(store.indices(), &[0x0102; 32][..]);
}

#[test]
fn ascii_stl_sniffed_and_fanned() {
    let file = fixture(
        ".stl",
        b"solid fan\r\nfacet normal 0 0 1\r\nouter loop\r\n\
          vertex 0 0 0\r\nvertex 2 0 0\r\nvertex 2 2 0\r\nvertex 0 2 0\r\n\
          endloop\r\nendfacet\r\nendsolid fan\r\n",
    );
    let (store, format) = load_mesh(file.path(), &LoadOptions::default()).unwrap();
    assert_eq!(format, MeshFormat::StlAscii);
    assert_eq!(store.triangle_count(), 2);
    assert_eq!(store.vertices()[3], Point3::new(0.0, 0.0, 0.0));
    assert_eq!(store.bounding_box().max, Point3::new(2.0, 2.0, 0.0));
}

#[test]
fn truncated_binary_header_is_io_failure() {
    let file = fixture(".slb", &[0u8; 40]);
    assert!(matches!(
        load_mesh(file.path(), &LoadOptions::default()),
        Err(MeshError::IoFailure { .. })
    ));
}

#[test]
fn missing_file_is_io_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.obj");
    assert!(matches!(
        load_mesh(&path, &LoadOptions::default()),
        Err(MeshError::IoFailure { .. })
    ));
}

// ── Writers ──────────────────────────────────────────────────────────────

#[test]
fn written_meshes_read_back() {
    let store = sample_store();
    let options = LoadOptions {
        normals: NormalPolicy::Never,
        ..LoadOptions::default()
    };

    let dir = tempfile::tempdir().unwrap();
    for (name, expected) in [
        ("out.obj", MeshFormat::Obj),
        ("out.stla", MeshFormat::StlAscii),
        ("out.stl", MeshFormat::StlBinary),
    ] {
        let path = dir.path().join(name);
        assert_eq!(write_mesh(&store, &path, None).unwrap(), expected);

        let (loaded, format) = load_mesh(&path, &options).unwrap();
        assert_eq!(format, expected, "{name}");
        assert_eq!(loaded.triangle_count(), store.triangle_count(), "{name}");
        assert_eq!(positions(&loaded), positions(&store), "{name}");
    }
}

#[test]
fn explicit_format_token_overrides_suffix() {
    let store = sample_store();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.dat");
    write_mesh(&store, &path, Some("sla")).unwrap();

    let options = LoadOptions {
        format: Some(MeshFormat::StlAscii),
        ..LoadOptions::default()
    };
    let (loaded, _) = load_mesh(&path, &options).unwrap();
    assert_eq!(loaded.triangle_count(), 2);
}
