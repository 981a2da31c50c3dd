use std::io::ErrorKind;

use tempfile::tempdir;

use terrain_tin::crs::Crs;
use terrain_tin::geometry::Point;
use terrain_tin::io::native::{
    read_tin, read_tin_v1, read_tin_with_progress, write_tin, write_tin_v1,
};
use terrain_tin::tin::TinMesh;

fn sample_mesh() -> TinMesh {
    let mut mesh = TinMesh::new();
    mesh.add_vertex(Point::new(100.25, 200.5), 12.5);
    mesh.add_vertex(Point::new(110.0, 200.5), 13.0);
    mesh.add_vertex(Point::new(100.25, 210.75), 14.25);
    mesh.add_vertex(Point::new(110.0, 210.75), 15.5);
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(1, 3, 2);
    mesh.crs = Some(Crs::from_wkt("PROJCS[\"Test\",GEOGCS[\"WGS 84\"]]"));
    mesh.compute_extents();
    mesh
}

#[test]
fn v2_roundtrip_is_identity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("surface.tin");
    let mesh = sample_mesh();
    write_tin(path.to_str().unwrap(), &mesh).unwrap();
    let read = read_tin(path.to_str().unwrap()).unwrap();
    assert_eq!(read.vertex_count(), mesh.vertex_count());
    assert_eq!(read.triangle_count(), mesh.triangle_count());
    for (a, b) in mesh.vertices.iter().zip(&read.vertices) {
        assert_eq!(a.point, b.point);
        assert_eq!(a.elevation, b.elevation);
    }
    for (a, b) in mesh.triangles.iter().zip(&read.triangles) {
        assert_eq!(a.v, b.v);
    }
    assert_eq!(
        read.crs.as_ref().map(|c| c.definition()),
        mesh.crs.as_ref().map(|c| c.definition())
    );
    assert_eq!(read.extents(), mesh.extents());
}

#[test]
fn v2_rewrite_is_byte_identical() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("a.tin");
    let second = dir.path().join("b.tin");
    let mesh = sample_mesh();
    write_tin(first.to_str().unwrap(), &mesh).unwrap();
    let read = read_tin(first.to_str().unwrap()).unwrap();
    write_tin(second.to_str().unwrap(), &read).unwrap();
    assert_eq!(
        std::fs::read(first).unwrap(),
        std::fs::read(second).unwrap()
    );
}

#[test]
fn bad_magic_is_invalid_data() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bogus.tin");
    std::fs::write(&path, b"not a tin file at all").unwrap();
    let err = read_tin(path.to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn cancelling_read_reports_interrupted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("surface.tin");
    write_tin(path.to_str().unwrap(), &sample_mesh()).unwrap();
    let mut cancel = |_p: u32| true;
    let err = read_tin_with_progress(path.to_str().unwrap(), &mut cancel).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Interrupted);
}

#[test]
fn v1_roundtrip_duplicates_shared_vertices() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.flat");
    let mesh = sample_mesh();
    write_tin_v1(path.to_str().unwrap(), &mesh).unwrap();
    let read = read_tin_v1(path.to_str().unwrap()).unwrap();
    // each triangle carries its own three vertices in the legacy layout
    assert_eq!(read.vertex_count(), mesh.triangle_count() * 3);
    assert_eq!(read.triangle_count(), mesh.triangle_count());
    for (t, tri) in mesh.triangles.iter().enumerate() {
        for (k, &v) in tri.v.iter().enumerate() {
            let original = &mesh.vertices[v];
            let copy = &read.vertices[3 * t + k];
            assert!((copy.point.x - original.point.x).abs() < 1e-3);
            assert!((copy.point.y - original.point.y).abs() < 1e-3);
            assert_eq!(copy.elevation, original.elevation);
        }
    }
    // welding the duplicates restores the shared topology
    let mut read = read;
    assert_eq!(read.weld_vertices(16), 2);
    assert_eq!(read.vertex_count(), 4);
}

#[test]
fn v1_truncated_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.flat");
    std::fs::write(&path, [0u8; 13]).unwrap();
    let err = read_tin_v1(path.to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}
