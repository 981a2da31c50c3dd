use tempfile::tempdir;

use terrain_tin::geometry::Point;
use terrain_tin::io::gms::{read_tin_gms, write_tin_gms};
use terrain_tin::tin::TinMesh;

fn quad_mesh() -> TinMesh {
    let mut mesh = TinMesh::new();
    mesh.add_vertex(Point::new(0.0, 0.0), 1.0);
    mesh.add_vertex(Point::new(10.0, 0.0), 2.0);
    mesh.add_vertex(Point::new(10.0, 10.0), 3.0);
    mesh.add_vertex(Point::new(0.0, 10.0), 4.0);
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(0, 2, 3);
    mesh
}

#[test]
fn write_then_read_is_identity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("surface.gms");
    let mesh = quad_mesh();
    write_tin_gms(path.to_str().unwrap(), &mesh).unwrap();
    let read = read_tin_gms(path.to_str().unwrap()).unwrap();
    assert_eq!(read.vertex_count(), 4);
    assert_eq!(read.triangle_count(), 2);
    for (a, b) in mesh.vertices.iter().zip(&read.vertices) {
        assert_eq!(a.point, b.point);
        assert_eq!(a.elevation, b.elevation);
    }
    for (a, b) in mesh.triangles.iter().zip(&read.triangles) {
        assert_eq!(a.v, b.v);
    }
}

#[test]
fn file_stores_second_and_third_indices_swapped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("swap.gms");
    write_tin_gms(path.to_str().unwrap(), &quad_mesh()).unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    // in-memory (0, 1, 2) and (0, 2, 3) land in the file with the second
    // and third corners exchanged
    assert!(raw.contains("\n1 3 2\n"));
    assert!(raw.contains("\n1 4 3\n"));
    assert!(!raw.contains("\n1 2 3\n"));
}
